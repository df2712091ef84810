//! Turns authorization decisions into HTTP responses.

use super::cookies::clear_session_cookies;
use crate::config::CookieConfig;
use axum::http::{
    HeaderMap, HeaderValue,
    header::{CACHE_CONTROL, EXPIRES, PRAGMA},
};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use lectern_platform_access::{AuthDecision, RouteTable};

/// Builds the redirect for a non-allow decision.
///
/// Cookie changes in `jar` are always attached. Error redirects also expire
/// every session cookie and forbid caching, so a stale session cannot be
/// replayed from a cached response.
///
/// `host` is the request's `Host` header, used to derive the cookie domains
/// when none are configured.
///
/// Returns `None` for [`AuthDecision::Allow`], which the caller forwards.
pub fn redirect_response(
    decision: &AuthDecision,
    routes: &RouteTable,
    jar: CookieJar,
    cookies: &CookieConfig,
    host: Option<&str>,
) -> Option<Response> {
    let location = decision.location(routes)?;
    let mut response = (jar, Redirect::to(&location)).into_response();

    if decision.clears_session() {
        let headers = response.headers_mut();
        clear_session_cookies(headers, cookies, host);
        forbid_caching(headers);
    }

    Some(response)
}

fn forbid_caching(headers: &mut HeaderMap) {
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(EXPIRES, HeaderValue::from_static("0"));
}
