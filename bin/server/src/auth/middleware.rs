//! Gatekeeper middleware for Axum.

use super::AppState;
use super::response::redirect_response;
use axum::{
    extract::{Request, State},
    http::header::{HOST, REFERER},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use lectern_platform_access::RequestContext;
use std::sync::Arc;

/// Authorizes the request before it reaches the wrapped service.
///
/// Install with [`axum::middleware::from_fn_with_state`]. Allowed requests
/// are forwarded with any cookies the identity provider refreshed; all
/// others are answered with a redirect.
pub async fn gatekeeper(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let Some(gatekeeper) = state.gatekeeper.as_ref() else {
        return next.run(request).await;
    };

    let mut jar = CookieJar::from_headers(request.headers());
    let path = request.uri().path().to_owned();
    let referer = request
        .headers()
        .get(REFERER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let host = request
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| request.uri().host())
        .map(str::to_owned);

    let context = RequestContext::new(&path).with_referer(referer.as_deref());
    let decision = gatekeeper.evaluate(&context, &mut jar).await;

    match redirect_response(
        &decision,
        gatekeeper.routes(),
        jar.clone(),
        &state.cookies,
        host.as_deref(),
    ) {
        Some(response) => {
            tracing::info!(path = %path, decision = decision.label(), "request redirected");
            response
        }
        None => (jar, next.run(request).await).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CookieConfig;
    use async_trait::async_trait;
    use axum::{
        Router,
        body::Body,
        http::{
            StatusCode,
            header::{CACHE_CONTROL, COOKIE, LOCATION, SET_COOKIE},
        },
        routing::get,
    };
    use axum_extra::extract::cookie::Cookie;
    use lectern_core::UserId;
    use lectern_platform_access::{
        ApprovalCache, Gatekeeper, GatekeeperConfig, IdentityProvider, LookupError,
        ProviderError, Role, Session, UserDirectory, UserRecord,
    };
    use rootcause::Report;
    use std::collections::HashMap;
    use tower::ServiceExt;

    /// Signs in whoever presents `sb-access-token=<user id>`, rotating the
    /// token on the way.
    struct CookieProvider {
        failure: Option<&'static str>,
    }

    #[async_trait]
    impl IdentityProvider for CookieProvider {
        async fn get_session(&self, jar: &mut CookieJar) -> Result<Option<Session>, ProviderError> {
            if let Some(message) = self.failure {
                return Err(ProviderError::new(message));
            }
            let Some(user) = jar.get("sb-access-token").map(|c| c.value().to_string()) else {
                return Ok(None);
            };
            *jar = jar
                .clone()
                .add(Cookie::new("sb-access-token", user.clone()));
            Ok(Some(
                Session::new(UserId::new(user.clone()), user.clone())
                    .with_email(Some(format!("{user}@example.com"))),
            ))
        }
    }

    struct StaticDirectory(HashMap<&'static str, UserRecord>);

    #[async_trait]
    impl UserDirectory for StaticDirectory {
        async fn lookup_user(&self, user_id: &UserId) -> Result<UserRecord, Report<LookupError>> {
            self.0
                .get(user_id.as_str())
                .copied()
                .ok_or_else(|| {
                    Report::from(LookupError::NotFound {
                        user_id: user_id.clone(),
                    })
                })
        }
    }

    fn directory() -> StaticDirectory {
        StaticDirectory(HashMap::from([
            (
                "teacher",
                UserRecord {
                    is_approved: true,
                    role: Role::Teacher,
                },
            ),
            (
                "newcomer",
                UserRecord {
                    is_approved: false,
                    role: Role::Student,
                },
            ),
            (
                "admin",
                UserRecord {
                    is_approved: true,
                    role: Role::Admin,
                },
            ),
        ]))
    }

    fn cookie_config() -> CookieConfig {
        CookieConfig {
            parent_domains: vec!["lectern.example".into(), "app.lectern.example".into()],
            ..CookieConfig::default()
        }
    }

    fn app_with(state: AppState) -> Router {
        Router::new()
            .route("/", get(|| async { "home" }))
            .route("/dashboard", get(|| async { "dashboard" }))
            .route("/admin/users", get(|| async { "users" }))
            .layer(axum::middleware::from_fn_with_state(
                Arc::new(state),
                gatekeeper,
            ))
    }

    fn app(failure: Option<&'static str>) -> Router {
        app_with_cookies(failure, cookie_config())
    }

    fn app_with_cookies(failure: Option<&'static str>, cookies: CookieConfig) -> Router {
        let config = GatekeeperConfig::default();
        let cache = Arc::new(ApprovalCache::new(
            config.cache_ttl(),
            config.cache_soft_cap(),
        ));
        let gatekeeper = Gatekeeper::new(
            config,
            cache,
            Arc::new(CookieProvider { failure }),
            Arc::new(directory()),
        );
        app_with(AppState::new(gatekeeper, cookies))
    }

    fn request(path: &str, user: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri(path);
        if let Some(user) = user {
            builder = builder.header(COOKIE, format!("sb-access-token={user}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn anonymous_request_is_sent_to_login() {
        let response = app(None)
            .oneshot(request("/dashboard", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[LOCATION],
            "/auth/login?returnTo=%2Fdashboard"
        );
        assert!(response.headers().get(SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn approved_user_reaches_page_with_refreshed_cookie() {
        let response = app(None)
            .oneshot(request("/dashboard", Some("teacher")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let set_cookie = response.headers()[SET_COOKIE].to_str().unwrap();
        assert!(set_cookie.starts_with("sb-access-token=teacher"));
    }

    #[tokio::test]
    async fn unapproved_user_is_sent_to_pending() {
        let response = app(None)
            .oneshot(request("/dashboard", Some("newcomer")))
            .await
            .unwrap();

        assert_eq!(response.headers()[LOCATION], "/pending-approval");
    }

    #[tokio::test]
    async fn non_admin_is_refused_admin_pages_and_session_cleared() {
        let response = app(None)
            .oneshot(request("/admin/users", Some("teacher")))
            .await
            .unwrap();
        let headers = response.headers();

        assert_eq!(
            headers[LOCATION],
            "/error?type=permission&message=Admin%20access%20required"
        );
        // Provider refresh plus nine clearing cookies.
        assert_eq!(headers.get_all(SET_COOKIE).iter().count(), 10);
        assert_eq!(headers[CACHE_CONTROL], "no-cache, no-store, must-revalidate");
    }

    #[tokio::test]
    async fn default_cookie_config_clears_variants_of_request_host() {
        let mut request = request("/dashboard", Some("teacher"));
        request
            .headers_mut()
            .insert(HOST, "app.lectern.example".parse().unwrap());

        let response = app_with_cookies(Some("Too Many Requests"), CookieConfig::default())
            .oneshot(request)
            .await
            .unwrap();
        let cookies: Vec<_> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();

        assert_eq!(cookies.len(), 9);
        assert_eq!(
            cookies
                .iter()
                .filter(|c| c.contains("Domain=lectern.example"))
                .count(),
            3
        );
    }

    #[tokio::test]
    async fn admin_landing_on_root_is_sent_to_admin() {
        let response = app(None)
            .oneshot(request("/", Some("admin")))
            .await
            .unwrap();

        assert_eq!(response.headers()[LOCATION], "/admin");
    }

    #[tokio::test]
    async fn rate_limited_provider_reports_expired_session() {
        let response = app(Some("Too Many Requests"))
            .oneshot(request("/dashboard", Some("teacher")))
            .await
            .unwrap();

        assert_eq!(
            response.headers()[LOCATION],
            "/error?type=session&message=Your%20session%20has%20expired.%20Please%20sign%20in%20again."
        );
        assert_eq!(response.headers().get_all(SET_COOKIE).iter().count(), 9);
    }

    #[tokio::test]
    async fn ungated_server_lets_everything_through() {
        let response = app_with(AppState::ungated(cookie_config()))
            .oneshot(request("/admin/users", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(LOCATION).is_none());
    }
}
