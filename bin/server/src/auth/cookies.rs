//! Identity provider session cookies.

use crate::config::CookieConfig;
use axum::http::{HeaderMap, HeaderValue, header::SET_COOKIE};
use axum_extra::extract::cookie::{Cookie, SameSite};
use std::net::IpAddr;
use time::{Duration as TimeDuration, OffsetDateTime};

/// Access token cookie name.
pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";

/// Refresh token cookie name.
pub const REFRESH_TOKEN_COOKIE: &str = "sb-refresh-token";

/// Legacy combined cookie holding a JSON array of tokens.
pub const LEGACY_AUTH_COOKIE: &str = "supabase-auth-token";

/// Every cookie that carries session state.
pub const SESSION_COOKIES: [&str; 3] = [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE, LEGACY_AUTH_COOKIE];

/// Builds a session cookie holding a freshly issued token.
pub fn session_cookie(
    name: &'static str,
    value: String,
    config: &CookieConfig,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(config.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::seconds(
            config.session_max_age_days.saturating_mul(86_400),
        ))
        .build()
}

/// Domains a session cookie may have been scoped to, besides host-only.
///
/// Configured parent domains win. Otherwise the variants are derived from
/// the request host: the host itself and its registrable parent (the last
/// two labels). For a two-label host both variants coincide. IP literals
/// cannot carry domain cookies and yield nothing.
pub fn cookie_domains(config: &CookieConfig, host: Option<&str>) -> Vec<String> {
    if !config.parent_domains.is_empty() {
        return config.parent_domains.clone();
    }

    let Some(host) = host.and_then(hostname) else {
        return Vec::new();
    };

    let labels: Vec<&str> = host.split('.').collect();
    let parent = if labels.len() > 2 {
        labels[labels.len() - 2..].join(".")
    } else {
        host.clone()
    };
    vec![host, parent]
}

// Lowercased host without port; `None` for empty hosts and IP literals.
fn hostname(host: &str) -> Option<String> {
    let host = host.trim();
    if host.starts_with('[') {
        return None;
    }
    let name = host
        .rsplit_once(':')
        .map_or(host, |(name, _port)| name)
        .trim_end_matches('.')
        .to_ascii_lowercase();
    if name.is_empty() || name.parse::<IpAddr>().is_ok() {
        return None;
    }
    Some(name)
}

/// Appends expiring `Set-Cookie` headers for every session cookie.
///
/// A browser only drops a cookie when name, path and domain all match, so
/// each cookie is expired host-only and once per domain from
/// [`cookie_domains`]. The headers are appended directly because a cookie
/// jar keeps a single entry per name.
pub fn clear_session_cookies(headers: &mut HeaderMap, config: &CookieConfig, host: Option<&str>) {
    let domains = cookie_domains(config, host);
    let variants = std::iter::once(None).chain(domains.iter().map(Some));

    for domain in variants {
        for name in SESSION_COOKIES {
            let mut builder = Cookie::build((name, ""))
                .path("/")
                .http_only(true)
                .secure(config.secure_cookies)
                .same_site(SameSite::Lax)
                .max_age(TimeDuration::ZERO)
                .expires(OffsetDateTime::UNIX_EPOCH);
            if let Some(domain) = domain {
                builder = builder.domain(domain.clone());
            }

            match HeaderValue::from_str(&builder.build().to_string()) {
                Ok(value) => {
                    headers.append(SET_COOKIE, value);
                }
                Err(e) => {
                    tracing::warn!(cookie = name, error = %e, "unrepresentable clearing cookie");
                }
            }
        }
    }
}
