//! HTTP client for the hosted identity provider.
//!
//! The provider exposes a GoTrue-style REST API: the current user is read
//! from `/auth/v1/user` with the access token as bearer credential, and an
//! expired access token is exchanged at `/auth/v1/token`. Tokens travel in
//! the `sb-access-token`/`sb-refresh-token` cookies, or in the legacy
//! `supabase-auth-token` cookie holding a JSON array.

use super::cookies::{
    ACCESS_TOKEN_COOKIE, LEGACY_AUTH_COOKIE, REFRESH_TOKEN_COOKIE, session_cookie,
};
use crate::config::CookieConfig;
use async_trait::async_trait;
use axum::http::StatusCode;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use lectern_core::UserId;
use lectern_platform_access::{IdentityProvider, ProviderCredentials, ProviderError, Session};
use serde::Deserialize;
use std::time::Duration;

/// Upper bound on a single provider round trip.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Identity provider reached over HTTP.
pub struct HttpIdentityProvider {
    http_client: reqwest::Client,
    credentials: ProviderCredentials,
    cookies: CookieConfig,
}

/// Tokens carried by the request's cookies.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StoredTokens {
    access_token: String,
    refresh_token: Option<String>,
}

/// Legacy cookie payload: either `[access, refresh, ...]` or an object.
#[derive(Deserialize)]
#[serde(untagged)]
enum LegacyTokens {
    List(Vec<Option<String>>),
    Object {
        access_token: String,
        #[serde(default)]
        refresh_token: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct ProviderUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    user: ProviderUser,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl HttpIdentityProvider {
    /// Creates a client for the provider at `credentials.url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        credentials: ProviderCredentials,
        cookies: CookieConfig,
    ) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::new(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            credentials,
            cookies,
        })
    }

    /// Fetches the user owning `access_token`.
    ///
    /// Returns `Ok(None)` when the provider rejects the token as
    /// unauthenticated.
    async fn fetch_user(&self, access_token: &str) -> Result<Option<ProviderUser>, ProviderError> {
        let response = self
            .http_client
            .get(format!("{}/auth/v1/user", self.credentials.url))
            .header("apikey", &self.credentials.public_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ProviderError::new(format!("user request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_response(status, &body));
        }

        response
            .json::<ProviderUser>()
            .await
            .map(Some)
            .map_err(|e| ProviderError::new(format!("unreadable user response: {}", e)))
    }

    /// Exchanges a refresh token for a new token pair.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, ProviderError> {
        let response = self
            .http_client
            .post(format!(
                "{}/auth/v1/token?grant_type=refresh_token",
                self.credentials.url
            ))
            .header("apikey", &self.credentials.public_key)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(|e| ProviderError::new(format!("token refresh failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_response(status, &body));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| ProviderError::new(format!("unreadable token response: {}", e)))
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn get_session(&self, jar: &mut CookieJar) -> Result<Option<Session>, ProviderError> {
        let Some(tokens) = stored_tokens(jar)? else {
            return Ok(None);
        };

        if let Some(user) = self.fetch_user(&tokens.access_token).await? {
            return into_session(user, tokens.access_token, tokens.refresh_token).map(Some);
        }

        let Some(refresh_token) = tokens.refresh_token else {
            return Ok(None);
        };

        let refreshed = self.refresh(&refresh_token).await?;
        tracing::debug!(user_id = %refreshed.user.id, "refreshed provider session");

        let mut updated = jar.clone().add(session_cookie(
            ACCESS_TOKEN_COOKIE,
            refreshed.access_token.clone(),
            &self.cookies,
        ));
        if let Some(refresh_token) = &refreshed.refresh_token {
            updated = updated.add(session_cookie(
                REFRESH_TOKEN_COOKIE,
                refresh_token.clone(),
                &self.cookies,
            ));
        }
        if jar.get(LEGACY_AUTH_COOKIE).is_some() {
            updated = updated.remove(Cookie::build(LEGACY_AUTH_COOKIE).path("/"));
        }
        *jar = updated;

        into_session(
            refreshed.user,
            refreshed.access_token,
            refreshed.refresh_token.or(Some(refresh_token)),
        )
        .map(Some)
    }
}

/// Reads the session tokens from the request cookies.
///
/// The split cookies take precedence over the legacy combined cookie.
fn stored_tokens(jar: &CookieJar) -> Result<Option<StoredTokens>, ProviderError> {
    if let Some(access) = jar.get(ACCESS_TOKEN_COOKIE).filter(|c| !c.value().is_empty()) {
        return Ok(Some(StoredTokens {
            access_token: access.value().to_string(),
            refresh_token: jar
                .get(REFRESH_TOKEN_COOKIE)
                .map(|c| c.value().to_string())
                .filter(|v| !v.is_empty()),
        }));
    }

    let Some(legacy) = jar.get(LEGACY_AUTH_COOKIE).filter(|c| !c.value().is_empty()) else {
        return Ok(None);
    };

    let parsed: LegacyTokens = serde_json::from_str(legacy.value())
        .map_err(|e| ProviderError::new(format!("malformed token: {}", e)))?;

    let tokens = match parsed {
        LegacyTokens::List(values) => {
            let mut values = values.into_iter();
            let access_token = values
                .next()
                .flatten()
                .ok_or_else(|| ProviderError::new("malformed token: missing access token"))?;
            StoredTokens {
                access_token,
                refresh_token: values.next().flatten(),
            }
        }
        LegacyTokens::Object {
            access_token,
            refresh_token,
        } => StoredTokens {
            access_token,
            refresh_token,
        },
    };
    Ok(Some(tokens))
}

fn into_session(
    user: ProviderUser,
    access_token: String,
    refresh_token: Option<String>,
) -> Result<Session, ProviderError> {
    let user_id: UserId = user
        .id
        .parse()
        .map_err(|e| ProviderError::new(format!("provider returned unusable user id: {}", e)))?;

    Ok(Session::new(user_id, access_token)
        .with_email(user.email)
        .with_refresh_token(refresh_token))
}

/// Turns a failed provider response into an error carrying the provider's
/// own wording, which session validation classifies.
fn error_from_response(status: StatusCode, body: &str) -> ProviderError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return ProviderError::new("Too Many Requests");
    }

    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .error_description
        .or(parsed.msg)
        .or(parsed.message)
        .or(parsed.error)
        .unwrap_or_else(|| format!("provider responded with {}", status));
    ProviderError::new(message)
}
