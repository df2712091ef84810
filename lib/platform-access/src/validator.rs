//! Session validation.
//!
//! Wraps the identity provider's session retrieval and classifies its
//! failures. The provider reports errors only as free text, so all message
//! matching is confined to this module.

use crate::error::{ProviderError, SessionError};
use crate::provider::IdentityProvider;
use crate::session::Session;
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tracing::{debug, warn};

/// Case-sensitive message fragments that mark a throttled lookup.
const RATE_LIMIT_PATTERNS: &[&str] = &["Too Many Requests", "rate limit"];

/// Case-sensitive message fragments that mark an unparseable token.
const MALFORMED_TOKEN_PATTERNS: &[&str] = &["Unexpected token", "malformed token", "invalid JWT"];

/// Case-sensitive message fragments that mark a rejected refresh token.
const INVALID_REFRESH_PATTERNS: &[&str] = &["Invalid Refresh Token"];

/// Resolves sessions through the identity provider.
#[derive(Clone)]
pub struct SessionValidator {
    provider: Arc<dyn IdentityProvider>,
}

impl SessionValidator {
    /// Creates a validator backed by `provider`.
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    /// Resolves the request's session.
    ///
    /// `Ok(None)` means the caller is not signed in. Provider failures are
    /// classified into a [`SessionError`]. The validator does not know which
    /// route is being requested; deciding whether a failure matters is the
    /// caller's job.
    ///
    /// # Errors
    ///
    /// Returns the classified provider failure.
    pub async fn validate(&self, jar: &mut CookieJar) -> Result<Option<Session>, SessionError> {
        match self.provider.get_session(jar).await {
            Ok(session) => {
                debug!(authenticated = session.is_some(), "session resolved");
                Ok(session)
            }
            Err(err) => {
                let classified = classify(&err);
                warn!(
                    error = %err,
                    recoverable = classified.is_recoverable(),
                    "identity provider rejected session lookup"
                );
                Err(classified)
            }
        }
    }
}

/// Classifies a provider failure by its message text.
#[must_use]
pub fn classify(err: &ProviderError) -> SessionError {
    let message = err.message().to_string();
    let matches = |patterns: &[&str]| patterns.iter().any(|p| err.message().contains(p));

    if matches(RATE_LIMIT_PATTERNS) {
        SessionError::RateLimited { message }
    } else if matches(MALFORMED_TOKEN_PATTERNS) {
        SessionError::MalformedToken { message }
    } else if matches(INVALID_REFRESH_PATTERNS) {
        SessionError::InvalidRefreshToken { message }
    } else {
        SessionError::Other { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lectern_core::UserId;

    fn classify_message(message: &str) -> SessionError {
        classify(&ProviderError::new(message))
    }

    #[test]
    fn classifies_rate_limit() {
        assert!(matches!(
            classify_message("429 Too Many Requests"),
            SessionError::RateLimited { .. }
        ));
        assert!(matches!(
            classify_message("Request rate limit reached"),
            SessionError::RateLimited { .. }
        ));
    }

    #[test]
    fn classifies_malformed_token() {
        assert!(matches!(
            classify_message("Unexpected token 'b', \"base64-eyJ\" is not valid JSON"),
            SessionError::MalformedToken { .. }
        ));
        assert!(matches!(
            classify_message("invalid JWT: unable to parse or verify signature"),
            SessionError::MalformedToken { .. }
        ));
    }

    #[test]
    fn classifies_invalid_refresh_token() {
        let err = classify_message("Invalid Refresh Token: Refresh Token Not Found");
        assert!(matches!(err, SessionError::InvalidRefreshToken { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert!(matches!(
            classify_message("invalid refresh token"),
            SessionError::Other { .. }
        ));
        assert!(matches!(
            classify_message("too many requests"),
            SessionError::Other { .. }
        ));
    }

    #[test]
    fn unknown_errors_are_fatal() {
        let err = classify_message("Database error querying schema");
        assert!(matches!(err, SessionError::Other { .. }));
        assert!(!err.is_recoverable());
        assert_eq!(err.provider_message(), "Database error querying schema");
    }

    struct FixedProvider(Result<Option<Session>, ProviderError>);

    #[async_trait]
    impl IdentityProvider for FixedProvider {
        async fn get_session(
            &self,
            _jar: &mut CookieJar,
        ) -> Result<Option<Session>, ProviderError> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn validate_passes_through_sessions() {
        let session = Session::new(UserId::new("usr-1"), "token".to_string());
        let validator = SessionValidator::new(Arc::new(FixedProvider(Ok(Some(session.clone())))));
        let mut jar = CookieJar::new();

        assert_eq!(validator.validate(&mut jar).await, Ok(Some(session)));
    }

    #[tokio::test]
    async fn validate_passes_through_missing_session() {
        let validator = SessionValidator::new(Arc::new(FixedProvider(Ok(None))));
        let mut jar = CookieJar::new();

        assert_eq!(validator.validate(&mut jar).await, Ok(None));
    }

    #[tokio::test]
    async fn validate_classifies_provider_errors() {
        let validator = SessionValidator::new(Arc::new(FixedProvider(Err(ProviderError::new(
            "Invalid Refresh Token: Already Used",
        )))));
        let mut jar = CookieJar::new();

        let err = validator.validate(&mut jar).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidRefreshToken { .. }));
    }
}
