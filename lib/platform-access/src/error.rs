//! Error types for the platform-access crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `ProviderError`: raw failure reported by the identity provider
//! - `SessionError`: a provider failure classified by the session validator
//! - `LookupError`: user approval/role lookup failures
//! - `ConfigurationError`: required gatekeeper settings are missing
//!
//! None of these escape the gatekeeper. Each is turned into an
//! [`AuthDecision`](crate::AuthDecision) at the boundary that observes it.

use lectern_core::UserId;
use std::fmt;

/// Failure reported by the identity provider while retrieving a session.
///
/// Providers do not expose structured error codes, so the message text is
/// the only signal available for classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    message: String,
}

impl ProviderError {
    /// Creates a provider error carrying the provider's message text.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the provider's message text.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "identity provider error: {}", self.message)
    }
}

impl std::error::Error for ProviderError {}

/// A session retrieval failure, classified by severity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The provider throttled the session lookup.
    RateLimited { message: String },
    /// The session cookie held a token that could not be parsed.
    MalformedToken { message: String },
    /// The refresh token was rejected by the provider.
    InvalidRefreshToken { message: String },
    /// Any other provider failure.
    Other { message: String },
}

impl SessionError {
    /// Returns true if signing in again is expected to fix the failure.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Other { .. })
    }

    /// Returns the provider message the classification was based on.
    #[must_use]
    pub fn provider_message(&self) -> &str {
        match self {
            Self::RateLimited { message }
            | Self::MalformedToken { message }
            | Self::InvalidRefreshToken { message }
            | Self::Other { message } => message,
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited { message } => {
                write!(f, "session lookup rate limited: {message}")
            }
            Self::MalformedToken { message } => {
                write!(f, "malformed session token: {message}")
            }
            Self::InvalidRefreshToken { message } => {
                write!(f, "invalid refresh token: {message}")
            }
            Self::Other { message } => {
                write!(f, "session lookup failed: {message}")
            }
        }
    }
}

impl std::error::Error for SessionError {}

/// Errors from user approval/role lookups against the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// No user record exists for the identifier.
    NotFound { user_id: UserId },
    /// The stored role is not one the platform recognizes.
    InvalidRole { user_id: UserId, value: String },
    /// The persistence layer could not be reached or failed the query.
    Unavailable { details: String },
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { user_id } => {
                write!(f, "no user record for {user_id}")
            }
            Self::InvalidRole { user_id, value } => {
                write!(f, "user {user_id} has unrecognized role '{value}'")
            }
            Self::Unavailable { details } => {
                write!(f, "user lookup unavailable: {details}")
            }
        }
    }
}

impl std::error::Error for LookupError {}

/// Errors from validating gatekeeper configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A required setting was absent or blank.
    MissingValue { key: &'static str },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingValue { key } => {
                write!(f, "missing required configuration value: {key}")
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_display() {
        let err = ProviderError::new("Invalid Refresh Token: Already Used");
        assert_eq!(err.message(), "Invalid Refresh Token: Already Used");
        assert!(err.to_string().contains("identity provider error"));
    }

    #[test]
    fn session_error_recoverability() {
        let message = "x".to_string();
        assert!(
            SessionError::RateLimited {
                message: message.clone()
            }
            .is_recoverable()
        );
        assert!(
            SessionError::MalformedToken {
                message: message.clone()
            }
            .is_recoverable()
        );
        assert!(
            SessionError::InvalidRefreshToken {
                message: message.clone()
            }
            .is_recoverable()
        );
        assert!(!SessionError::Other { message }.is_recoverable());
    }

    #[test]
    fn session_error_keeps_provider_message() {
        let err = SessionError::Other {
            message: "upstream timeout".to_string(),
        };
        assert_eq!(err.provider_message(), "upstream timeout");
        assert!(err.to_string().contains("upstream timeout"));
    }

    #[test]
    fn lookup_error_display() {
        let err = LookupError::InvalidRole {
            user_id: UserId::new("usr-9"),
            value: "janitor".to_string(),
        };
        assert!(err.to_string().contains("usr-9"));
        assert!(err.to_string().contains("janitor"));

        let err = LookupError::Unavailable {
            details: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn configuration_error_names_key() {
        let err = ConfigurationError::MissingValue {
            key: "provider.url",
        };
        assert!(err.to_string().contains("provider.url"));
    }
}
