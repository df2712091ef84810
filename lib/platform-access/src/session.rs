//! Sessions issued by the identity provider.
//!
//! The gatekeeper never creates or destroys sessions. It reads the one the
//! provider resolves for the request, once, and forwards the token material
//! untouched.

use lectern_core::UserId;
use serde::{Deserialize, Serialize};

/// An authenticated session resolved by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// The authenticated user's ID.
    user_id: UserId,
    /// The user's email, if the provider returned one.
    user_email: Option<String>,
    /// Provider access token.
    access_token: String,
    /// Provider refresh token.
    refresh_token: Option<String>,
}

impl Session {
    /// Creates a session for the given user.
    #[must_use]
    pub fn new(user_id: UserId, access_token: String) -> Self {
        Self {
            user_id,
            user_email: None,
            access_token,
            refresh_token: None,
        }
    }

    /// Sets the user's email.
    #[must_use]
    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.user_email = email;
        self
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: Option<String>) -> Self {
        self.refresh_token = refresh_token;
        self
    }

    /// Returns the authenticated user's ID.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Returns the user's email, if known.
    #[must_use]
    pub fn user_email(&self) -> Option<&str> {
        self.user_email.as_deref()
    }

    /// Returns the provider access token.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Returns the provider refresh token, if present.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// Returns true if the session's email matches `email`, ignoring ASCII case.
    #[must_use]
    pub fn email_matches(&self, email: &str) -> bool {
        self.user_email
            .as_deref()
            .is_some_and(|own| own.eq_ignore_ascii_case(email))
    }
}
