//! Authorization decisions.
//!
//! The gatekeeper produces exactly one [`AuthDecision`] per request. The
//! hosting layer turns it into an HTTP response; [`AuthDecision::location`]
//! computes the redirect target so every host builds identical URLs.

use crate::error::SessionError;
use crate::route::RouteTable;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::fmt;

/// Characters left unescaped in query values: the RFC 3986 unreserved set.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Message shown when the admin guard denies access.
pub const ADMIN_REQUIRED_MESSAGE: &str = "Admin access required";

/// Message shown for recoverable session failures.
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please sign in again.";

/// Message shown for unrecoverable session failures.
pub const AUTH_REQUIRED_MESSAGE: &str = "Authentication required";

/// Category reported to the error page in its `type` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The session is unusable; signing in again should help.
    Session,
    /// Authentication failed for another reason.
    Auth,
    /// Signed in but not allowed.
    Permission,
}

impl ErrorKind {
    /// Returns the query-parameter value for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Auth => "auth",
            Self::Permission => "permission",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of evaluating a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    /// Let the request through.
    Allow,
    /// Send the user to the login page, optionally returning afterwards.
    RedirectLogin { return_to: Option<String> },
    /// The user is signed in but awaits approval.
    RedirectPending,
    /// Send an administrator to the admin section.
    RedirectAdmin,
    /// Send the user to the error page.
    RedirectError { kind: ErrorKind, message: String },
}

impl AuthDecision {
    /// Decision for an authenticated user lacking the admin role.
    #[must_use]
    pub fn admin_required() -> Self {
        Self::RedirectError {
            kind: ErrorKind::Permission,
            message: ADMIN_REQUIRED_MESSAGE.to_string(),
        }
    }

    /// Decision for a failed session lookup.
    #[must_use]
    pub fn session_failure(err: &SessionError) -> Self {
        if err.is_recoverable() {
            Self::RedirectError {
                kind: ErrorKind::Session,
                message: SESSION_EXPIRED_MESSAGE.to_string(),
            }
        } else {
            Self::RedirectError {
                kind: ErrorKind::Auth,
                message: AUTH_REQUIRED_MESSAGE.to_string(),
            }
        }
    }

    /// Returns true if the request may proceed.
    #[must_use]
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Returns true if session cookies must be cleared with the response.
    #[must_use]
    pub fn clears_session(&self) -> bool {
        matches!(self, Self::RedirectError { .. })
    }

    /// Returns the redirect target, or `None` for [`AuthDecision::Allow`].
    #[must_use]
    pub fn location(&self, routes: &RouteTable) -> Option<String> {
        match self {
            Self::Allow => None,
            Self::RedirectLogin { return_to: None } => Some(routes.login_path().to_string()),
            Self::RedirectLogin {
                return_to: Some(target),
            } => Some(format!(
                "{}?returnTo={}",
                routes.login_path(),
                encode_query_value(target)
            )),
            Self::RedirectPending => Some(routes.pending_path().to_string()),
            Self::RedirectAdmin => Some(routes.admin_path().to_string()),
            Self::RedirectError { kind, message } => Some(format!(
                "{}?type={}&message={}",
                routes.error_path(),
                kind.as_str(),
                encode_query_value(message)
            )),
        }
    }

    /// Short label for logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::RedirectLogin { .. } => "redirect_login",
            Self::RedirectPending => "redirect_pending",
            Self::RedirectAdmin => "redirect_admin",
            Self::RedirectError { .. } => "redirect_error",
        }
    }
}

fn encode_query_value(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}
