//! Route classification.
//!
//! Every request path falls into exactly one [`RouteClass`]. Classification
//! is a pure function of the path and the static [`RouteTable`].

use crate::config::comma_separated;
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Static access category of a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    /// Reachable by anyone, with or without a session.
    Public,
    /// Login, sign-up and provider callback pages.
    AuthFlow,
    /// Administrative section.
    Admin,
    /// Everything else: requires an approved session.
    Protected,
}

impl RouteClass {
    /// Returns true if requests of this class skip session checks.
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Public | Self::AuthFlow)
    }
}

impl fmt::Display for RouteClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Public => "public",
            Self::AuthFlow => "auth_flow",
            Self::Admin => "admin",
            Self::Protected => "protected",
        };
        f.write_str(name)
    }
}

/// Path lists used for classification, plus the redirect destinations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteTable {
    /// Any path starting with this prefix is an admin route.
    #[serde(default = "default_admin_prefix")]
    admin_prefix: String,
    /// Paths equal to or prefixed by one of these are auth-flow routes.
    #[serde(
        default = "default_auth_flow_paths",
        deserialize_with = "comma_separated"
    )]
    auth_flow_paths: Vec<String>,
    /// Paths exactly equal to one of these are public.
    #[serde(default = "default_public_paths", deserialize_with = "comma_separated")]
    public_paths: Vec<String>,
    /// Where unauthenticated users are sent.
    #[serde(default = "default_login_path")]
    login_path: String,
    /// Where unapproved users are sent.
    #[serde(default = "default_pending_path")]
    pending_path: String,
    /// Landing page of the admin section.
    #[serde(default = "default_admin_path")]
    admin_path: String,
    /// Generic error page.
    #[serde(default = "default_error_path")]
    error_path: String,
}

fn default_admin_prefix() -> String {
    "/admin".to_string()
}

fn default_auth_flow_paths() -> Vec<String> {
    ["/auth/login", "/auth/sign-up", "/auth/callback"]
        .map(String::from)
        .to_vec()
}

fn default_public_paths() -> Vec<String> {
    [
        "/pending-approval",
        "/setup-admin",
        "/privacy",
        "/terms",
        "/auth/confirm",
        "/auth/email-confirmed",
        "/auth/reset-password",
        "/error",
    ]
    .map(String::from)
    .to_vec()
}

fn default_login_path() -> String {
    "/auth/login".to_string()
}

fn default_pending_path() -> String {
    "/pending-approval".to_string()
}

fn default_admin_path() -> String {
    "/admin".to_string()
}

fn default_error_path() -> String {
    "/error".to_string()
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            admin_prefix: default_admin_prefix(),
            auth_flow_paths: default_auth_flow_paths(),
            public_paths: default_public_paths(),
            login_path: default_login_path(),
            pending_path: default_pending_path(),
            admin_path: default_admin_path(),
            error_path: default_error_path(),
        }
    }
}

impl RouteTable {
    /// Classifies a request path.
    ///
    /// The path may be percent-encoded. A path that does not decode to UTF-8
    /// is classified as [`RouteClass::Protected`], the strictest class.
    #[must_use]
    pub fn classify(&self, path: &str) -> RouteClass {
        let Ok(decoded) = percent_decode_str(path).decode_utf8() else {
            return RouteClass::Protected;
        };
        let path = decoded.as_ref();

        if path.starts_with(&self.admin_prefix) {
            return RouteClass::Admin;
        }
        if self
            .auth_flow_paths
            .iter()
            .any(|entry| path.starts_with(entry.as_str()))
        {
            return RouteClass::AuthFlow;
        }
        if self.public_paths.iter().any(|entry| entry == path) {
            return RouteClass::Public;
        }
        RouteClass::Protected
    }

    /// Returns the admin path prefix.
    #[must_use]
    pub fn admin_prefix(&self) -> &str {
        &self.admin_prefix
    }

    /// Returns the login page path.
    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Returns the pending-approval page path.
    #[must_use]
    pub fn pending_path(&self) -> &str {
        &self.pending_path
    }

    /// Returns the admin landing page path.
    #[must_use]
    pub fn admin_path(&self) -> &str {
        &self.admin_path
    }

    /// Returns the generic error page path.
    #[must_use]
    pub fn error_path(&self) -> &str {
        &self.error_path
    }

    /// Returns true if `path` is the pending-approval page.
    #[must_use]
    pub fn is_pending_page(&self, path: &str) -> bool {
        path == self.pending_path
    }
}
