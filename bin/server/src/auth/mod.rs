//! Request authorization for the lectern server.
//!
//! This module provides:
//! - The gatekeeper middleware that runs before every gated route
//! - An HTTP client for the hosted identity provider
//! - Database-backed user approval lookups
//! - Session cookie handling
//!
//! # Degraded mode
//!
//! When the identity provider credentials are not configured the server
//! still starts, but with the gatekeeper disabled: every request passes
//! through unchecked. This keeps local development and offline builds
//! usable and is logged loudly at startup.

pub mod cookies;
pub mod db;
pub mod middleware;
pub mod provider;
pub mod response;

use crate::config::{CookieConfig, ServerConfig};
use lectern_platform_access::{ApprovalCache, Gatekeeper};
use sqlx::PgPool;
use std::sync::Arc;

pub use db::UserRepository;
pub use middleware::gatekeeper;
pub use provider::HttpIdentityProvider;

/// Shared authorization state.
pub struct AppState {
    /// The gatekeeper, or `None` when running ungated.
    pub gatekeeper: Option<Gatekeeper>,
    /// Session cookie settings.
    pub cookies: CookieConfig,
}

impl AppState {
    /// Creates state with an active gatekeeper.
    pub fn new(gatekeeper: Gatekeeper, cookies: CookieConfig) -> Self {
        Self {
            gatekeeper: Some(gatekeeper),
            cookies,
        }
    }

    /// Creates state that lets every request through.
    pub fn ungated(cookies: CookieConfig) -> Self {
        Self {
            gatekeeper: None,
            cookies,
        }
    }

    /// Builds the authorization state from configuration.
    ///
    /// Missing provider credentials, or a provider client that cannot be
    /// built, leave the server ungated.
    pub fn from_config(config: &ServerConfig, db_pool: PgPool) -> Self {
        let credentials = match config.provider.credentials() {
            Ok(credentials) => credentials,
            Err(e) => {
                tracing::warn!(error = %e, "identity provider not configured; authorization disabled");
                return Self::ungated(config.cookies.clone());
            }
        };

        let provider = match HttpIdentityProvider::new(credentials, config.cookies.clone()) {
            Ok(provider) => provider,
            Err(e) => {
                tracing::warn!(error = %e, "identity provider client unavailable; authorization disabled");
                return Self::ungated(config.cookies.clone());
            }
        };

        let cache = Arc::new(ApprovalCache::new(
            config.gatekeeper.cache_ttl(),
            config.gatekeeper.cache_soft_cap(),
        ));
        let gatekeeper = Gatekeeper::new(
            config.gatekeeper.clone(),
            cache,
            Arc::new(provider),
            Arc::new(UserRepository::new(db_pool)),
        );

        Self::new(gatekeeper, config.cookies.clone())
    }

    /// Returns true if requests are being authorized.
    pub fn is_gated(&self) -> bool {
        self.gatekeeper.is_some()
    }
}
