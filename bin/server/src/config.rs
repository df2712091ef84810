//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables. Nested keys
//! use a double underscore, e.g. `PROVIDER__URL` or
//! `GATEKEEPER__PRIVILEGED_EMAIL`.
//!
//! See [`GatekeeperConfig`] for the authorization policy and
//! [`ProviderConfig`] for identity provider credentials.

use lectern_platform_access::config::comma_separated;
use lectern_platform_access::{GatekeeperConfig, ProviderConfig};
use serde::Deserialize;

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Directory of the static site served behind the gatekeeper.
    #[serde(default = "default_site_root")]
    pub site_root: String,

    /// Identity provider credentials. Missing values disable the gatekeeper.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Authorization policy.
    #[serde(default)]
    pub gatekeeper: GatekeeperConfig,

    /// Session cookie settings.
    #[serde(default)]
    pub cookies: CookieConfig,
}

fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_site_root() -> String {
    "site".to_string()
}

/// Session cookie settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CookieConfig {
    /// Whether to set the Secure flag on cookies (requires HTTPS).
    /// Defaults to true; set to false for local HTTP development.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,

    /// Parent domains the session cookies may have been scoped to, for
    /// deployments that span several subdomains. Cookies are cleared
    /// host-only and once for each of these. When empty, the domains are
    /// derived from the request host.
    #[serde(default, deserialize_with = "comma_separated")]
    pub parent_domains: Vec<String>,

    /// Lifetime of session cookies written after a token refresh.
    #[serde(default = "default_session_max_age_days")]
    pub session_max_age_days: i64,
}

fn default_secure_cookies() -> bool {
    true
}

fn default_session_max_age_days() -> i64 {
    7
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            secure_cookies: default_secure_cookies(),
            parent_domains: Vec::new(),
            session_max_age_days: default_session_max_age_days(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cookie_config_has_correct_defaults() {
        let config = CookieConfig::default();
        assert!(config.secure_cookies);
        assert!(config.parent_domains.is_empty());
        assert_eq!(config.session_max_age_days, 7);
    }

    #[test]
    fn minimal_config_fills_defaults() {
        let config: ServerConfig =
            serde_json::from_value(json!({ "database_url": "postgres://localhost/lectern" }))
                .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:3000");
        assert_eq!(config.site_root, "site");
        assert!(config.provider.credentials().is_err());
        assert_eq!(config.gatekeeper.cache_soft_cap(), 100);
    }

    #[test]
    fn parent_domains_accept_comma_separated_string() {
        let config: CookieConfig = serde_json::from_value(json!({
            "parent_domains": "lectern.example, app.lectern.example",
            "secure_cookies": false,
        }))
        .unwrap();

        assert_eq!(
            config.parent_domains,
            vec!["lectern.example", "app.lectern.example"]
        );
        assert!(!config.secure_cookies);
    }
}
