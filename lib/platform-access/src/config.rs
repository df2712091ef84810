//! Gatekeeper and identity-provider configuration.
//!
//! Every field has a default so the whole tree can be loaded from
//! environment variables with only the provider credentials set.

use crate::error::ConfigurationError;
use crate::role::Role;
use crate::route::RouteTable;
use chrono::Duration;
use serde::{Deserialize, Deserializer, Serialize};

/// Connection settings for the external identity provider.
///
/// Both values are optional at load time. When either is missing the
/// gatekeeper is disabled and every request passes through, which keeps
/// local and offline setups usable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the provider (e.g., "https://project.supabase.co").
    #[serde(default)]
    url: Option<String>,
    /// Public (anon) key sent with every provider request.
    #[serde(default)]
    public_key: Option<String>,
}

/// Validated provider credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCredentials {
    /// Base URL of the provider, without a trailing slash.
    pub url: String,
    /// Public key sent with every provider request.
    pub public_key: String,
}

impl ProviderConfig {
    /// Creates a provider configuration.
    #[must_use]
    pub fn new(url: Option<String>, public_key: Option<String>) -> Self {
        Self { url, public_key }
    }

    /// Returns the credentials, or the first missing key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::MissingValue`] if the URL or public key
    /// is absent or blank.
    pub fn credentials(&self) -> Result<ProviderCredentials, ConfigurationError> {
        let url = non_blank(self.url.as_deref()).ok_or(ConfigurationError::MissingValue {
            key: "provider.url",
        })?;
        let public_key = non_blank(self.public_key.as_deref()).ok_or(
            ConfigurationError::MissingValue {
                key: "provider.public_key",
            },
        )?;
        Ok(ProviderCredentials {
            url: url.trim_end_matches('/').to_string(),
            public_key: public_key.to_string(),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// What to assume about a user when the approval lookup fails on an
/// ordinary protected route.
///
/// The default lets the user through as an approved teacher. This is a
/// product decision; admin routes ignore it and always deny.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupFailurePolicy {
    /// Approval status to assume.
    #[serde(default = "default_fallback_approved")]
    pub is_approved: bool,
    /// Role to assume.
    #[serde(default = "default_fallback_role")]
    pub role: Role,
}

fn default_fallback_approved() -> bool {
    true
}

fn default_fallback_role() -> Role {
    Role::Teacher
}

impl Default for LookupFailurePolicy {
    fn default() -> Self {
        Self {
            is_approved: default_fallback_approved(),
            role: default_fallback_role(),
        }
    }
}

/// Authorization policy for the gatekeeper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatekeeperConfig {
    /// Account that is always treated as an administrator.
    #[serde(default)]
    privileged_email: Option<String>,
    /// How long an approval record stays valid in the cache, in seconds.
    #[serde(default = "default_cache_ttl_seconds")]
    cache_ttl_seconds: u64,
    /// Cache size above which writes sweep expired records.
    #[serde(default = "default_cache_soft_cap")]
    cache_soft_cap: usize,
    /// Assumed approval state when the lookup fails on a protected route.
    #[serde(default)]
    lookup_failure: LookupFailurePolicy,
    /// Path prefixes that are acceptable login return targets.
    /// Empty means any same-origin path.
    #[serde(default, deserialize_with = "comma_separated")]
    return_to_prefixes: Vec<String>,
    /// Route classification table and redirect destinations.
    #[serde(default)]
    routes: RouteTable,
}

fn default_cache_ttl_seconds() -> u64 {
    15 * 60
}

fn default_cache_soft_cap() -> usize {
    100
}

impl Default for GatekeeperConfig {
    fn default() -> Self {
        Self {
            privileged_email: None,
            cache_ttl_seconds: default_cache_ttl_seconds(),
            cache_soft_cap: default_cache_soft_cap(),
            lookup_failure: LookupFailurePolicy::default(),
            return_to_prefixes: Vec::new(),
            routes: RouteTable::default(),
        }
    }
}

impl GatekeeperConfig {
    /// Sets the privileged account email.
    #[must_use]
    pub fn with_privileged_email(mut self, email: impl Into<String>) -> Self {
        self.privileged_email = Some(email.into());
        self
    }

    /// Sets the lookup-failure policy.
    #[must_use]
    pub fn with_lookup_failure(mut self, policy: LookupFailurePolicy) -> Self {
        self.lookup_failure = policy;
        self
    }

    /// Restricts login return targets to the given prefixes.
    #[must_use]
    pub fn with_return_to_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.return_to_prefixes = prefixes;
        self
    }

    /// Replaces the route table.
    #[must_use]
    pub fn with_routes(mut self, routes: RouteTable) -> Self {
        self.routes = routes;
        self
    }

    /// Sets the cache TTL and soft cap.
    #[must_use]
    pub fn with_cache_limits(mut self, ttl_seconds: u64, soft_cap: usize) -> Self {
        self.cache_ttl_seconds = ttl_seconds;
        self.cache_soft_cap = soft_cap;
        self
    }

    /// Returns the privileged account email, if configured.
    #[must_use]
    pub fn privileged_email(&self) -> Option<&str> {
        non_blank(self.privileged_email.as_deref())
    }

    /// Returns the cache TTL.
    ///
    /// Values beyond what a [`Duration`] can hold saturate to
    /// [`Duration::MAX`], meaning records never expire.
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        i64::try_from(self.cache_ttl_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }

    /// Returns the cache soft cap.
    #[must_use]
    pub fn cache_soft_cap(&self) -> usize {
        self.cache_soft_cap
    }

    /// Returns the lookup-failure policy.
    #[must_use]
    pub fn lookup_failure(&self) -> LookupFailurePolicy {
        self.lookup_failure
    }

    /// Returns the allowed return-target prefixes.
    #[must_use]
    pub fn return_to_prefixes(&self) -> &[String] {
        &self.return_to_prefixes
    }

    /// Returns the route table.
    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }
}

/// Deserializes a list given either as a sequence or as a comma-separated
/// string, which is how lists arrive from environment variables.
///
/// # Errors
///
/// Returns the deserializer's error if the value is neither form.
pub fn comma_separated<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        String(String),
        List(Vec<String>),
    }

    let items = match StringOrList::deserialize(deserializer)? {
        StringOrList::String(s) => s.split(',').map(str::to_string).collect(),
        StringOrList::List(list) => list,
    };
    Ok(items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect())
}
