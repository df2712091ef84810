//! Sanitization of post-login return targets.
//!
//! When an unauthenticated request is sent to the login page, the requested
//! path is attached so the user lands back where they started. Anything
//! that could send the browser to another origin is dropped instead.

use percent_encoding::percent_decode_str;
use regex::Regex;
use std::sync::LazyLock;

/// Paths whose first segment looks like a hostname: `www.` anything, or a
/// dotted token ending in a common TLD.
static HOST_SMUGGLING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^[/\\]*(?:www\.|[a-z0-9-]+(?:\.[a-z0-9-]+)*\.(?:com|net|org|io|co|edu|gov|app|dev|me|info|biz|xyz|uk|us|ca|de|fr|au|in)(?:[/\\:?#]|$))",
    )
    .expect("host smuggling pattern is valid")
});

/// Decides whether a decoded path is an acceptable return target.
#[derive(Debug, Clone, Default)]
pub struct ReturnPathValidator {
    allowed_prefixes: Vec<String>,
}

impl ReturnPathValidator {
    /// Creates a validator accepting any same-origin path.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a validator accepting only paths under `prefixes`.
    ///
    /// An empty list accepts any same-origin path.
    #[must_use]
    pub fn with_allowed_prefixes(prefixes: Vec<String>) -> Self {
        Self {
            allowed_prefixes: prefixes,
        }
    }

    /// Returns true if `path` is a same-origin relative path permitted by
    /// the configured prefixes.
    #[must_use]
    pub fn is_valid(&self, path: &str) -> bool {
        if !path.starts_with('/') || path.starts_with("//") {
            return false;
        }
        if path.contains('\\') || path.chars().any(char::is_control) {
            return false;
        }
        if path.contains("://") {
            return false;
        }
        if self.allowed_prefixes.is_empty() {
            return true;
        }
        self.allowed_prefixes
            .iter()
            .any(|prefix| path_has_prefix(path, prefix))
    }
}

// "/videos" permits "/videos" and "/videos/1" but not "/videosx".
fn path_has_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
        None => false,
    }
}

/// Returns the decoded return target for `raw_path`, or `None` if it must be
/// discarded.
#[must_use]
pub fn sanitize_return_to(raw_path: &str, validator: &ReturnPathValidator) -> Option<String> {
    let decoded = percent_decode_str(raw_path).decode_utf8().ok()?;
    if HOST_SMUGGLING.is_match(&decoded) {
        return None;
    }
    validator
        .is_valid(&decoded)
        .then(|| decoded.into_owned())
}
