//! HTTP cache control module
//!
//! Provides `ETag` generation, conditional request handling, and the
//! per-mode cache policies applied to static asset routes.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::config::Mode;

/// Generate `ETag` using fast hashing
///
/// # Arguments
/// * `content` - File content
///
/// # Returns
/// Quoted `ETag` string, e.g., `"abc123def"`
pub fn generate_etag(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    let v = hasher.finish();
    format!("\"{v:x}\"")
}

/// Check if client's `If-None-Match` header matches the server's `ETag`
///
/// Supports:
/// - Single `ETag`: `"abc123"`
/// - Multiple `ETags`: `"abc123", "def456"`
/// - Wildcard: `*`
///
/// # Returns
/// Returns true if matched (should return 304), false otherwise
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|client_etag| {
        // Handle multiple ETags separated by comma
        client_etag
            .split(',')
            .any(|e| e.trim() == etag || e.trim() == "*")
    })
}

/// Cache control policy for static asset responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Public cache with specified max-age (seconds)
    Public(u32),
    /// Long-lived public cache for content-hashed build output
    Immutable(u32),
    /// No store
    NoStore,
}

impl CachePolicy {
    /// Policy for bundled assets in the given server mode.
    ///
    /// Build output is content-hashed, so production responses can be
    /// cached aggressively. Development must never cache stale artifacts.
    pub const fn for_mode(mode: Mode, max_age: u32) -> Self {
        match mode {
            Mode::Production => Self::Immutable(max_age),
            Mode::Development => Self::NoStore,
        }
    }

    /// Convert to Cache-Control header value
    pub fn to_header_value(self) -> String {
        match self {
            Self::Public(max_age) => format!("public, max-age={max_age}"),
            Self::Immutable(max_age) => format!("public, max-age={max_age}, immutable"),
            Self::NoStore => "no-store".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_etag() {
        let etag = generate_etag(b"hello world");
        assert!(etag.starts_with('"'));
        assert!(etag.ends_with('"'));
        assert!(etag.len() > 2);
    }

    #[test]
    fn test_etag_consistency() {
        let etag1 = generate_etag(b"same content");
        let etag2 = generate_etag(b"same content");
        assert_eq!(etag1, etag2);
    }

    #[test]
    fn test_etag_difference() {
        let etag1 = generate_etag(b"content a");
        let etag2 = generate_etag(b"content b");
        assert_ne!(etag1, etag2);
    }

    #[test]
    fn test_check_etag_match() {
        let etag = "\"abc123\"";
        assert!(check_etag_match(Some("\"abc123\""), etag));
        assert!(check_etag_match(Some("\"xyz\", \"abc123\""), etag));
        assert!(check_etag_match(Some("*"), etag));
        assert!(!check_etag_match(Some("\"different\""), etag));
        assert!(!check_etag_match(None, etag));
    }

    #[test]
    fn test_cache_policy_headers() {
        assert_eq!(
            CachePolicy::Public(3600).to_header_value(),
            "public, max-age=3600"
        );
        assert_eq!(
            CachePolicy::Immutable(2_592_000).to_header_value(),
            "public, max-age=2592000, immutable"
        );
        assert_eq!(CachePolicy::NoStore.to_header_value(), "no-store");
    }

    #[test]
    fn test_policy_per_mode() {
        assert_eq!(
            CachePolicy::for_mode(Mode::Production, 60),
            CachePolicy::Immutable(60)
        );
        assert_eq!(
            CachePolicy::for_mode(Mode::Development, 60),
            CachePolicy::NoStore
        );
    }
}
