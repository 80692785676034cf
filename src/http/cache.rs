//! HTTP cache control module
//!
//! Provides `ETag` generation, conditional request handling and the
//! Cache-Control policies used for static assets.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Generate a quoted `ETag` from file content
pub fn generate_etag(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("\"{:x}\"", hasher.finish())
}

/// True if the client's `If-None-Match` header matches `etag` (should return 304).
///
/// Accepts a single tag, a comma separated list, weak tags (`W/"..."`) and `*`.
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|header| {
        header.split(',').map(str::trim).any(|candidate| {
            candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
        })
    })
}

/// Cache-Control policy for a served file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Public cache with max-age in seconds
    Public(u32),
    /// Always revalidate; used for the entry document so new deploys show up
    NoCache,
}

impl CachePolicy {
    pub fn to_header_value(self) -> String {
        match self {
            Self::Public(max_age) => format!("public, max-age={max_age}"),
            Self::NoCache => "no-cache".to_string(),
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::Public(3600)
    }
}
