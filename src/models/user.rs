// SPDX-License-Identifier: MIT

//! Cached identity-provider profile data.

use serde::{Deserialize, Serialize};

/// Cache TTL for identity-provider profile data.
pub const PROFILE_CACHE_TTL_HOURS: i64 = 24;

/// Profile fields cached from the identity provider.
///
/// The identity provider remains the source of truth; this is a read-through
/// cache (TTL re-fetch, opportunistic population) so list enrichment does not
/// hit the provider on every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedProfile {
    pub clerk_id: String,
    pub username: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// When this cache entry was written (ISO 8601)
    pub cached_at: String,
}

impl CachedProfile {
    /// Whether this entry is within the cache TTL as of `now`.
    ///
    /// Unparseable timestamps are treated as stale.
    pub fn is_fresh(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        chrono::DateTime::parse_from_rfc3339(&self.cached_at)
            .map(|cached| {
                now.signed_duration_since(cached.with_timezone(&chrono::Utc))
                    .num_hours()
                    < PROFILE_CACHE_TTL_HOURS
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(cached_at: &str) -> CachedProfile {
        CachedProfile {
            clerk_id: "u1".to_string(),
            username: "alice".to_string(),
            display_name: "Alice".to_string(),
            image_url: None,
            cached_at: cached_at.to_string(),
        }
    }

    #[test]
    fn fresh_within_ttl() {
        let now = chrono::Utc::now();
        let recent = (now - chrono::Duration::hours(1)).to_rfc3339();
        assert!(profile(&recent).is_fresh(now));
    }

    #[test]
    fn stale_after_ttl() {
        let now = chrono::Utc::now();
        let old = (now - chrono::Duration::hours(PROFILE_CACHE_TTL_HOURS + 1)).to_rfc3339();
        assert!(!profile(&old).is_fresh(now));
    }

    #[test]
    fn garbage_timestamp_is_stale() {
        assert!(!profile("not-a-date").is_fresh(chrono::Utc::now()));
    }
}
