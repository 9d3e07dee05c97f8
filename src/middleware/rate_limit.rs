// SPDX-License-Identifier: MIT

//! In-memory fixed-window rate limiter.
//!
//! Best-effort, per-process, resets on restart; keyed on clerk id so a
//! single user cannot spam invitation emails. Constructed at startup and
//! owned by app state rather than a lazy global.

use dashmap::DashMap;

/// Fixed-window counter map.
pub struct RateLimiter {
    windows: DashMap<String, (i64, u32)>,
    limit: u32,
    window_secs: i64,
}

impl RateLimiter {
    pub fn new(limit: u32, window_secs: i64) -> Self {
        Self {
            windows: DashMap::new(),
            limit,
            window_secs,
        }
    }

    /// Count one request for `key`; returns false when over the limit.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, chrono::Utc::now().timestamp())
    }

    fn check_at(&self, key: &str, now: i64) -> bool {
        let window_start = now - (now % self.window_secs);
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert((window_start, 0));

        let (start, count) = *entry;
        if start != window_start {
            *entry = (window_start, 1);
            return true;
        }
        if count >= self.limit {
            return false;
        }
        *entry = (start, count + 1);
        true
    }
}
