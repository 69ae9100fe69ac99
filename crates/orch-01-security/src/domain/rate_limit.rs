//! Fixed-window rate limiting keyed by tenant and principal.
//!
//! The first request for a key opens a window; requests past the budget are
//! rejected until `window_ms` has elapsed since the window opened, at which
//! point the next request opens a fresh window.

use dashmap::DashMap;
use shared_types::Timestamp;
use tracing::debug;

use super::policy::{PolicyKey, RateLimit};

/// Counter state for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    pub window_start: Timestamp,
    pub last_request: Timestamp,
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Limited { retry_after_ms: u64 },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Per-key fixed-window counters.
///
/// Backed by a sharded map so concurrent callers on different keys do not
/// contend.
#[derive(Debug, Default)]
pub struct FixedWindowLimiter {
    entries: DashMap<PolicyKey, RateLimitEntry>,
}

impl FixedWindowLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request against `key`.
    pub fn check(&self, key: &PolicyKey, limit: RateLimit, now: Timestamp) -> RateLimitDecision {
        let mut entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| RateLimitEntry {
                count: 0,
                window_start: now,
                last_request: now,
            });

        if now.saturating_sub(entry.window_start) > limit.window_ms {
            entry.count = 0;
            entry.window_start = now;
        }
        entry.last_request = now;

        if entry.count >= limit.requests {
            let window_end = entry.window_start.saturating_add(limit.window_ms);
            return RateLimitDecision::Limited {
                retry_after_ms: window_end.saturating_sub(now),
            };
        }

        entry.count += 1;
        RateLimitDecision::Allowed {
            remaining: limit.requests - entry.count,
        }
    }

    /// Drop entries idle for longer than `max_idle_ms`. Returns how many.
    pub fn cleanup(&self, max_idle_ms: u64, now: Timestamp) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, entry| {
            let idle = now.saturating_sub(entry.last_request);
            if idle > max_idle_ms {
                debug!(key = %key, idle_ms = idle, "Removing stale rate limit entry");
                false
            } else {
                true
            }
        });
        before.saturating_sub(self.entries.len())
    }

    pub fn entry(&self, key: &PolicyKey) -> Option<RateLimitEntry> {
        self.entries.get(key).map(|e| *e)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
