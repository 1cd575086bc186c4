//! Fixed-window request limiter
//!
//! Counters are keyed by `(identifier, endpoint)`. A window opens on the
//! first request for a key and is reset lazily by the first request after
//! it ends.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;

use crate::clock::Clock;

/// Outcome of a single [`RateLimiter::check`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests left in the current window after this one
    pub remaining: u32,
    /// When the current window ends
    pub reset_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: DateTime<Utc>,
    count: u32,
}

pub struct RateLimiter {
    windows: DashMap<(String, String), Window>,
    window: Duration,
    max_requests: u32,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Windows longer than chrono can represent are clamped to its maximum.
    pub fn new(window_seconds: u64, max_requests: u32, clock: Arc<dyn Clock>) -> Self {
        let window = i64::try_from(window_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        Self {
            windows: DashMap::new(),
            window,
            max_requests,
            clock,
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Count a request and decide whether it may proceed
    pub fn check(&self, identifier: &str, endpoint: &str) -> RateLimitDecision {
        let now = self.clock.now();
        let mut entry = self
            .windows
            .entry((identifier.to_string(), endpoint.to_string()))
            .or_insert(Window {
                started: now,
                count: 0,
            });

        if now - entry.started >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        let reset_at = entry
            .started
            .checked_add_signed(self.window)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        if entry.count >= self.max_requests {
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at,
            };
        }

        entry.count += 1;
        RateLimitDecision {
            allowed: true,
            remaining: self.max_requests - entry.count,
            reset_at,
        }
    }

    /// Drop windows that have ended
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.windows.len();
        self.windows.retain(|_, w| now - w.started < self.window);
        before - self.windows.len()
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}
