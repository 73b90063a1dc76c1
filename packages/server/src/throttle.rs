//! Per-user request throttling.
//!
//! Fixed one-second windows keyed by user id. Optimistic bookkeeping: two
//! requests racing at a window edge may both pass, an accepted trade-off
//! compared to locking every request.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::error::AppError;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// In-memory fixed-window rate limiter, default 2 requests/second per user.
pub struct RateLimiter {
    windows: DashMap<String, Window>,
    per_second: u32,
}

impl RateLimiter {
    pub fn new(per_second: u32) -> Self {
        Self {
            windows: DashMap::new(),
            per_second,
        }
    }

    /// Record a request for `user_id`, rejecting it when the current window
    /// is full. A `per_second` of 0 disables throttling.
    pub fn check(&self, user_id: &str) -> Result<(), AppError> {
        if self.per_second == 0 {
            return Ok(());
        }

        let now = Instant::now();
        let mut window = self.windows.entry(user_id.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(window.started) >= Duration::from_secs(1) {
            window.started = now;
            window.count = 0;
        }

        if window.count >= self.per_second {
            return Err(AppError::RateLimited { retry_after: 1 });
        }

        window.count += 1;
        Ok(())
    }
}
