//! Per-domain request rate limiting
//!
//! One limiter exists per domain for the life of a run. Callers reserve the
//! next request slot under a lock, then sleep outside it, so concurrent
//! fetches against the same domain still space their request starts by the
//! configured delay.

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

/// Spaces request starts by a fixed minimum delay.
#[derive(Debug)]
pub struct RateLimiter {
    delay: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            next_slot: Mutex::new(None),
        }
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        Self::new(Duration::from_secs_f64(secs))
    }

    /// A limiter that never waits, for tests and offline runs.
    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Wait until this caller's reserved request slot arrives.
    pub async fn acquire(&self) {
        let wait = {
            let mut slot = self.next_slot.lock().expect("rate limiter lock poisoned");
            let now = Instant::now();
            let ready = match *slot {
                Some(at) if at > now => at,
                _ => now,
            };
            *slot = Some(ready + self.delay);
            ready.saturating_duration_since(now)
        };

        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}
