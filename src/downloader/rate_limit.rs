//! Fixed-window token bucket shared by every outbound request
//!
//! All concurrent ticker tasks draw from one [`RateLimiter`]. Tokens reset to
//! capacity at each window boundary; a 429 from the API drains the bucket for the
//! remainder of the current window.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

/// Token bucket state guarded by the limiter's mutex
#[derive(Debug)]
struct Bucket {
    tokens: u32,
    window_start: Instant,
}

impl Bucket {
    /// Reset tokens to capacity if at least one window boundary has passed
    fn refill(&mut self, now: Instant, capacity: u32, interval: Duration) {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < interval {
            return;
        }
        let into_window = elapsed.as_nanos() % interval.as_nanos();
        self.window_start = now - Duration::from_nanos(into_window as u64);
        self.tokens = capacity;
    }
}

/// Global admission control for API requests
#[derive(Debug)]
pub struct RateLimiter {
    capacity: u32,
    interval: Duration,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Create a limiter granting `capacity` tokens per `interval`
    ///
    /// # Arguments
    /// * `capacity` - Tokens available in each window (at least 1)
    /// * `interval` - Window length (at least 1ms)
    pub fn new(capacity: u32, interval: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            interval: interval.max(Duration::from_millis(1)),
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                window_start: Instant::now(),
            }),
        }
    }

    /// Create a limiter granting `requests` tokens per second
    pub fn per_second(requests: u32) -> Self {
        Self::new(requests, Duration::from_secs(1))
    }

    /// Tokens that could be acquired right now without waiting
    pub fn available(&self) -> u32 {
        let bucket = self.lock();
        if Instant::now().saturating_duration_since(bucket.window_start) >= self.interval {
            self.capacity
        } else {
            bucket.tokens
        }
    }

    /// Wait until `n` tokens are available, then debit them
    ///
    /// Suspends the calling task only. Fails immediately when `n` exceeds the
    /// capacity, since such a request could never be admitted.
    pub async fn acquire(&self, n: u32) -> Result<(), RateLimitError> {
        if n > self.capacity {
            return Err(RateLimitError::ExceedsCapacity {
                requested: n,
                capacity: self.capacity,
            });
        }

        loop {
            let next_window = {
                let mut bucket = self.lock();
                bucket.refill(Instant::now(), self.capacity, self.interval);
                if bucket.tokens >= n {
                    bucket.tokens -= n;
                    return Ok(());
                }
                bucket.window_start + self.interval
            };

            debug!(
                requested = n,
                wait_ms = next_window
                    .saturating_duration_since(Instant::now())
                    .as_millis() as u64,
                "Rate limit budget exhausted, waiting for next window"
            );
            metrics::counter!("rate_limit_waits_total").increment(1);
            sleep_until(next_window).await;
        }
    }

    /// Remove every remaining token in the current window
    ///
    /// Tasks already waiting and any new acquirers block until the next window
    /// boundary.
    pub fn force_drain(&self) {
        let mut bucket = self.lock();
        bucket.refill(Instant::now(), self.capacity, self.interval);
        if bucket.tokens > 0 {
            warn!(
                drained = bucket.tokens,
                "Rate limit response received, draining remaining request budget"
            );
        }
        bucket.tokens = 0;
        metrics::counter!("rate_limit_drains_total").increment(1);
    }

    fn lock(&self) -> MutexGuard<'_, Bucket> {
        // Bucket counters stay consistent even if a holder panicked
        self.bucket.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Rate limiter errors
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    /// Requested more tokens than a window can ever hold
    #[error("requested {requested} tokens but the limiter capacity is {capacity}")]
    ExceedsCapacity {
        /// Tokens requested
        requested: u32,
        /// Tokens per window
        capacity: u32,
    },
}
