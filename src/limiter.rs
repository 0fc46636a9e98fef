//! Token-bucket admission control
//!
//! The bucket starts full with `burst` tokens and refills at one token per
//! `interval`. Refill is computed lazily from elapsed monotonic time on each
//! check, so there is no background timer task to manage.
//!
//! [`RateLimiter::allow`] never blocks and never fails: it either consumes a
//! token or rejects.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A token-bucket rate limiter shared across all inbound requests
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use fangate::limiter::RateLimiter;
///
/// // 10 requests up front, then one more every 100ms
/// let limiter = RateLimiter::new(Duration::from_millis(100), 10);
/// assert!(limiter.allow());
/// ```
pub struct RateLimiter {
    interval: Duration,
    burst: u64,
    bucket: Mutex<Bucket>,
}

#[derive(Debug)]
struct Bucket {
    tokens: u64,
    /// Point in time up to which refill credit has been accounted for.
    last_refill: Instant,
}

impl RateLimiter {
    /// Create a limiter with `burst` capacity refilling one token per
    /// `interval`.
    ///
    /// # Panics
    ///
    /// Panics if `interval` is zero or `burst` is zero; both are rejected by
    /// configuration validation before a limiter is built.
    pub fn new(interval: Duration, burst: u64) -> Self {
        assert!(!interval.is_zero(), "interval must be positive");
        assert!(burst > 0, "burst must be at least 1");

        RateLimiter {
            interval,
            burst,
            bucket: Mutex::new(Bucket {
                tokens: burst,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Try to consume one token
    ///
    /// Returns `true` iff a token was available. Never blocks.
    pub fn allow(&self) -> bool {
        self.allow_at(Instant::now())
    }

    /// Clock-injected variant of [`allow`](Self::allow) used by tests
    pub fn allow_at(&self, now: Instant) -> bool {
        let mut bucket = self.bucket.lock().expect("limiter lock poisoned");

        let elapsed = now.saturating_duration_since(bucket.last_refill);
        let refilled = (elapsed.as_nanos() / self.interval.as_nanos()) as u64;
        if refilled > 0 {
            bucket.tokens = bucket.tokens.saturating_add(refilled).min(self.burst);
            if bucket.tokens == self.burst {
                // A full bucket cannot bank surplus refill credit.
                bucket.last_refill = now;
            } else {
                // Keep the fractional remainder so partial intervals
                // accumulate across calls.
                let leftover = elapsed.as_nanos() % self.interval.as_nanos();
                bucket.last_refill = now - Duration::from_nanos(leftover as u64);
            }
        }

        if bucket.tokens > 0 {
            bucket.tokens -= 1;
            true
        } else {
            false
        }
    }
}
