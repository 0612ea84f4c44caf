//! # Token Bucket
//!
//! The gate in front of line generation. A bucket holds up to `capacity`
//! units and refills continuously at `rate` units per second. Each batch of
//! log lines costs one unit per line.
//!
//! ```text
//!     consume(n) flow:
//!
//!     lock ──► refill (elapsed × rate, capped) ──► available ≥ n ?
//!                                                    │        │
//!                                                   Yes       No
//!                                                    │        │
//!                                              available -= n │
//!                                                    │        │
//!                                                  true     false
//! ```
//!
//! ## Lazy Refill
//!
//! There is no background thread. Tokens are added as a side effect of
//! `consume`, based on the monotonic time elapsed since the previous call,
//! so a bucket that sat idle for an hour is simply full on the next call.
//!
//! ## Thread Safety
//!
//! Refill, decision and decrement happen inside a single critical section,
//! which makes concurrent callers unable to double-spend the same tokens.

use parking_lot::Mutex;
use std::time::Instant;
use tracing::debug;

/// Token bucket rate limiter with fractional units.
///
/// # Example
///
/// ```rust
/// use logspout::TokenBucket;
///
/// // 10 units per second, burst up to 10
/// let bucket = TokenBucket::new(10.0, 10.0);
///
/// assert!(bucket.consume(10.0));
/// assert!(!bucket.consume(1.0));
/// ```
pub struct TokenBucket {
    /// Units added per second.
    rate: f64,

    /// Maximum number of buffered units.
    capacity: f64,

    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    /// Invariant: `0 <= available <= capacity`
    available: f64,
    last_refill: Instant,
    consumed: f64,
    rejected: u64,
}

/// Counters describing how a bucket has been used.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketStats {
    /// Units handed out by successful `consume` calls.
    pub consumed: f64,

    /// Number of `consume` calls that were declined.
    pub rejected: u64,

    /// Balance at the time of the snapshot (after refill).
    pub available: f64,

    /// Configured capacity.
    pub capacity: f64,
}

impl TokenBucket {
    /// Creates a bucket that starts full.
    ///
    /// Non-positive or non-finite values for `rate` or `capacity` are
    /// treated as zero. Such a bucket declines every positive request.
    ///
    /// # Arguments
    ///
    /// * `rate` - Units added per second
    /// * `capacity` - Maximum buffered units (burst size)
    pub fn new(rate: f64, capacity: f64) -> Self {
        let rate = sanitize(rate);
        let capacity = sanitize(capacity);
        Self {
            rate,
            capacity,
            state: Mutex::new(BucketState {
                available: capacity,
                last_refill: Instant::now(),
                consumed: 0.0,
                rejected: 0,
            }),
        }
    }

    /// Attempts to take `n` units from the bucket.
    ///
    /// Either all `n` units are taken or none are.
    ///
    /// # Returns
    ///
    /// - `true` if the caller may proceed
    /// - `false` if there were not enough units (state unchanged apart from refill)
    #[inline]
    pub fn consume(&self, n: f64) -> bool {
        self.consume_at(n, Instant::now())
    }

    /// `consume` against an explicit clock reading.
    ///
    /// Readings earlier than the last refill add nothing.
    pub(crate) fn consume_at(&self, n: f64, now: Instant) -> bool {
        let mut state = self.state.lock();
        self.refill(&mut state, now);

        if state.available >= n {
            state.available -= n;
            state.consumed += n;
            true
        } else {
            state.rejected += 1;
            false
        }
    }

    /// Returns the current balance after refilling.
    pub fn available(&self) -> f64 {
        let mut state = self.state.lock();
        self.refill(&mut state, Instant::now());
        state.available
    }

    /// Refill rate in units per second.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Maximum buffered units.
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Snapshot of the usage counters.
    pub fn stats(&self) -> BucketStats {
        let mut state = self.state.lock();
        self.refill(&mut state, Instant::now());
        BucketStats {
            consumed: state.consumed,
            rejected: state.rejected,
            available: state.available,
            capacity: self.capacity,
        }
    }

    #[inline]
    fn refill(&self, state: &mut BucketState, now: Instant) {
        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        if elapsed > 0.0 {
            state.available = (state.available + elapsed * self.rate).min(self.capacity);
            state.last_refill = now;
        }
    }
}

impl Drop for TokenBucket {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        debug!(
            "Token bucket retired: consumed {:.0} units, {} rejections",
            state.consumed, state.rejected
        );
    }
}

impl std::fmt::Debug for TokenBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBucket")
            .field("rate", &self.rate)
            .field("capacity", &self.capacity)
            .field("available", &self.available())
            .finish()
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
