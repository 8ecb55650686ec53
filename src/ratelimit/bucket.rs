//! Fixed-window token bucket.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

use crate::error::{Result, TurnstileError};

/// A token bucket that is reset to full capacity once per interval.
///
/// The bucket only holds state; something else (see
/// [`RefillTask`](super::RefillTask)) has to call [`TokenBucket::refill`] on a
/// schedule. Refill is a reset, not an accrual: whatever was left in the
/// bucket is discarded and the count goes back to `capacity`.
#[derive(Debug)]
pub struct TokenBucket {
    /// Maximum number of tokens the bucket can hold
    capacity: u64,
    /// Refills per second
    rate: f64,
    /// Time between refills, `1s / rate`
    interval: Duration,
    /// Tokens currently available, always within `0..=capacity`
    tokens: Mutex<u64>,
}

impl TokenBucket {
    /// Create a full bucket.
    ///
    /// `rate` is in requests per second and must be positive and finite;
    /// `capacity` must be at least one. Invalid values are rejected rather
    /// than clamped.
    pub fn new(rate: f64, capacity: u64) -> Result<Self> {
        if capacity == 0 {
            return Err(TurnstileError::InvalidCapacity(capacity));
        }
        let interval = refill_interval(rate)?;

        Ok(Self {
            capacity,
            rate,
            interval,
            tokens: Mutex::new(capacity),
        })
    }

    /// Take one token if there is one.
    ///
    /// Returns `true` when the caller is admitted. Never waits.
    pub fn try_acquire(&self) -> bool {
        let mut tokens = self.tokens.lock();
        if *tokens > 0 {
            *tokens -= 1;
            true
        } else {
            false
        }
    }

    /// Reset the bucket to full capacity.
    ///
    /// Returns the number of tokens that were left unused.
    pub fn refill(&self) -> u64 {
        let mut tokens = self.tokens.lock();
        std::mem::replace(&mut *tokens, self.capacity)
    }

    /// Tokens currently available.
    pub fn available(&self) -> u64 {
        *self.tokens.lock()
    }

    /// Maximum number of tokens the bucket can hold.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Refills per second.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Time between refills.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Convert a per-second rate into the period between refills.
fn refill_interval(rate: f64) -> Result<Duration> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(TurnstileError::InvalidRate(rate));
    }

    // Very small rates overflow Duration, very large ones round down to zero.
    let interval = match Duration::try_from_secs_f64(1.0 / rate) {
        Ok(interval) if !interval.is_zero() => interval,
        _ => return Err(TurnstileError::InvalidRate(rate)),
    };

    // The schedule needs the first two deadlines on the monotonic clock.
    Instant::now()
        .checked_add(interval)
        .and_then(|first| first.checked_add(interval))
        .map(|_| interval)
        .ok_or(TurnstileError::InvalidRate(rate))
}
