//! Core rate limiter implementation.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};

use super::backend::AdmissionControl;
use super::bucket::TokenBucket;
use super::refill::RefillTask;
use crate::config::LimiterConfig;
use crate::error::Result;

/// A single token bucket together with the schedule that refills it.
///
/// The bucket starts full, so the first `capacity` requests are admitted
/// immediately. Every `1 / rate` seconds it is reset to full again. The
/// limiter is thread-safe and is meant to be shared behind an `Arc`.
#[derive(Debug)]
pub struct RateLimiter {
    /// Shared with the refill task
    bucket: Arc<TokenBucket>,
    /// Running refill schedule, stopped on drop
    refill: RefillTask,
}

impl RateLimiter {
    /// Create a full limiter and start its refill schedule.
    ///
    /// `rate` is requests per second, `capacity` the largest burst. Both must
    /// be positive. Must be called from within a tokio runtime.
    pub fn new(rate: f64, capacity: u64) -> Result<Self> {
        let bucket = Arc::new(TokenBucket::new(rate, capacity)?);
        let refill = RefillTask::spawn(Arc::clone(&bucket))?;

        info!(
            rate,
            capacity,
            interval = ?bucket.interval(),
            "Rate limiter initialized"
        );

        Ok(Self { bucket, refill })
    }

    /// Create a limiter from configuration.
    pub fn from_config(config: &LimiterConfig) -> Result<Self> {
        Self::new(config.rate, config.capacity)
    }

    /// Take one token if there is one.
    pub fn try_acquire(&self) -> bool {
        let admitted = self.bucket.try_acquire();
        if admitted {
            trace!("Request admitted");
        } else {
            debug!(capacity = self.bucket.capacity(), "Bucket exhausted, request rejected");
        }
        admitted
    }

    /// Tokens currently available.
    pub fn available(&self) -> u64 {
        self.bucket.available()
    }

    /// Maximum burst size.
    pub fn capacity(&self) -> u64 {
        self.bucket.capacity()
    }

    /// Refills per second.
    pub fn rate(&self) -> f64 {
        self.bucket.rate()
    }

    /// Time between refills.
    pub fn interval(&self) -> Duration {
        self.bucket.interval()
    }

    /// Number of scheduled refills that have fired.
    pub fn refill_count(&self) -> u64 {
        self.refill.fired()
    }

    /// Stop refilling. Requests keep draining whatever tokens are left.
    pub fn shutdown(&self) {
        info!(refills = self.refill.fired(), "Stopping rate limiter refill schedule");
        self.refill.stop();
    }
}

impl AdmissionControl for RateLimiter {
    fn admit(&self) -> bool {
        self.try_acquire()
    }

    /// Whole seconds until the next refill, at least one.
    fn retry_after(&self) -> Duration {
        let secs = self.interval().as_secs_f64().ceil().max(1.0);
        Duration::from_secs(secs as u64)
    }
}
