//! Periodic refill schedule for a [`TokenBucket`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, trace};

use super::bucket::TokenBucket;
use crate::error::{Result, TurnstileError};

/// Background task that resets a bucket once per interval.
///
/// The schedule runs on a fixed grid starting one interval after spawn, so
/// the time the refill itself takes never pushes later ticks back. Ticks
/// missed while the runtime was stalled are skipped rather than replayed.
/// The task is aborted when this handle is dropped.
#[derive(Debug)]
pub struct RefillTask {
    handle: JoinHandle<()>,
    fired: Arc<AtomicU64>,
}

impl RefillTask {
    /// Spawn the refill schedule for `bucket` on the current tokio runtime.
    ///
    /// The first refill is due one interval from now. Fails when there is no
    /// runtime to run on, or when the runtime clock cannot represent the
    /// first deadlines.
    pub fn spawn(bucket: Arc<TokenBucket>) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            TurnstileError::Config(format!("refill schedule needs a tokio runtime: {e}"))
        })?;

        let period = bucket.interval();
        let start = Instant::now()
            .checked_add(period)
            .filter(|start| start.checked_add(period).is_some())
            .ok_or(TurnstileError::InvalidRate(bucket.rate()))?;

        debug!(interval = ?period, capacity = bucket.capacity(), "Starting refill schedule");

        let fired = Arc::new(AtomicU64::new(0));
        let handle = runtime.spawn(run(bucket, start, Arc::clone(&fired)));
        Ok(Self { handle, fired })
    }

    /// Number of refills performed so far.
    pub fn fired(&self) -> u64 {
        self.fired.load(Ordering::Acquire)
    }

    /// Stop the schedule. The bucket keeps whatever tokens it holds.
    pub fn stop(&self) {
        self.handle.abort();
    }

    /// Whether the schedule has stopped.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for RefillTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn run(bucket: Arc<TokenBucket>, start: Instant, fired: Arc<AtomicU64>) {
    let mut ticker = time::interval_at(start, bucket.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let unused = bucket.refill();
        let count = fired.fetch_add(1, Ordering::AcqRel) + 1;
        trace!(refill = count, unused, "Bucket refilled");
    }
}
