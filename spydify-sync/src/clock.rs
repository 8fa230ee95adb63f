//! Time source used by the limiter and the fetcher
//!
//! Every wait in the retrieval layer goes through a [`Clock`], so the
//! three-window quota logic and the retry timings can be exercised against
//! [`ManualClock`] without real sleeping.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Wall clock plus the ability to wait
#[async_trait]
pub trait Clock: Send + Sync {
    /// Seconds since the Unix epoch
    fn now(&self) -> f64;

    /// Suspend for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Real time: chrono for "now", tokio for sleeping
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> f64 {
        spydify_common::time::epoch_seconds()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Deterministic clock for tests
///
/// `sleep` returns immediately after advancing the clock, and every
/// requested duration is recorded so tests can assert on waits.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    inner: Arc<Mutex<ManualState>>,
}

#[derive(Debug, Default)]
struct ManualState {
    now: f64,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    /// Create a clock reading `start` seconds
    pub fn starting_at(start: f64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ManualState {
                now: start,
                sleeps: Vec::new(),
            })),
        }
    }

    /// Move time forward without recording a sleep
    pub fn advance(&self, secs: f64) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state.now += secs;
    }

    /// Every duration passed to `sleep`, oldest first
    pub fn sleeps(&self) -> Vec<Duration> {
        let state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state.sleeps.clone()
    }

    /// Sum of all recorded sleeps
    pub fn total_slept(&self) -> Duration {
        self.sleeps().into_iter().sum()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> f64 {
        let state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state.now
    }

    async fn sleep(&self, duration: Duration) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state.now += duration.as_secs_f64();
        state.sleeps.push(duration);
    }
}

/// Returned when a wait was cut short by cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Sleep on `clock` unless `cancel` fires first
pub async fn sleep_or_cancel(
    clock: &dyn Clock,
    duration: Duration,
    cancel: &CancellationToken,
) -> Result<(), Cancelled> {
    if cancel.is_cancelled() {
        return Err(Cancelled);
    }
    if duration.is_zero() {
        return Ok(());
    }
    tokio::select! {
        _ = clock.sleep(duration) => Ok(()),
        _ = cancel.cancelled() => Err(Cancelled),
    }
}
