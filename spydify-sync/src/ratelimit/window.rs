//! Sliding-window request limiter
//!
//! Tracks admitted request timestamps over any number of rolling windows,
//! each with its own cap. A request is admitted once every window holds
//! fewer timestamps than its cap. Timestamps are kept oldest-first, so
//! eviction only ever pops from the front.

use crate::clock::{sleep_or_cancel, Cancelled, Clock};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Smallest wait issued while a window is saturated
///
/// Guards against float rounding leaving the oldest timestamp a hair inside
/// the window after a computed wait.
const MIN_QUOTA_WAIT: Duration = Duration::from_millis(1);

/// One rolling window and its cap
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSpec {
    pub name: String,
    /// Window length in seconds
    pub duration_secs: f64,
    /// Maximum admitted requests inside the window
    pub cap: usize,
}

impl WindowSpec {
    pub fn new(name: impl Into<String>, duration_secs: f64, cap: usize) -> Self {
        Self {
            name: name.into(),
            duration_secs,
            cap,
        }
    }
}

#[derive(Debug, Clone)]
struct Window {
    spec: WindowSpec,
    timestamps: VecDeque<f64>,
}

impl Window {
    fn evict(&mut self, now: f64) {
        while let Some(&oldest) = self.timestamps.front() {
            if now - oldest >= self.spec.duration_secs {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    fn is_saturated(&self) -> bool {
        self.timestamps.len() >= self.spec.cap
    }

    fn wait_until_free(&self, now: f64) -> Duration {
        let oldest = self.timestamps.front().copied().unwrap_or(now);
        let remaining = self.spec.duration_secs - (now - oldest);
        spydify_common::time::secs_to_duration(remaining).max(MIN_QUOTA_WAIT)
    }
}

/// Multi-window quota gate
///
/// Owned by the scheduler and handed to the fetcher for every call; there
/// is no ambient shared state.
pub struct SlidingWindowLimiter {
    windows: Vec<Window>,
    base_delay: Duration,
    total_requests: u64,
    clock: Arc<dyn Clock>,
}

impl SlidingWindowLimiter {
    pub fn new(specs: Vec<WindowSpec>, base_delay: Duration, clock: Arc<dyn Clock>) -> Self {
        let windows = specs
            .into_iter()
            .map(|spec| Window {
                spec,
                timestamps: VecDeque::new(),
            })
            .collect();
        Self {
            windows,
            base_delay,
            total_requests: 0,
            clock,
        }
    }

    /// Provider A quotas: 40 per 30 s, 2500 per hour, 4500 per day
    pub fn spotify(base_delay: Duration, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            vec![
                WindowSpec::new(super::HALFMIN, 30.0, 40),
                WindowSpec::new(super::HOURLY, 3_600.0, 2_500),
                WindowSpec::new(super::DAILY, 86_400.0, 4_500),
            ],
            base_delay,
            clock,
        )
    }

    /// Provider B quota: one request per second
    pub fn musicbrainz(clock: Arc<dyn Clock>) -> Self {
        Self::new(
            vec![WindowSpec::new("per_second", 1.0, 1)],
            Duration::ZERO,
            clock,
        )
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests
    }

    /// Current (name, count) per window, without evicting
    pub fn window_counts(&self) -> Vec<(&str, usize)> {
        self.windows
            .iter()
            .map(|w| (w.spec.name.as_str(), w.timestamps.len()))
            .collect()
    }

    /// Timestamps held by the named window, oldest first
    pub fn timestamps(&self, name: &str) -> Vec<f64> {
        self.windows
            .iter()
            .find(|w| w.spec.name == name)
            .map(|w| w.timestamps.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Replace the named window's history and the request counter
    ///
    /// Timestamps are sorted so the oldest-first invariant holds even for a
    /// hand-edited log. Unknown window names are ignored.
    pub fn restore(&mut self, total_requests: u64, histories: &[(&str, Vec<f64>)]) {
        self.total_requests = total_requests;
        for (name, history) in histories {
            if let Some(window) = self.windows.iter_mut().find(|w| w.spec.name == *name) {
                let mut sorted: Vec<f64> = history.iter().copied().filter(|t| t.is_finite()).collect();
                sorted.sort_by(|a, b| a.total_cmp(b));
                window.timestamps = sorted.into();
            }
        }
    }

    /// Drop timestamps that have left their window
    pub fn evict(&mut self, now: f64) {
        for window in &mut self.windows {
            window.evict(now);
        }
    }

    /// How long the first saturated window needs before it frees a slot
    pub fn required_wait(&self, now: f64) -> Option<(&str, Duration)> {
        self.windows
            .iter()
            .find(|w| w.is_saturated())
            .map(|w| (w.spec.name.as_str(), w.wait_until_free(now)))
    }

    /// Record an admitted request at `now` in every window
    pub fn record(&mut self, now: f64) {
        for window in &mut self.windows {
            window.timestamps.push_back(now);
        }
        self.total_requests += 1;
    }

    /// Wait until a request is admissible, then record it
    ///
    /// Applies the base delay first, then blocks on each saturated window
    /// until its oldest timestamp expires, re-checking after every wake-up.
    pub async fn await_slot(&mut self, cancel: &CancellationToken) -> Result<(), Cancelled> {
        let clock = Arc::clone(&self.clock);

        if self.total_requests % 10 == 0 {
            tracing::debug!(
                total_requests = self.total_requests,
                windows = ?self.window_counts(),
                base_delay_ms = self.base_delay.as_millis() as u64,
                "Request quota status"
            );
        }

        sleep_or_cancel(clock.as_ref(), self.base_delay, cancel).await?;

        loop {
            let now = clock.now();
            self.evict(now);
            let Some((name, wait)) = self.required_wait(now) else {
                break;
            };
            tracing::info!(
                window = name,
                wait_secs = %format!("{:.2}", wait.as_secs_f64()),
                "Quota window full, waiting"
            );
            sleep_or_cancel(clock.as_ref(), wait, cancel).await?;
        }

        self.record(clock.now());
        Ok(())
    }
}
