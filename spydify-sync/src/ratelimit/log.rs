//! Persisted request log
//!
//! JSON snapshot of the Provider A limiter, carried across process runs so a
//! restart does not forget requests that still count against a quota.

use super::{SlidingWindowLimiter, DAILY, HALFMIN, HOURLY};
use serde::{Deserialize, Serialize};
use spydify_common::fs::write_json_atomic;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateLimitLog {
    #[serde(default)]
    pub total_requests: u64,
    #[serde(default)]
    pub halfmin_timestamps: Vec<f64>,
    #[serde(default)]
    pub hourly_timestamps: Vec<f64>,
    #[serde(default)]
    pub daily_timestamps: Vec<f64>,
}

impl RateLimitLog {
    /// Load the log at `path`
    ///
    /// Never fails: a missing file or a file that does not parse yields an
    /// empty log.
    pub async fn load(path: &Path) -> Self {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No request log found, starting empty");
                return Self::default();
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Request log unreadable, starting empty");
                return Self::default();
            }
        };

        match serde_json::from_str::<Self>(&contents) {
            Ok(log) => {
                tracing::info!(
                    path = %path.display(),
                    total_requests = log.total_requests,
                    daily = log.daily_timestamps.len(),
                    "Loaded request log"
                );
                log
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Request log malformed, starting empty");
                Self::default()
            }
        }
    }

    /// Atomically write the log to `path`
    pub fn save(&self, path: &Path) -> spydify_common::Result<()> {
        write_json_atomic(path, self)
    }

    /// Snapshot the three Provider A windows of `limiter`
    pub fn capture(limiter: &SlidingWindowLimiter) -> Self {
        Self {
            total_requests: limiter.total_requests(),
            halfmin_timestamps: limiter.timestamps(HALFMIN),
            hourly_timestamps: limiter.timestamps(HOURLY),
            daily_timestamps: limiter.timestamps(DAILY),
        }
    }

    /// Seed `limiter` with this log's history
    pub fn apply_to(&self, limiter: &mut SlidingWindowLimiter) {
        limiter.restore(
            self.total_requests,
            &[
                (HALFMIN, self.halfmin_timestamps.clone()),
                (HOURLY, self.hourly_timestamps.clone()),
                (DAILY, self.daily_timestamps.clone()),
            ],
        );
    }
}
