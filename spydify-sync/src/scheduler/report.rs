//! Run summary

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOutcome {
    /// Every enabled stage reported zero eligible rows in the same pass
    Completed,
    /// Cancelled; committed progress is kept
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub outcome: SyncOutcome,
    pub seeded_tracks: usize,
    pub pages_processed: u64,
    pub records_persisted: u64,
    pub fetch_failures: u64,
    pub quarantined: usize,
    pub total_requests: u64,
}

impl Default for SyncReport {
    fn default() -> Self {
        Self {
            outcome: SyncOutcome::Completed,
            seeded_tracks: 0,
            pages_processed: 0,
            records_persisted: 0,
            fetch_failures: 0,
            quarantined: 0,
            total_requests: 0,
        }
    }
}

impl SyncReport {
    /// Items were quarantined and nothing was persisted
    ///
    /// Typical of a provider rejecting every request (expired token,
    /// revoked access): the run terminates but made no progress.
    pub fn stalled(&self) -> bool {
        self.quarantined > 0 && self.records_persisted == 0
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}: {} pages, {} records persisted, {} fetch failures, {} quarantined, {} requests",
            self.outcome,
            self.pages_processed,
            self.records_persisted,
            self.fetch_failures,
            self.quarantined,
            self.total_requests
        )
    }
}
