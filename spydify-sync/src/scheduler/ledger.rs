//! Per-run failure accounting
//!
//! Counts failures per (stage, id). An item that reaches the limit is
//! quarantined: excluded from page selection and from the termination
//! predicate until the process exits. Nothing is written to the store, so
//! the next run starts with a clean ledger.

use super::stage::Stage;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct FailureLedger {
    /// Failures before quarantine; zero disables quarantine
    max_failures: u32,
    counts: HashMap<(Stage, String), u32>,
    quarantined: [HashSet<String>; 5],
}

impl FailureLedger {
    pub fn new(max_failures: u32) -> Self {
        Self {
            max_failures,
            ..Default::default()
        }
    }

    /// Record one failure; returns true when this pushes the item into
    /// quarantine
    pub fn charge(&mut self, stage: Stage, id: &str) -> bool {
        if self.max_failures == 0 || self.is_quarantined(stage, id) {
            return false;
        }

        let count = self.counts.entry((stage, id.to_string())).or_insert(0);
        *count += 1;
        if *count < self.max_failures {
            return false;
        }

        self.counts.remove(&(stage, id.to_string()));
        self.quarantined[stage.index()].insert(id.to_string());
        tracing::warn!(
            stage = %stage,
            id,
            failures = self.max_failures,
            "Item quarantined for the rest of this run"
        );
        true
    }

    pub fn failures(&self, stage: Stage, id: &str) -> u32 {
        self.counts.get(&(stage, id.to_string())).copied().unwrap_or(0)
    }

    pub fn is_quarantined(&self, stage: Stage, id: &str) -> bool {
        self.quarantined[stage.index()].contains(id)
    }

    /// Ids of `stage` excluded from selection
    pub fn excluded(&self, stage: Stage) -> &HashSet<String> {
        &self.quarantined[stage.index()]
    }

    pub fn quarantined_count(&self) -> usize {
        self.quarantined.iter().map(HashSet::len).sum()
    }
}
