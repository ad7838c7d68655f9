//! # Bounded per-stage run history.
//!
//! The store keeps the most recent `retention` records per stage
//! (most-recent-last, FIFO eviction) behind a mutex. Appends for one stage
//! happen while the runner still holds that stage's overlap permit, so the
//! per-stage order always reflects real start order; the global `seq` on
//! each record orders merged views.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use serde::Serialize;

use crate::stages::StageName;

use super::record::{RunOutcome, RunRecord};

/// Derived totals over all retained records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    /// Number of retained records across all stages.
    pub total_runs: u64,
    /// Mean duration across retained records (skips count as zero).
    pub avg_duration_ms: u64,
    /// Number of retained records with `outcome != success`.
    pub total_errors: u64,
}

/// Bounded, per-stage run record store.
#[derive(Debug)]
pub struct RunHistory {
    retention: usize,
    inner: Mutex<HashMap<StageName, VecDeque<RunRecord>>>,
}

impl RunHistory {
    /// Creates a store retaining the last `retention` records per stage
    /// (clamped to ≥ 1).
    pub fn new(retention: usize) -> Self {
        Self {
            retention: retention.max(1),
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Appends a record, evicting the oldest if the stage is at capacity.
    pub fn record(&self, record: RunRecord) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let entries = inner.entry(record.stage).or_default();
        if entries.len() == self.retention {
            entries.pop_front();
        }
        entries.push_back(record);
    }

    /// Returns one stage's retained records, oldest-first.
    pub fn for_stage(&self, stage: StageName) -> Vec<RunRecord> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .get(&stage)
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the most recent `limit` records across all stages,
    /// newest-first (by global sequence).
    pub fn recent(&self, limit: usize) -> Vec<RunRecord> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let mut merged: Vec<RunRecord> = inner.values().flatten().cloned().collect();
        merged.sort_by(|a, b| b.seq.cmp(&a.seq));
        merged.truncate(limit);
        merged
    }

    /// Computes totals over all retained records.
    pub fn summary(&self) -> HistorySummary {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let mut total_runs = 0u64;
        let mut total_errors = 0u64;
        let mut duration_sum = 0u128;
        for record in inner.values().flatten() {
            total_runs += 1;
            duration_sum += u128::from(record.duration_ms);
            if record.outcome != RunOutcome::Success {
                total_errors += 1;
            }
        }
        let avg_duration_ms = if total_runs == 0 {
            0
        } else {
            (duration_sum / u128::from(total_runs)) as u64
        };
        HistorySummary {
            total_runs,
            avg_duration_ms,
            total_errors,
        }
    }
}
