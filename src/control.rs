//! # Control surface read shapes.
//!
//! Serializable snapshots returned by `status` / `stats` / `health`. The
//! HTTP or CLI layer that relays them is out of scope; these types are the
//! boundary. All of them serialize with the camelCase field names the wire
//! expects.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::history::{HistorySummary, RunOutcome, RunRecord, StageHealth};
use crate::stages::StageName;

/// One stage's configuration as reported by `status`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageStatus {
    /// Stage name.
    pub name: StageName,
    /// Cadence expression, verbatim.
    pub cadence: String,
    /// Whether clock fires are honored.
    pub enabled: bool,
    /// Per-run timeout in milliseconds, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// A cadence that failed to arm, surfaced in `status`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CadenceIssue {
    /// Affected stage (left un-armed; others unaffected).
    pub stage: StageName,
    /// The offending expression, verbatim.
    pub expression: String,
    /// Parser diagnostic.
    pub reason: String,
}

/// Snapshot returned by `status`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    /// Whether the clock is armed.
    pub running: bool,
    /// All four stages, in pipeline order.
    pub stages: Vec<StageStatus>,
    /// Stages currently executing work.
    pub active_runs: Vec<StageName>,
    /// Cadences that failed to arm (empty when all armed cleanly).
    pub cadence_errors: Vec<CadenceIssue>,
}

/// Snapshot returned by `stats`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    /// The most recent records across all stages, newest-first.
    pub records: Vec<RunRecord>,
    /// Totals over **all** retained records, not just the listed ones.
    #[serde(flatten)]
    pub summary: HistorySummary,
}

/// One stage's entry in the `health` report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageHealthEntry {
    /// Stage name.
    pub name: StageName,
    /// The verdict.
    pub health: StageHealth,
    /// Outcome of the most recent executed run, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_outcome: Option<RunOutcome>,
    /// Start time of the most recent executed run, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<DateTime<Utc>>,
}

/// Snapshot returned by `health`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// All four stages, in pipeline order.
    pub stages: Vec<StageHealthEntry>,
}

impl HealthReport {
    /// Convenience lookup by stage.
    #[must_use]
    pub fn stage(&self, name: StageName) -> Option<&StageHealthEntry> {
        self.stages.iter().find(|entry| entry.name == name)
    }
}
