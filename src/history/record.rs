//! # Run records: one immutable entry per execution attempt.
//!
//! Records carry a global sequence number so that merged views across
//! stages can restore real start order even when runs of different stages
//! complete concurrently.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::stages::StageName;

/// Global sequence counter for record ordering.
static RECORD_SEQ: AtomicU64 = AtomicU64::new(0);

/// Outcome of one execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunOutcome {
    /// Work returned normally.
    #[serde(rename = "success")]
    Success,
    /// Work failed (or timed out); the error is in `error_messages`.
    #[serde(rename = "failure")]
    Failure,
    /// A fire arrived while the stage was still running; no work invoked.
    #[serde(rename = "skipped-overlap")]
    SkippedOverlap,
}

/// One execution attempt of a stage.
///
/// Invariants:
/// - `ended_at >= started_at`;
/// - `outcome == SkippedOverlap` implies `duration_ms == 0` and that no
///   work was invoked.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    /// Stage this attempt belongs to.
    pub stage: StageName,
    /// Global, monotonically increasing sequence number.
    pub seq: u64,
    /// When the attempt started (wall clock, UTC).
    pub started_at: DateTime<Utc>,
    /// When the attempt ended (wall clock, UTC).
    pub ended_at: DateTime<Utc>,
    /// Run duration in milliseconds (monotonic clock; zero for skips).
    pub duration_ms: u64,
    /// How the attempt ended.
    pub outcome: RunOutcome,
    /// Ordered messages collected during the run. A successful run may
    /// still carry non-fatal sub-error messages; a failed run carries the
    /// failure reason.
    pub error_messages: Vec<String>,
}

impl RunRecord {
    /// Builds a record for a completed attempt (success or failure).
    pub fn finished(
        stage: StageName,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        duration_ms: u64,
        outcome: RunOutcome,
        error_messages: Vec<String>,
    ) -> Self {
        Self {
            stage,
            seq: RECORD_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            started_at,
            ended_at: ended_at.max(started_at),
            duration_ms,
            outcome,
            error_messages,
        }
    }

    /// Builds a skipped-overlap record: zero duration, no work invoked.
    pub fn skipped(stage: StageName) -> Self {
        let now = Utc::now();
        Self::finished(stage, now, now, 0, RunOutcome::SkippedOverlap, Vec::new())
    }

    /// True if the attempt actually ran work (success or failure).
    #[must_use]
    pub fn executed(&self) -> bool {
        self.outcome != RunOutcome::SkippedOverlap
    }
}
