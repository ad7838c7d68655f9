//! # Health classification.
//!
//! A point-in-time verdict per stage, derived purely from the run history,
//! the stage definition, and the clock's arm state — no hidden state, so
//! the same inputs always classify the same way.
//!
//! Skipped-overlap records are benign and excluded from the verdict; only
//! attempts that actually invoked work (success/failure) count.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::stages::StageDef;

use super::record::{RunOutcome, RunRecord};

/// Health verdict for one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StageHealth {
    /// Last executed run succeeded, or no runs yet and not yet stale.
    #[serde(rename = "healthy")]
    Healthy,
    /// At least one failure in the recent window, but not all.
    #[serde(rename = "degraded")]
    Degraded,
    /// Every run in the recent window failed, or the stage has been armed
    /// for longer than twice its cadence interval with zero runs recorded.
    #[serde(rename = "failing")]
    Failing,
    /// The stage's enable flag is off.
    #[serde(rename = "disabled")]
    Disabled,
}

/// Classifies one stage.
///
/// - `records`: the stage's retained history, oldest-first;
/// - `armed_at`: when the clock installed this stage's trigger loop
///   (`None` when not armed);
/// - `interval`: the cadence's estimated recurrence interval, used for the
///   staleness rule;
/// - `window`: how many recent executed runs the verdict looks at.
pub fn classify(
    def: &StageDef,
    records: &[RunRecord],
    armed_at: Option<DateTime<Utc>>,
    interval: Option<Duration>,
    now: DateTime<Utc>,
    window: usize,
) -> StageHealth {
    if !def.enabled() {
        return StageHealth::Disabled;
    }

    let executed: Vec<&RunRecord> = records.iter().filter(|r| r.executed()).collect();
    if executed.is_empty() {
        if is_stale(armed_at, interval, now) {
            return StageHealth::Failing;
        }
        return StageHealth::Healthy;
    }

    let window = window.max(1);
    let recent = &executed[executed.len().saturating_sub(window)..];
    let failures = recent
        .iter()
        .filter(|r| r.outcome == RunOutcome::Failure)
        .count();

    if failures == recent.len() {
        StageHealth::Failing
    } else if failures > 0 {
        StageHealth::Degraded
    } else {
        StageHealth::Healthy
    }
}

/// Staleness rule: armed for longer than 2× the cadence interval with zero
/// executed runs.
fn is_stale(
    armed_at: Option<DateTime<Utc>>,
    interval: Option<Duration>,
    now: DateTime<Utc>,
) -> bool {
    let (Some(armed_at), Some(interval)) = (armed_at, interval) else {
        return false;
    };
    let Ok(armed_for) = (now - armed_at).to_std() else {
        return false;
    };
    armed_for > interval * 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::{StageName, WorkFn, WorkRef};
    use crate::history::RunRecord;
    use tokio_util::sync::CancellationToken;

    fn noop() -> WorkRef {
        WorkFn::arc("noop", |_ctx: CancellationToken| async move {
            Ok::<_, crate::StageError>(Vec::new())
        })
    }

    fn def(enabled: bool) -> StageDef {
        let mut def = StageDef::new(StageName::DataProcessing, noop());
        def.set_enabled(enabled);
        def
    }

    fn run(outcome: RunOutcome) -> RunRecord {
        let now = Utc::now();
        RunRecord::finished(StageName::DataProcessing, now, now, 1, outcome, Vec::new())
    }

    const WINDOW: usize = 5;

    #[test]
    fn test_disabled_wins_over_everything() {
        let records = vec![run(RunOutcome::Failure)];
        let verdict = classify(&def(false), &records, None, None, Utc::now(), WINDOW);
        assert_eq!(verdict, StageHealth::Disabled);
    }

    #[test]
    fn test_no_runs_yet_is_healthy() {
        let verdict = classify(&def(true), &[], None, None, Utc::now(), WINDOW);
        assert_eq!(verdict, StageHealth::Healthy);
    }

    #[test]
    fn test_stale_armed_stage_is_failing() {
        let now = Utc::now();
        let armed_at = now - chrono::Duration::hours(3);
        let interval = Duration::from_secs(3600);
        let verdict = classify(&def(true), &[], Some(armed_at), Some(interval), now, WINDOW);
        assert_eq!(verdict, StageHealth::Failing);

        // Within 2x the interval: still healthy.
        let armed_recently = now - chrono::Duration::minutes(90);
        let verdict = classify(
            &def(true),
            &[],
            Some(armed_recently),
            Some(interval),
            now,
            WINDOW,
        );
        assert_eq!(verdict, StageHealth::Healthy);
    }

    #[test]
    fn test_mixed_window_is_degraded() {
        let records = vec![
            run(RunOutcome::Success),
            run(RunOutcome::Failure),
            run(RunOutcome::Success),
        ];
        let verdict = classify(&def(true), &records, None, None, Utc::now(), WINDOW);
        assert_eq!(verdict, StageHealth::Degraded);
    }

    #[test]
    fn test_all_recent_failures_is_failing() {
        let mut records = vec![run(RunOutcome::Success)];
        records.extend((0..WINDOW).map(|_| run(RunOutcome::Failure)));
        let verdict = classify(&def(true), &records, None, None, Utc::now(), WINDOW);
        assert_eq!(verdict, StageHealth::Failing);
    }

    #[test]
    fn test_skips_do_not_poison_the_verdict() {
        let records = vec![
            run(RunOutcome::Success),
            RunRecord::skipped(StageName::DataProcessing),
            RunRecord::skipped(StageName::DataProcessing),
        ];
        let verdict = classify(&def(true), &records, None, None, Utc::now(), WINDOW);
        assert_eq!(verdict, StageHealth::Healthy);
    }

    #[test]
    fn test_old_failures_roll_out_of_the_window() {
        let mut records = vec![run(RunOutcome::Failure)];
        records.extend((0..WINDOW).map(|_| run(RunOutcome::Success)));
        let verdict = classify(&def(true), &records, None, None, Utc::now(), WINDOW);
        assert_eq!(verdict, StageHealth::Healthy);
    }
}
