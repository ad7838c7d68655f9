//! # Run a single stage attempt under the overlap guard.
//!
//! This helper drives one execution of a stage's work, with an optional
//! per-run timeout, cancellation, event publishing, and history recording.
//!
//! ```text
//!   fire / trigger_now
//!          ▼
//!   try_acquire guard ──miss──► RunRecord(skipped-overlap), no work
//!          │hit
//!          ▼
//!   work.run(cancel token) ──► timeout? ──► outcome
//!          └───────── publishes ─────────────┘
//!       (Bus: Starting/Succeeded/Failed/TimedOut/Skipped)
//! ```
//!
//! - If the stage's timeout is set, the work is wrapped in
//!   [`tokio::time::timeout`]; on expiry the run's token is cancelled, a
//!   [`EventKind::StageTimedOut`] is published, and the run records a
//!   failure.
//! - Work errors are swallowed here: they become `failure` records and
//!   [`EventKind::StageFailed`] events, never panics or propagation. The
//!   scheduler must be unkillable by a misbehaving stage.
//! - The history append happens while the permit is still held, so each
//!   stage's records land in real start order.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::error::StageError;
use crate::events::{Event, EventKind};
use crate::history::{RunOutcome, RunRecord};
use crate::stages::StageName;

use super::state::Shared;

/// Executes one run of `stage`, honoring the overlap guard.
///
/// Returns the resulting record; an immediate `skipped-overlap` record if a
/// run of the same stage is already in flight.
pub(crate) async fn run_stage(shared: &Arc<Shared>, stage: StageName) -> RunRecord {
    let Some(permit) = shared.active.try_acquire(stage) else {
        let record = RunRecord::skipped(stage);
        shared.history.record(record.clone());
        shared
            .bus
            .publish(Event::now(EventKind::StageSkipped).with_stage(stage));
        return record;
    };

    let (work, timeout) = {
        let def = shared.stage(stage);
        (def.work(), def.timeout().or(shared.cfg.default_timeout()))
    };

    shared
        .bus
        .publish(Event::now(EventKind::StageStarting).with_stage(stage));

    let started_at = Utc::now();
    let clock = Instant::now();
    let cancel = CancellationToken::new();

    let result = match timeout {
        Some(dur) => match time::timeout(dur, work.run(cancel.clone())).await {
            Ok(r) => r,
            Err(_elapsed) => {
                cancel.cancel();
                shared.bus.publish(
                    Event::now(EventKind::StageTimedOut)
                        .with_stage(stage)
                        .with_timeout(dur),
                );
                Err(StageError::Timeout { timeout: dur })
            }
        },
        None => work.run(cancel).await,
    };

    let ended_at = Utc::now();
    let duration = clock.elapsed();
    let duration_ms = duration.as_millis().min(u128::from(u64::MAX)) as u64;

    let record = match result {
        Ok(messages) => {
            shared.bus.publish(
                Event::now(EventKind::StageSucceeded)
                    .with_stage(stage)
                    .with_duration(duration),
            );
            RunRecord::finished(
                stage,
                started_at,
                ended_at,
                duration_ms,
                RunOutcome::Success,
                messages,
            )
        }
        Err(error) => {
            shared.bus.publish(
                Event::now(EventKind::StageFailed)
                    .with_stage(stage)
                    .with_reason(error.as_message())
                    .with_duration(duration),
            );
            RunRecord::finished(
                stage,
                started_at,
                ended_at,
                duration_ms,
                RunOutcome::Failure,
                vec![error.as_message()],
            )
        }
    };

    shared.history.record(record.clone());
    drop(permit);
    record
}
