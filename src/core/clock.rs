//! # Clock: per-stage trigger loops.
//!
//! For every stage whose cadence parses, the clock spawns one trigger loop
//! that computes the next fire time, sleeps until it, and dispatches the
//! run onto its own task. A slow stage therefore never delays the timer,
//! and fires that arrive while a run is draining fall into the overlap
//! guard instead of piling up work.
//!
//! Cadence parse failures at arm time are reported, not fatal: the stage
//! is left un-armed, the issue is published as
//! [`EventKind::CadenceRejected`] and surfaced in `status`; other stages
//! continue.
//!
//! ## Cursor scheduling
//! Each loop advances a cursor `after = next` instead of re-reading the
//! wall clock, so cadence math stays pure and behaves deterministically
//! under tokio's paused test clock. Sleeps are relative to the dispatch
//! instant, so per-iteration dispatch latency shifts fire times slightly
//! rather than being corrected against the wall clock; at minute
//! resolution the offset stays well under one cadence slot.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::{select, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;

use crate::cadence::{parse_cadence, CadenceRef};
use crate::control::CadenceIssue;
use crate::events::{Event, EventKind};
use crate::stages::StageName;

use super::{runner::run_stage, state::Shared};

/// One armed stage's timer.
struct TimerHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
    armed_at: DateTime<Utc>,
    interval_hint: Option<Duration>,
}

/// Armed timers plus the cadences that refused to arm.
#[derive(Default)]
struct ClockState {
    timers: HashMap<StageName, TimerHandle>,
    issues: Vec<CadenceIssue>,
}

/// Trigger source: turns cadences into fire dispatches.
///
/// The clock emits fires only; it performs no business logic itself.
pub(crate) struct Clock {
    state: Mutex<ClockState>,
}

impl Clock {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(ClockState::default()),
        }
    }

    /// Arms a trigger loop for every stage whose cadence parses.
    ///
    /// Loops are installed for disabled stages too; the enable flag is
    /// checked at fire time, so flipping it via reconfigure needs no
    /// re-arm. Unparsable cadences become [`CadenceIssue`]s.
    pub(crate) fn arm(&self, shared: &Arc<Shared>) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.issues.clear();
        for stage in StageName::ALL {
            Self::install(&mut state, shared, stage);
        }
    }

    /// Cancels all pending timers. Idempotent.
    pub(crate) fn disarm(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        for (_, timer) in state.timers.drain() {
            timer.cancel.cancel();
            timer.join.abort();
        }
        state.issues.clear();
    }

    /// Cancels only this stage's timer and reinstalls it from the current
    /// definition. Used after a cadence change while running.
    pub(crate) fn rearm(&self, shared: &Arc<Shared>, stage: StageName) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(timer) = state.timers.remove(&stage) {
            timer.cancel.cancel();
            timer.join.abort();
        }
        state.issues.retain(|issue| issue.stage != stage);
        Self::install(&mut state, shared, stage);
    }

    /// Cadences that failed to arm, for `status`.
    pub(crate) fn issues(&self) -> Vec<CadenceIssue> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.issues.clone()
    }

    /// When this stage's loop was installed, if armed.
    pub(crate) fn armed_at(&self, stage: StageName) -> Option<DateTime<Utc>> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.timers.get(&stage).map(|t| t.armed_at)
    }

    /// Estimated recurrence interval for this stage, if armed.
    pub(crate) fn interval_hint(&self, stage: StageName) -> Option<Duration> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.timers.get(&stage).and_then(|t| t.interval_hint)
    }

    fn install(state: &mut ClockState, shared: &Arc<Shared>, stage: StageName) {
        let expression = shared.stage(stage).cadence().to_string();
        let cadence: CadenceRef = match parse_cadence(&expression) {
            Ok(cadence) => cadence,
            Err(err) => {
                shared.bus.publish(
                    Event::now(EventKind::CadenceRejected)
                        .with_stage(stage)
                        .with_reason(err.as_message()),
                );
                state.issues.push(CadenceIssue {
                    stage,
                    expression,
                    reason: err.as_message(),
                });
                return;
            }
        };

        let armed_at = Utc::now();
        let interval_hint = cadence.interval_hint(armed_at);
        let cancel = CancellationToken::new();
        let join = tokio::spawn(trigger_loop(
            Arc::clone(shared),
            stage,
            cadence,
            armed_at,
            cancel.clone(),
        ));

        shared
            .bus
            .publish(Event::now(EventKind::StageArmed).with_stage(stage));
        state.timers.insert(
            stage,
            TimerHandle {
                cancel,
                join,
                armed_at,
                interval_hint,
            },
        );
    }
}

impl Drop for Clock {
    // Timers must not leak past the scheduler.
    fn drop(&mut self) {
        self.disarm();
    }
}

/// One stage's timer loop: sleep until the next fire, dispatch, advance.
async fn trigger_loop(
    shared: Arc<Shared>,
    stage: StageName,
    cadence: CadenceRef,
    armed_at: DateTime<Utc>,
    cancel: CancellationToken,
) {
    let mut after = armed_at;
    loop {
        let Some(next) = cadence.next_after(after) else {
            // Cadence exhausted; nothing left to schedule.
            break;
        };
        let wait = (next - after).to_std().unwrap_or(Duration::ZERO);

        select! {
            () = cancel.cancelled() => break,
            () = time::sleep(wait) => {}
        }

        if shared.stage(stage).enabled() {
            shared
                .bus
                .publish(Event::now(EventKind::StageFired).with_stage(stage));
            let shared = Arc::clone(&shared);
            // Dispatched onto its own task: the loop never waits for work.
            tokio::spawn(async move {
                let _record = run_stage(&shared, stage).await;
            });
        }
        after = next;
    }
}
