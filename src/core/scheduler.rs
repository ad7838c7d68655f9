//! # Scheduler: lifecycle state machine and control operations.
//!
//! Owns the clock, the stage set, the overlap guard, and the run history,
//! and exposes the whole control surface:
//!
//! ```text
//!                    ┌────────────────────────────────────────────┐
//!                    │ Scheduler (cheap Clone, Arc-backed)        │
//!   start/stop ─────►│  lifecycle: Mutex<bool>                    │
//!   restart ────────►│  clock: per-stage trigger loops            │
//!   reconfigure ────►│  stages: RwLock<StageMap>                  │
//!   trigger_now ────►│  active: overlap guard                     │
//!                    │  history: bounded run records              │
//!   status/stats/ ──►│  bus ──► listener ──► SubscriberSet        │
//!   health (reads)   └────────────────────────────────────────────┘
//! ```
//!
//! ## Lifecycle
//! `Stopped` (initial) ⇄ `Running`; `restart` is stop, a configurable
//! settle delay, then start. `start`/`stop` are **idempotent**: calling
//! either twice is the same as calling it once (a lifecycle mutex makes
//! concurrent calls serialize, the second becomes a no-op). `stop` never
//! cancels in-flight runs; they finish naturally and still record.
//!
//! The read path (`status`/`stats`/`health`) stays available no matter how
//! stages behave: runtime stage errors are recorded, never propagated.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use futures::future::join_all;
use tokio::time;

use crate::config::{ConfigPatch, SchedulerConfig};
use crate::control::{HealthReport, StageHealthEntry, StageStatus, StatsSnapshot, StatusReport};
use crate::error::SchedulerError;
use crate::events::{Event, EventKind};
use crate::history::{classify, RunRecord};
use crate::stages::StageName;

use super::{builder::SchedulerBuilder, clock::Clock, runner::run_stage, state::Shared};

/// Coordinates the pipeline stages: recurring fires, manual triggers,
/// reconfiguration, and the observability read path.
///
/// Cheap to clone; all clones share one underlying state. Owned by the
/// host's composition root and handed to whatever serves the control
/// surface (HTTP layer, CLI, test harness).
#[derive(Clone)]
pub struct Scheduler {
    pub(crate) shared: Arc<Shared>,
    pub(crate) clock: Arc<Clock>,
    /// True while the clock is armed. Mutex (not atomic): transitions must
    /// be serialized so concurrent `start`s cannot double-arm.
    pub(crate) lifecycle: Arc<Mutex<bool>>,
}

impl Scheduler {
    /// Starts building a scheduler (see [`SchedulerBuilder`]).
    pub fn builder(cfg: SchedulerConfig) -> SchedulerBuilder {
        SchedulerBuilder::new(cfg)
    }

    /// Arms the clock for all stages. Idempotent: a no-op when already
    /// running. Must be called within a tokio runtime (spawns the trigger
    /// loops).
    pub fn start(&self) {
        let mut running = self.lifecycle.lock().unwrap_or_else(|e| e.into_inner());
        if *running {
            return;
        }
        *running = true;
        self.clock.arm(&self.shared);
        self.shared
            .bus
            .publish(Event::now(EventKind::SchedulerStarted));
    }

    /// Disarms the clock. Idempotent: a no-op when already stopped.
    ///
    /// In-flight runs are not cancelled; they finish naturally and their
    /// records are still stored.
    pub fn stop(&self) {
        let mut running = self.lifecycle.lock().unwrap_or_else(|e| e.into_inner());
        if !*running {
            return;
        }
        *running = false;
        self.clock.disarm();
        self.shared
            .bus
            .publish(Event::now(EventKind::SchedulerStopped));
    }

    /// Stops, waits `restart_delay`, starts.
    ///
    /// The delay lets a run fired immediately before `stop` finish claiming
    /// or releasing the overlap guard before the clock re-arms.
    pub async fn restart(&self) {
        self.stop();
        time::sleep(self.shared.cfg.restart_delay).await;
        self.start();
    }

    /// Whether the clock is currently armed.
    pub fn is_running(&self) -> bool {
        *self.lifecycle.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Applies a partial configuration update, atomically.
    ///
    /// The patch is validated first (key set at parse time, cadences here);
    /// on any error nothing is applied. On success, stage definitions are
    /// mutated in place; cadence changes re-arm only the affected stages
    /// while running, and the global `enabled` flag maps to `stop`/`start`.
    ///
    /// # Errors
    /// - [`SchedulerError::InvalidCadence`] if a patched cadence does not
    ///   parse;
    /// - [`SchedulerError::UnknownConfigKeys`] when the patch came from
    ///   [`ConfigPatch::from_json`] with keys outside the fixed set (raised
    ///   there, before this method is reached).
    pub fn reconfigure(&self, patch: ConfigPatch) -> Result<(), SchedulerError> {
        patch.validate()?;

        let mut cadence_changed = Vec::new();
        {
            let mut stages = self
                .shared
                .stages
                .write()
                .unwrap_or_else(|e| e.into_inner());
            for (stage, stage_patch) in &patch.stages {
                let def = stages.get_mut(*stage);
                if let Some(expression) = &stage_patch.cadence {
                    if def.cadence() != expression {
                        def.set_cadence(expression)?;
                        cadence_changed.push(*stage);
                    }
                }
                if let Some(enabled) = stage_patch.enabled {
                    def.set_enabled(enabled);
                }
                if let Some(timeout_ms) = stage_patch.timeout_ms {
                    let timeout = (timeout_ms > 0)
                        .then(|| std::time::Duration::from_millis(timeout_ms));
                    def.set_timeout(timeout);
                }
            }
        }

        if self.is_running() {
            for stage in cadence_changed {
                self.clock.rearm(&self.shared, stage);
            }
        }

        match patch.enabled {
            Some(true) => self.start(),
            Some(false) => self.stop(),
            None => {}
        }
        Ok(())
    }

    /// Parses a JSON patch and applies it; the `POST reconfigure` path.
    ///
    /// # Errors
    /// [`SchedulerError::UnknownConfigKeys`] enumerating offending keys, or
    /// any error from [`Scheduler::reconfigure`]. In both cases the stage
    /// set is unchanged.
    pub fn reconfigure_json(&self, value: &serde_json::Value) -> Result<(), SchedulerError> {
        self.reconfigure(ConfigPatch::from_json(value)?)
    }

    /// Runs one stage (or all, in pipeline order) immediately, bypassing
    /// the cadence but honoring the overlap guard.
    ///
    /// Deliberately ignores the stage enable flag and the lifecycle state:
    /// a manual trigger is operator intent. If a run of the same stage is
    /// already in flight, the returned record is an immediate
    /// `skipped-overlap`.
    pub async fn trigger_now(&self, stage: Option<StageName>) -> Vec<RunRecord> {
        match stage {
            Some(stage) => vec![run_stage(&self.shared, stage).await],
            None => {
                let runs = StageName::ALL
                    .into_iter()
                    .map(|stage| run_stage(&self.shared, stage));
                join_all(runs).await
            }
        }
    }

    /// Snapshot for `GET status`.
    pub fn status(&self) -> StatusReport {
        let stages = {
            let map = self.shared.stages.read().unwrap_or_else(|e| e.into_inner());
            StageName::ALL
                .into_iter()
                .map(|name| {
                    let def = map.get(name);
                    StageStatus {
                        name,
                        cadence: def.cadence().to_string(),
                        enabled: def.enabled(),
                        timeout_ms: def.timeout().map(|d| d.as_millis() as u64),
                    }
                })
                .collect()
        };
        StatusReport {
            running: self.is_running(),
            stages,
            active_runs: self.shared.active.snapshot(),
            cadence_errors: self.clock.issues(),
        }
    }

    /// Snapshot for `GET stats`: the most recent `limit` records across
    /// all stages (newest-first) plus totals over everything retained.
    pub fn stats(&self, limit: usize) -> StatsSnapshot {
        StatsSnapshot {
            records: self.shared.history.recent(limit),
            summary: self.shared.history.summary(),
        }
    }

    /// Snapshot for `GET health`: a pure classification of history +
    /// definitions + clock state at this instant.
    pub fn health(&self) -> HealthReport {
        let now = Utc::now();
        let stages = StageName::ALL
            .into_iter()
            .map(|name| {
                let def = self.shared.stage(name);
                let records = self.shared.history.for_stage(name);
                let verdict = classify(
                    &def,
                    &records,
                    self.clock.armed_at(name),
                    self.clock.interval_hint(name),
                    now,
                    self.shared.cfg.health_window,
                );
                let last_executed = records.iter().rev().find(|r| r.executed());
                StageHealthEntry {
                    name,
                    health: verdict,
                    last_outcome: last_executed.map(|r| r.outcome),
                    last_run_at: last_executed.map(|r| r.started_at),
                }
            })
            .collect();
        HealthReport { stages }
    }
}
