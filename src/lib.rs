//! # stagehand
//!
//! **Stagehand** is a recurring multi-stage task scheduler for data
//! pipelines, built as a single-process, in-memory coordinator.
//!
//! It drives a fixed set of pipeline stages (content collection →
//! processing → recommendation → cleanup) on independent cron-like
//! cadences, guarantees that no two runs of the same stage ever overlap,
//! records every attempt in a bounded history, and derives per-stage
//! health verdicts — all while staying reconfigurable and unkillable by a
//! misbehaving stage.
//!
//! ## Architecture
//! ```text
//!  ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐
//!  │ StageWork │  │ StageWork │  │ StageWork │  │ StageWork │   (injected,
//!  │(collection)│ │(processing)│ │ (recomm.) │  │ (cleanup) │    opaque)
//!  └─────┬─────┘  └─────┬─────┘  └─────┬─────┘  └─────┬─────┘
//!        ▼              ▼              ▼              ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │  Scheduler (lifecycle state machine, control surface)         │
//! │  - Clock (per-stage trigger loops from Cadence expressions)   │
//! │  - ActiveRuns (atomic overlap guard, RAII release)            │
//! │  - RunHistory (bounded per-stage records, FIFO eviction)      │
//! │  - Bus (broadcast events) ──► SubscriberSet ──► Subscribe     │
//! └───────────────────────────────────────────────────────────────┘
//!        │ fire(stage)
//!        ▼
//!   run_stage(): guard ─► work ─► RunRecord ─► history + events
//! ```
//!
//! ## Lifecycle
//! ```text
//! builder(cfg).build(works) ──► Stopped
//!
//! start()      Stopped ─► Running      (arms the clock; idempotent)
//! stop()       Running ─► Stopped      (disarms; in-flight runs drain)
//! restart()    stop ─► settle delay ─► start
//! reconfigure  mutates cadences/flags in place, re-arms what changed
//! trigger_now  runs immediately, bypassing the cadence, guard honored
//! ```
//!
//! ## Guarantees
//! | Area                | Description                                                   | Key types / traits                    |
//! |---------------------|---------------------------------------------------------------|---------------------------------------|
//! | **Overlap guard**   | At most one run of a stage in flight; excess fires skip.      | [`RunOutcome::SkippedOverlap`]        |
//! | **Failure isolation**| Stage errors are recorded, never propagated or fatal.        | [`StageError`], [`RunRecord`]         |
//! | **Bounded history** | Last N records per stage, FIFO eviction.                      | [`StatsSnapshot`]                     |
//! | **Health verdicts** | Pure classification from recent runs + staleness.             | [`StageHealth`], [`HealthReport`]     |
//! | **Live reconfig**   | Atomic patches over a fixed key set; re-arm without restart.  | [`ConfigPatch`], [`SchedulerError`]   |
//! | **Observability**   | Broadcast events with subscriber fan-out.                     | [`Subscribe`], [`Event`]              |
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use stagehand::{
//!     PipelineWorks, Scheduler, SchedulerConfig, StageError, StageName, WorkFn, WorkRef,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let collect: WorkRef = WorkFn::arc("collect", |_ctx: CancellationToken| async move {
//!         // fetch new content...
//!         Ok::<_, StageError>(vec!["collected 3 items".to_string()])
//!     });
//!     let noop = |_ctx: CancellationToken| async move { Ok::<_, StageError>(Vec::new()) };
//!
//!     let scheduler = Scheduler::builder(SchedulerConfig::default())
//!         .with_cadence(StageName::VideoCollection, "@every 15m")
//!         .with_timeout(StageName::VideoCollection, Duration::from_secs(60))
//!         .build(PipelineWorks {
//!             video_collection: collect,
//!             data_processing: WorkFn::arc("process", noop),
//!             recommendation: WorkFn::arc("recommend", noop),
//!             cleanup: WorkFn::arc("cleanup", noop),
//!         })?;
//!
//!     scheduler.start();
//!     let records = scheduler.trigger_now(Some(StageName::VideoCollection)).await;
//!     assert_eq!(records.len(), 1);
//!     scheduler.stop();
//!     Ok(())
//! }
//! ```

mod cadence;
mod config;
mod control;
mod core;
mod error;
mod events;
mod history;
mod stages;
mod subscribers;

// ---- Public re-exports ----

pub use cadence::{parse_cadence, Cadence, CadenceRef, CronCadence, EveryCadence};
pub use config::{ConfigPatch, SchedulerConfig, StagePatch};
pub use control::{
    CadenceIssue, HealthReport, StageHealthEntry, StageStatus, StatsSnapshot, StatusReport,
};
pub use crate::core::{Scheduler, SchedulerBuilder};
pub use error::{SchedulerError, StageError};
pub use events::{Bus, Event, EventKind};
pub use history::{HistorySummary, RunOutcome, RunRecord, StageHealth};
pub use stages::{PipelineWorks, StageDef, StageName, StageWork, WorkFn, WorkRef};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
