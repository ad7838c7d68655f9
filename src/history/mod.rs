//! # Run history: bounded per-stage records, stats, health verdicts.
//!
//! - [`RunRecord`] / [`RunOutcome`] - immutable log entries, one per
//!   execution attempt
//! - [`RunHistory`] - bounded per-stage store with FIFO eviction
//! - [`HistorySummary`] - derived totals across retained records
//! - [`StageHealth`] / [`classify`] - point-in-time health verdict as a
//!   pure function of history + definition + clock state

mod health;
mod record;
mod store;

pub use health::{classify, StageHealth};
pub use record::{RunOutcome, RunRecord};
pub use store::{HistorySummary, RunHistory};
