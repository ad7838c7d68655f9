//! # Pipeline stages: fixed name set, opaque work, per-stage definitions.
//!
//! This module provides the stage-related types:
//! - [`StageName`] - the closed set of pipeline stage identifiers
//! - [`StageWork`] - trait for implementing async cancelable stage work
//! - [`WorkFn`] - function-based work implementation
//! - [`WorkRef`] - shared reference to stage work (`Arc<dyn StageWork>`)
//! - [`StageDef`] - one stage's schedule, flags, and work bundle
//! - [`PipelineWorks`] - the four injected work callables

mod def;
mod name;
mod work;

pub use def::{PipelineWorks, StageDef};
pub use name::StageName;
pub use work::{StageWork, WorkFn, WorkRef};
