//! Runtime core: clock, overlap guard, runner, and the scheduler itself.
//!
//! The only public API from this module is [`Scheduler`] (plus its
//! builder), which owns the stage set, reacts to clock fires, and exposes
//! the lifecycle and read-path operations.
//!
//! Internal modules:
//! - [`guard`]: atomic per-stage overlap guard with RAII release;
//! - [`state`]: the shared runtime state handed to spawned tasks;
//! - [`runner`]: executes one run under the guard, records the outcome;
//! - [`clock`]: per-stage trigger loops derived from cadences;
//! - [`scheduler`]: lifecycle state machine and control operations.

mod builder;
mod clock;
mod guard;
mod runner;
mod scheduler;
mod state;

pub use builder::SchedulerBuilder;
pub use scheduler::Scheduler;
