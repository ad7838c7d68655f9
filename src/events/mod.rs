//! # Scheduler events and the broadcast bus.
//!
//! The clock, runner, and scheduler publish [`Event`]s on a [`Bus`]
//! (a thin `tokio::sync::broadcast` wrapper); one listener per scheduler
//! fans them out to user subscribers. Events are the crate's observability
//! surface: logging, metrics, and alerting hang off them instead of a
//! built-in logger.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
