//! # Cadence expressions and next-fire computation.
//!
//! The clock never parses schedules itself; it depends only on the
//! [`Cadence`] trait ("give me the next fire time after T"). Two dialects
//! ship with the crate:
//!
//! - [`CronCadence`] — 5-field cron expressions (`MIN HOUR DOM MON DOW`);
//! - [`EveryCadence`] — fixed intervals, written as `@every 30m`.
//!
//! [`parse_cadence`] picks the dialect from the expression prefix.

mod cadence;
mod cron;
mod every;

pub use cadence::{parse_cadence, Cadence, CadenceRef};
pub use cron::CronCadence;
pub use every::EveryCadence;
