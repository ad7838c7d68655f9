//! # Fixed-interval cadence (`@every`).
//!
//! Fires at a constant period from whatever instant the clock anchors it to.
//! Unlike cron, fires are not aligned to the calendar, which makes this the
//! cadence of choice for deterministic tests on a paused clock.

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::cadence::Cadence;

/// Cadence that fires every fixed period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EveryCadence {
    period: Duration,
}

impl EveryCadence {
    /// Creates a fixed-interval cadence.
    ///
    /// A zero period is clamped to one second; the clock must never spin.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_secs(1)),
        }
    }

    /// Returns the configured period.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Cadence for EveryCadence {
    fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let step = chrono::Duration::from_std(self.period).ok()?;
        after.checked_add_signed(step)
    }

    fn interval_hint(&self, _from: DateTime<Utc>) -> Option<Duration> {
        Some(self.period)
    }
}
