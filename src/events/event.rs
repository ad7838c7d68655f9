//! # Runtime events emitted by the scheduler, clock, and runner.
//!
//! [`EventKind`] classifies events across three categories:
//! - **Lifecycle events**: scheduler start/stop and clock arm state
//! - **Run events**: stage execution flow (fired, starting, succeeded,
//!   failed, timed out, skipped)
//! - **Subscriber events**: fan-out diagnostics (overflow, panic)
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::stages::StageName;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Scheduler lifecycle ===
    /// The clock was armed; recurring fires begin.
    ///
    /// Sets: `at`, `seq`.
    SchedulerStarted,

    /// The clock was disarmed; in-flight runs drain naturally.
    ///
    /// Sets: `at`, `seq`.
    SchedulerStopped,

    /// One stage's trigger loop was installed.
    ///
    /// Sets: `stage`, `at`, `seq`.
    StageArmed,

    /// A stage's cadence expression failed to parse at arm time; that stage
    /// is left un-armed, others continue.
    ///
    /// Sets: `stage`, `reason`, `at`, `seq`.
    CadenceRejected,

    // === Run events ===
    /// The cadence came due for an enabled stage; a run is being dispatched.
    ///
    /// Sets: `stage`, `at`, `seq`.
    StageFired,

    /// The overlap guard was acquired and the stage's work is starting.
    ///
    /// Sets: `stage`, `at`, `seq`.
    StageStarting,

    /// The stage's work returned successfully.
    ///
    /// Sets: `stage`, `duration_ms`, `at`, `seq`.
    StageSucceeded,

    /// The stage's work failed; the error was recorded, not propagated.
    ///
    /// Sets: `stage`, `reason`, `duration_ms`, `at`, `seq`.
    StageFailed,

    /// The stage's work exceeded its per-run timeout and was cancelled.
    ///
    /// Sets: `stage`, `timeout_ms`, `at`, `seq`.
    StageTimedOut,

    /// A fire or manual trigger arrived while the same stage was still
    /// running; no work was invoked (benign, recorded as skipped-overlap).
    ///
    /// Sets: `stage`, `at`, `seq`.
    StageSkipped,

    // === Subscriber diagnostics ===
    /// A subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `reason`, `at`, `seq`.
    SubscriberOverflow,

    /// A subscriber panicked while handling an event.
    ///
    /// Sets: `reason`, `at`, `seq`.
    SubscriberPanicked,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Stage the event concerns, if applicable.
    pub stage: Option<StageName>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Run duration in milliseconds (compact), for terminal run events.
    pub duration_ms: Option<u64>,
    /// Configured timeout in milliseconds (compact).
    pub timeout_ms: Option<u64>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            stage: None,
            reason: None,
            duration_ms: None,
            timeout_ms: None,
        }
    }

    /// Attaches the stage name.
    #[inline]
    pub fn with_stage(mut self, stage: StageName) -> Self {
        self.stage = Some(stage);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a run duration (stored as milliseconds).
    #[inline]
    pub fn with_duration(mut self, d: Duration) -> Self {
        self.duration_ms = Some(d.as_millis().min(u128::from(u64::MAX)) as u64);
        self
    }

    /// Attaches a timeout (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(d.as_millis().min(u128::from(u64::MAX)) as u64);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::now(EventKind::StageFired);
        let b = Event::now(EventKind::StageFired);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_builder_metadata() {
        let ev = Event::now(EventKind::StageFailed)
            .with_stage(StageName::Cleanup)
            .with_reason("boom")
            .with_duration(Duration::from_millis(42));
        assert_eq!(ev.stage, Some(StageName::Cleanup));
        assert_eq!(ev.reason.as_deref(), Some("boom"));
        assert_eq!(ev.duration_ms, Some(42));
    }
}
