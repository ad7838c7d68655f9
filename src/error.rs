//! Error types used by the scheduler core and stage executions.
//!
//! This module defines two main error enums:
//!
//! - [`SchedulerError`] — configuration-time errors surfaced synchronously to
//!   the caller of the triggering control operation (bad cadence, bad keys).
//! - [`StageError`] — errors raised by individual stage work executions.
//!
//! Runtime stage errors never cross the runner boundary: they are recorded in
//! the run history and published on the event bus, but never crash the
//! scheduler. Both types provide `as_label` / `as_message` helpers for
//! logging and metrics.

use std::time::Duration;

use thiserror::Error;

/// # Configuration-time errors raised by scheduler control operations.
///
/// These are the only errors returned synchronously from the control surface
/// (`reconfigure`, builder construction, clock arming). Stage runtime
/// failures are represented by [`StageError`] and recorded, not returned.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// A cadence expression could not be parsed. The affected stage is left
    /// un-armed; other stages are unaffected.
    #[error("invalid cadence {expression:?}: {reason}")]
    InvalidCadence {
        /// The offending expression, verbatim.
        expression: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// A reconfigure patch contained keys outside the fixed key set.
    /// The whole patch is rejected (atomic policy); no partial apply.
    #[error("unknown config keys: {keys:?}")]
    UnknownConfigKeys {
        /// The offending key names, in encounter order.
        keys: Vec<String>,
    },

    /// A stage name does not belong to the fixed pipeline stage set.
    #[error("unknown stage {name:?}")]
    UnknownStage {
        /// The unrecognized name, verbatim.
        name: String,
    },
}

impl SchedulerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use stagehand::SchedulerError;
    ///
    /// let err = SchedulerError::UnknownConfigKeys { keys: vec!["foo".into()] };
    /// assert_eq!(err.as_label(), "invalid_config_key");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SchedulerError::InvalidCadence { .. } => "invalid_cadence",
            SchedulerError::UnknownConfigKeys { .. } => "invalid_config_key",
            SchedulerError::UnknownStage { .. } => "unknown_stage",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        self.to_string()
    }
}

/// # Errors produced by stage work execution.
///
/// These represent failures of the opaque per-stage work callables. They are
/// always caught at the runner boundary and turned into `failure` run
/// records; they must never take down the scheduler process.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    /// The work callable reported a failure.
    #[error("stage failed: {reason}")]
    Failed {
        /// Failure message from the work callable.
        reason: String,
    },

    /// The work callable exceeded its configured per-run timeout.
    #[error("stage timed out after {timeout:?}")]
    Timeout {
        /// The configured timeout.
        timeout: Duration,
    },

    /// The run was canceled cooperatively (scheduler shutdown).
    #[error("stage canceled")]
    Canceled,
}

impl StageError {
    /// Convenience constructor for a plain failure message.
    pub fn failed(reason: impl Into<String>) -> Self {
        StageError::Failed {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StageError::Failed { .. } => "stage_failed",
            StageError::Timeout { .. } => "stage_timeout",
            StageError::Canceled => "stage_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        self.to_string()
    }
}

impl From<String> for StageError {
    fn from(reason: String) -> Self {
        StageError::Failed { reason }
    }
}

impl From<&str> for StageError {
    fn from(reason: &str) -> Self {
        StageError::Failed {
            reason: reason.to_string(),
        }
    }
}
