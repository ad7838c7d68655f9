//! # Stage definition: schedule, flags, and work bundled per stage.
//!
//! [`StageDef`] is the unit the scheduler owns for each pipeline stage. The
//! cadence is kept as its expression string (what `status` reports) and is
//! re-validated whenever it changes; the clock parses it again at arm time
//! through the [`Cadence`](crate::Cadence) seam.

use std::time::Duration;

use crate::cadence::parse_cadence;
use crate::error::SchedulerError;

use super::{name::StageName, work::WorkRef};

/// One pipeline stage: identity, schedule, enable flag, timeout, work.
///
/// The stage set is closed; definitions are created once at scheduler
/// construction and only mutated in place by `reconfigure`.
#[derive(Clone)]
pub struct StageDef {
    name: StageName,
    cadence: String,
    enabled: bool,
    timeout: Option<Duration>,
    work: WorkRef,
}

impl StageDef {
    /// Creates a definition with the stage's default cadence, enabled, and
    /// no per-run timeout.
    pub fn new(name: StageName, work: WorkRef) -> Self {
        Self {
            name,
            cadence: name.default_cadence().to_string(),
            enabled: true,
            work,
            timeout: None,
        }
    }

    /// Returns the stage name.
    pub fn name(&self) -> StageName {
        self.name
    }

    /// Returns the cadence expression.
    pub fn cadence(&self) -> &str {
        &self.cadence
    }

    /// Whether clock fires for this stage are honored.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Optional per-run timeout (`None` = run until completion).
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns a handle to the stage's work.
    pub fn work(&self) -> WorkRef {
        self.work.clone()
    }

    /// Replaces the cadence expression, validating it first.
    ///
    /// # Errors
    /// [`SchedulerError::InvalidCadence`] if the expression does not parse;
    /// on error the previous cadence is kept.
    pub fn set_cadence(&mut self, expression: &str) -> Result<(), SchedulerError> {
        parse_cadence(expression)?;
        self.cadence = expression.to_string();
        Ok(())
    }

    /// Sets the enable flag.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Sets the per-run timeout (`None` or zero = none).
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout.filter(|d| *d > Duration::ZERO);
    }
}

impl std::fmt::Debug for StageDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageDef")
            .field("name", &self.name)
            .field("cadence", &self.cadence)
            .field("enabled", &self.enabled)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// The four injected work callables, one per pipeline stage.
///
/// Consumed by the scheduler builder; the scheduler core and its tests
/// never need the real collection/processing/recommendation/cleanup
/// implementations, only something satisfying [`StageWork`](crate::StageWork).
pub struct PipelineWorks {
    /// Work for the `videoCollection` stage.
    pub video_collection: WorkRef,
    /// Work for the `dataProcessing` stage.
    pub data_processing: WorkRef,
    /// Work for the `recommendation` stage.
    pub recommendation: WorkRef,
    /// Work for the `cleanup` stage.
    pub cleanup: WorkRef,
}

impl PipelineWorks {
    /// Pairs each stage name with its work, in pipeline order.
    pub(crate) fn into_defs(self) -> [StageDef; 4] {
        [
            StageDef::new(StageName::VideoCollection, self.video_collection),
            StageDef::new(StageName::DataProcessing, self.data_processing),
            StageDef::new(StageName::Recommendation, self.recommendation),
            StageDef::new(StageName::Cleanup, self.cleanup),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StageError;
    use crate::stages::WorkFn;
    use tokio_util::sync::CancellationToken;

    fn noop() -> WorkRef {
        WorkFn::arc("noop", |_ctx: CancellationToken| async move {
            Ok::<_, StageError>(Vec::new())
        })
    }

    #[test]
    fn test_invalid_cadence_keeps_previous() {
        let mut def = StageDef::new(StageName::Cleanup, noop());
        let before = def.cadence().to_string();
        assert!(def.set_cadence("bogus").is_err());
        assert_eq!(def.cadence(), before);
    }

    #[test]
    fn test_zero_timeout_means_none() {
        let mut def = StageDef::new(StageName::Cleanup, noop());
        def.set_timeout(Some(Duration::ZERO));
        assert_eq!(def.timeout(), None);
        def.set_timeout(Some(Duration::from_secs(5)));
        assert_eq!(def.timeout(), Some(Duration::from_secs(5)));
    }
}
