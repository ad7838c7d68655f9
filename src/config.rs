//! # Scheduler configuration and reconfigure patches.
//!
//! [`SchedulerConfig`] centralizes runtime settings (history retention, bus
//! capacity, restart delay, health window, default timeout).
//!
//! [`ConfigPatch`] is the write half of the control surface: a partial
//! update over the fixed key set `{videoCollection, dataProcessing,
//! recommendation, cleanup, enabled}`. Patches are validated **atomically**:
//! any unknown key, malformed value, or unparsable cadence rejects the whole
//! patch and nothing is applied.
//!
//! ## Sentinel values
//! - `timeout = 0s` → no default per-run timeout

use std::time::Duration;

use serde_json::Value;

use crate::cadence::parse_cadence;
use crate::error::SchedulerError;
use crate::stages::StageName;

/// Global configuration for the scheduler runtime.
///
/// ## Field semantics
/// - `retention`: run records kept per stage (FIFO eviction; min 1)
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
/// - `restart_delay`: pause between `stop` and `start` inside `restart`,
///   letting in-flight overlap-guard state settle before re-arming
/// - `health_window`: how many recent executed runs the health verdict
///   looks at
/// - `timeout`: default per-run timeout for all stages (`0s` = none;
///   overridable per stage via reconfigure)
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Run records retained per stage.
    pub retention: usize,
    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,
    /// Delay between stop and start during `restart`.
    ///
    /// Race-avoidance, not cosmetics: a stage fired immediately before
    /// `stop` may still be draining when `start` re-arms.
    pub restart_delay: Duration,
    /// Recent-run window for health classification.
    pub health_window: usize,
    /// Default per-run timeout (`0s` = no timeout).
    pub timeout: Duration,
}

impl SchedulerConfig {
    /// Returns the default per-run timeout as an `Option`.
    ///
    /// - `None` → no timeout
    /// - `Some(d)` → timeout applied per run
    #[inline]
    pub fn default_timeout(&self) -> Option<Duration> {
        if self.timeout == Duration::ZERO {
            None
        } else {
            Some(self.timeout)
        }
    }
}

impl Default for SchedulerConfig {
    /// Default configuration:
    ///
    /// - `retention = 50`
    /// - `bus_capacity = 1024`
    /// - `restart_delay = 1s`
    /// - `health_window = 5`
    /// - `timeout = 0s` (no timeout)
    fn default() -> Self {
        Self {
            retention: 50,
            bus_capacity: 1024,
            restart_delay: Duration::from_secs(1),
            health_window: 5,
            timeout: Duration::from_secs(0),
        }
    }
}

/// Partial update for one stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagePatch {
    /// New cadence expression, if changing.
    pub cadence: Option<String>,
    /// New enable flag, if changing.
    pub enabled: Option<bool>,
    /// New per-run timeout in milliseconds (`0` clears it), if changing.
    pub timeout_ms: Option<u64>,
}

impl StagePatch {
    /// True if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cadence.is_none() && self.enabled.is_none() && self.timeout_ms.is_none()
    }
}

/// Partial configuration update over the fixed key set.
///
/// Built either programmatically (builder methods) or from untyped JSON via
/// [`ConfigPatch::from_json`]. Either way, [`validate`](ConfigPatch::validate)
/// runs before anything is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigPatch {
    /// Global scheduler enable flag: `false` stops the clock, `true` starts
    /// it. Stage flags are untouched.
    pub enabled: Option<bool>,
    /// Per-stage updates, in encounter order.
    pub stages: Vec<(StageName, StagePatch)>,
}

impl ConfigPatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the global enable flag.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Adds a per-stage update.
    #[must_use]
    pub fn with_stage(mut self, stage: StageName, patch: StagePatch) -> Self {
        self.stages.push((stage, patch));
        self
    }

    /// Shorthand: change one stage's cadence.
    #[must_use]
    pub fn with_cadence(self, stage: StageName, expression: impl Into<String>) -> Self {
        self.with_stage(
            stage,
            StagePatch {
                cadence: Some(expression.into()),
                ..StagePatch::default()
            },
        )
    }

    /// True if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.enabled.is_none() && self.stages.iter().all(|(_, p)| p.is_empty())
    }

    /// Parses a patch from an untyped JSON object, validating the key set.
    ///
    /// Accepted top-level keys: the four stage names and `enabled`. Each
    /// stage value is an object with keys `cadence` (string), `enabled`
    /// (bool), `timeoutMs` (non-negative integer).
    ///
    /// # Errors
    /// [`SchedulerError::UnknownConfigKeys`] enumerating every offending
    /// key. Malformed values are reported under their key path (e.g.
    /// `videoCollection.timeoutMs`). The whole patch is rejected; nothing
    /// is applied.
    pub fn from_json(value: &Value) -> Result<Self, SchedulerError> {
        let Some(object) = value.as_object() else {
            return Err(SchedulerError::UnknownConfigKeys {
                keys: vec!["(expected object)".to_string()],
            });
        };

        let mut patch = ConfigPatch::new();
        let mut bad_keys = Vec::new();

        for (key, entry) in object {
            if key == "enabled" {
                match entry.as_bool() {
                    Some(flag) => patch.enabled = Some(flag),
                    None => bad_keys.push("enabled".to_string()),
                }
                continue;
            }
            let Ok(stage) = key.parse::<StageName>() else {
                bad_keys.push(key.clone());
                continue;
            };
            match parse_stage_entry(key, entry, &mut bad_keys) {
                Some(stage_patch) => patch.stages.push((stage, stage_patch)),
                None => {}
            }
        }

        if !bad_keys.is_empty() {
            return Err(SchedulerError::UnknownConfigKeys { keys: bad_keys });
        }
        Ok(patch)
    }

    /// Validates the patch without applying it: every cadence must parse.
    ///
    /// # Errors
    /// [`SchedulerError::InvalidCadence`] for the first unparsable cadence.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        for (_, stage_patch) in &self.stages {
            if let Some(expression) = &stage_patch.cadence {
                parse_cadence(expression)?;
            }
        }
        Ok(())
    }
}

/// Parses one stage's JSON entry, pushing offending key paths into
/// `bad_keys`.
fn parse_stage_entry(stage_key: &str, entry: &Value, bad_keys: &mut Vec<String>) -> Option<StagePatch> {
    let Some(fields) = entry.as_object() else {
        bad_keys.push(stage_key.to_string());
        return None;
    };

    let mut patch = StagePatch::default();
    for (field, value) in fields {
        match field.as_str() {
            "cadence" => match value.as_str() {
                Some(expr) => patch.cadence = Some(expr.to_string()),
                None => bad_keys.push(format!("{stage_key}.cadence")),
            },
            "enabled" => match value.as_bool() {
                Some(flag) => patch.enabled = Some(flag),
                None => bad_keys.push(format!("{stage_key}.enabled")),
            },
            "timeoutMs" => match value.as_u64() {
                Some(ms) => patch.timeout_ms = Some(ms),
                None => bad_keys.push(format!("{stage_key}.timeoutMs")),
            },
            other => bad_keys.push(format!("{stage_key}.{other}")),
        }
    }
    Some(patch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_top_level_key_is_enumerated() {
        let err = ConfigPatch::from_json(&json!({ "foo": 1 })).unwrap_err();
        assert_eq!(
            err,
            SchedulerError::UnknownConfigKeys {
                keys: vec!["foo".to_string()]
            }
        );
    }

    #[test]
    fn test_one_bad_key_rejects_the_valid_rest() {
        // Atomic policy: the valid cleanup entry must not survive the bad key.
        let err = ConfigPatch::from_json(&json!({
            "cleanup": { "enabled": false },
            "bogus": { "enabled": true },
        }))
        .unwrap_err();
        assert_eq!(
            err,
            SchedulerError::UnknownConfigKeys {
                keys: vec!["bogus".to_string()]
            }
        );
    }

    #[test]
    fn test_nested_key_paths_are_reported() {
        let err = ConfigPatch::from_json(&json!({
            "videoCollection": { "cadence": 5, "interval": "10m" },
        }))
        .unwrap_err();
        match err {
            SchedulerError::UnknownConfigKeys { keys } => {
                assert!(keys.contains(&"videoCollection.cadence".to_string()));
                assert!(keys.contains(&"videoCollection.interval".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_valid_patch_parses() {
        let patch = ConfigPatch::from_json(&json!({
            "enabled": true,
            "videoCollection": { "cadence": "*/15 * * * *", "timeoutMs": 30000 },
            "cleanup": { "enabled": false },
        }))
        .unwrap();
        assert_eq!(patch.enabled, Some(true));
        assert_eq!(patch.stages.len(), 2);
        assert!(patch.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_cadence() {
        let patch = ConfigPatch::new().with_cadence(StageName::Cleanup, "62 * * * *");
        let err = patch.validate().unwrap_err();
        assert_eq!(err.as_label(), "invalid_cadence");
    }

    #[test]
    fn test_empty_patch() {
        assert!(ConfigPatch::new().is_empty());
        assert!(ConfigPatch::from_json(&json!({})).unwrap().is_empty());
    }
}
