//! # The fixed pipeline stage set.
//!
//! Stage names are known at construction time and never change at runtime:
//! stages can be reconfigured (cadence, enabled, timeout) but not added or
//! removed. Wire names use the camelCase spellings the control surface
//! exposes (`videoCollection`, `dataProcessing`, `recommendation`,
//! `cleanup`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;

/// Identifier of one pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StageName {
    /// Collects new video/content items from upstream sources.
    #[serde(rename = "videoCollection")]
    VideoCollection,
    /// Processes collected content (NLP, sentiment, enrichment).
    #[serde(rename = "dataProcessing")]
    DataProcessing,
    /// Generates recommendations from processed content.
    #[serde(rename = "recommendation")]
    Recommendation,
    /// Evicts data past its retention window.
    #[serde(rename = "cleanup")]
    Cleanup,
}

impl StageName {
    /// All stages, in pipeline order.
    pub const ALL: [StageName; 4] = [
        StageName::VideoCollection,
        StageName::DataProcessing,
        StageName::Recommendation,
        StageName::Cleanup,
    ];

    /// Returns the wire name (camelCase, as the control surface spells it).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::VideoCollection => "videoCollection",
            StageName::DataProcessing => "dataProcessing",
            StageName::Recommendation => "recommendation",
            StageName::Cleanup => "cleanup",
        }
    }

    /// Returns the default cadence expression for this stage.
    ///
    /// These are the out-of-the-box schedules; operators override them via
    /// the builder or `reconfigure`.
    #[must_use]
    pub fn default_cadence(&self) -> &'static str {
        match self {
            StageName::VideoCollection => "*/30 * * * *",
            StageName::DataProcessing => "0 * * * *",
            StageName::Recommendation => "15 */2 * * *",
            StageName::Cleanup => "0 2 * * *",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageName {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StageName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| SchedulerError::UnknownStage {
                name: s.to_string(),
            })
    }
}
