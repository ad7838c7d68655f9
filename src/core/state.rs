//! # Shared runtime state.
//!
//! One [`Shared`] instance per scheduler, handed out as `Arc` to clock
//! loops and spawned runs. The stage map is a fixed array indexed by the
//! closed [`StageName`] set, so lookups never fail and no map entry can be
//! added or removed at runtime.

use std::sync::RwLock;

use crate::config::SchedulerConfig;
use crate::events::Bus;
use crate::history::RunHistory;
use crate::stages::{StageDef, StageName};

use super::guard::ActiveRuns;

/// All four stage definitions, indexed by [`StageName`].
#[derive(Debug)]
pub(crate) struct StageMap([StageDef; 4]);

impl StageMap {
    pub(crate) fn new(defs: [StageDef; 4]) -> Self {
        Self(defs)
    }

    pub(crate) fn get(&self, name: StageName) -> &StageDef {
        &self.0[Self::index(name)]
    }

    pub(crate) fn get_mut(&mut self, name: StageName) -> &mut StageDef {
        &mut self.0[Self::index(name)]
    }

    fn index(name: StageName) -> usize {
        StageName::ALL
            .iter()
            .position(|candidate| *candidate == name)
            .unwrap_or(0)
    }
}

/// State shared between the scheduler handle, clock loops, and runs.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) cfg: SchedulerConfig,
    pub(crate) stages: RwLock<StageMap>,
    pub(crate) active: ActiveRuns,
    pub(crate) history: RunHistory,
    pub(crate) bus: Bus,
}

impl Shared {
    pub(crate) fn new(cfg: SchedulerConfig, defs: [StageDef; 4], bus: Bus) -> Self {
        let history = RunHistory::new(cfg.retention);
        Self {
            cfg,
            stages: RwLock::new(StageMap::new(defs)),
            active: ActiveRuns::new(),
            history,
            bus,
        }
    }

    /// Snapshot of one stage's definition (cheap: `Arc`s inside).
    pub(crate) fn stage(&self, name: StageName) -> StageDef {
        let stages = self.stages.read().unwrap_or_else(|e| e.into_inner());
        stages.get(name).clone()
    }
}
