//! # Overlap guard: at most one run of a stage in flight.
//!
//! Membership test-and-insert is atomic (one mutex over the whole set), so
//! two fires of the same stage can never both pass the guard. Release is
//! RAII: the permit removes its stage on drop, on every exit path of the
//! run, including unwinding.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::stages::StageName;

/// Set of stages currently executing work.
#[derive(Debug, Default)]
pub(crate) struct ActiveRuns {
    inner: Arc<Mutex<HashSet<StageName>>>,
}

impl ActiveRuns {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Atomically claims the stage. `None` means a run is already in
    /// flight and the caller must skip.
    pub(crate) fn try_acquire(&self, stage: StageName) -> Option<RunPermit> {
        let mut set = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(stage) {
            return None;
        }
        Some(RunPermit {
            set: Arc::clone(&self.inner),
            stage,
        })
    }

    /// Current members, in pipeline order.
    pub(crate) fn snapshot(&self) -> Vec<StageName> {
        let set = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let mut members: Vec<StageName> = set.iter().copied().collect();
        members.sort();
        members
    }
}

/// RAII claim on one stage's single-flight slot.
#[derive(Debug)]
pub(crate) struct RunPermit {
    set: Arc<Mutex<HashSet<StageName>>>,
    stage: StageName,
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        let mut set = self.set.lock().unwrap_or_else(|e| e.into_inner());
        set.remove(&self.stage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_refused() {
        let active = ActiveRuns::new();
        let permit = active.try_acquire(StageName::DataProcessing);
        assert!(permit.is_some());
        assert!(active.try_acquire(StageName::DataProcessing).is_none());
        // Другие stages не задеты.
        assert!(active.try_acquire(StageName::Cleanup).is_some());
    }

    #[test]
    fn test_drop_releases_the_slot() {
        let active = ActiveRuns::new();
        {
            let _permit = active.try_acquire(StageName::Cleanup).unwrap();
            assert_eq!(active.snapshot(), vec![StageName::Cleanup]);
        }
        assert!(active.snapshot().is_empty());
        assert!(active.try_acquire(StageName::Cleanup).is_some());
    }
}
