//! # Builder for constructing a scheduler.
//!
//! Wires the bus, subscriber fan-out, shared state, and clock together.
//! Stage works are injected at [`build`](SchedulerBuilder::build);
//! schedule overrides set here are validated before anything spawns.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::events::{Bus, Event, EventKind};
use crate::stages::{PipelineWorks, StageName};
use crate::subscribers::{Subscribe, SubscriberSet};

use super::{clock::Clock, scheduler::Scheduler, state::Shared};

/// Builder returned by [`Scheduler::builder`].
pub struct SchedulerBuilder {
    cfg: SchedulerConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    cadences: Vec<(StageName, String)>,
    disabled: Vec<StageName>,
    timeouts: Vec<(StageName, Duration)>,
}

impl SchedulerBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SchedulerConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            cadences: Vec::new(),
            disabled: Vec::new(),
            timeouts: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (lifecycle, runs, failures)
    /// through dedicated workers with bounded queues.
    #[must_use]
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Overrides one stage's cadence (validated at build).
    #[must_use]
    pub fn with_cadence(mut self, stage: StageName, expression: impl Into<String>) -> Self {
        self.cadences.push((stage, expression.into()));
        self
    }

    /// Starts one stage disabled (its clock fires are ignored until a
    /// reconfigure enables it).
    #[must_use]
    pub fn with_disabled(mut self, stage: StageName) -> Self {
        self.disabled.push(stage);
        self
    }

    /// Sets one stage's per-run timeout.
    #[must_use]
    pub fn with_timeout(mut self, stage: StageName, timeout: Duration) -> Self {
        self.timeouts.push((stage, timeout));
        self
    }

    /// Builds the scheduler around the injected stage works.
    ///
    /// The scheduler comes up `Stopped`; call
    /// [`start`](Scheduler::start) to arm the clock. Must be called within
    /// a tokio runtime (spawns the subscriber listener).
    ///
    /// # Errors
    /// [`SchedulerError::InvalidCadence`] if a cadence override does not
    /// parse.
    pub fn build(self, works: PipelineWorks) -> Result<Scheduler, SchedulerError> {
        let mut defs = works.into_defs();
        for def in &mut defs {
            let name = def.name();
            if let Some((_, expression)) = self.cadences.iter().rev().find(|(s, _)| *s == name) {
                def.set_cadence(expression)?;
            }
            if self.disabled.contains(&name) {
                def.set_enabled(false);
            }
            if let Some((_, timeout)) = self.timeouts.iter().rev().find(|(s, _)| *s == name) {
                def.set_timeout(Some(*timeout));
            }
        }

        let bus = Bus::new(self.cfg.bus_capacity);
        spawn_subscriber_listener(&bus, self.subscribers);

        let shared = Arc::new(Shared::new(self.cfg, defs, bus));
        Ok(Scheduler {
            shared,
            clock: Arc::new(Clock::new()),
            lifecycle: Arc::new(Mutex::new(false)),
        })
    }
}

/// Subscribes to the bus and forwards events to the subscriber set.
///
/// The listener task owns the set; it ends (and the workers drain) once
/// every bus sender is gone.
fn spawn_subscriber_listener(bus: &Bus, subscribers: Vec<Arc<dyn Subscribe>>) {
    if subscribers.is_empty() {
        return;
    }
    let set = SubscriberSet::new(subscribers, bus.clone());
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => set.emit(&ev),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    set.emit(
                        &Event::now(EventKind::SubscriberOverflow)
                            .with_reason(format!("listener lagged, skipped {missed} events")),
                    );
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
        set.shutdown().await;
    });
}
