//! # SubscriberSet: non-blocking fan-out over multiple subscribers.
//!
//! Distributes each [`Event`] to multiple subscribers **without awaiting**
//! their processing.
//!
//! ## What it guarantees
//! - `emit(&Event)` returns immediately.
//! - Per-subscriber FIFO (queue order).
//! - Panics inside subscribers are caught and published as
//!   [`EventKind::SubscriberPanicked`] (isolation; the worker keeps going).
//! - Queue overflow drops the event for that subscriber only and publishes
//!   [`EventKind::SubscriberOverflow`].
//!
//! ## What it does **not** guarantee
//! - No global ordering across different subscribers.
//! - No retries on per-subscriber queue overflow.
//!
//! Overflow events are not re-published when they themselves overflow, so
//! a permanently full queue cannot feed back into the bus.

use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::{Bus, Event, EventKind};

use super::Subscribe;

/// Per-subscriber channel with metadata.
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Composite fan-out with per-subscriber bounded queues and worker tasks.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker per subscriber.
    ///
    /// The bus handle is used for the set's own diagnostics (overflow and
    /// panic events); it is the same bus the runtime publishes on, so the
    /// diagnostics reach every subscriber that is still keeping up.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);
            let s = Arc::clone(&sub);
            let bus_for_worker = bus.clone();

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = s.on_event(ev.as_ref());
                    if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        let info = panic_message(&*panic_err);
                        bus_for_worker.publish(
                            Event::now(EventKind::SubscriberPanicked)
                                .with_reason(format!("subscriber '{}' panicked: {info}", s.name())),
                        );
                    }
                }
            });

            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }

        Self {
            channels,
            workers,
            bus,
        }
    }

    /// Fan-out one event to all subscribers (non-blocking).
    ///
    /// If a subscriber's queue is **full** or **closed**, the event is
    /// dropped for it and an [`EventKind::SubscriberOverflow`] is published
    /// naming the subscriber — unless the event being dropped is itself an
    /// overflow event.
    pub fn emit(&self, event: &Event) {
        let ev = Arc::new(event.clone());
        let is_overflow_evt = matches!(ev.kind, EventKind::SubscriberOverflow);

        for channel in &self.channels {
            match channel.sender.try_send(Arc::clone(&ev)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    if !is_overflow_evt {
                        self.bus.publish(
                            Event::now(EventKind::SubscriberOverflow).with_reason(format!(
                                "subscriber '{}' dropped event: queue full",
                                channel.name
                            )),
                        );
                    }
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    if !is_overflow_evt {
                        self.bus.publish(
                            Event::now(EventKind::SubscriberOverflow).with_reason(format!(
                                "subscriber '{}' dropped event: worker closed",
                                channel.name
                            )),
                        );
                    }
                }
            }
        }
    }

    /// Graceful shutdown: close all queues and await worker completion.
    pub async fn shutdown(self) {
        drop(self.channels);
        for h in self.workers {
            let _ = h.await;
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }
}

/// Extracts a human-readable message from a caught panic payload.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;

    struct Panicking;

    #[async_trait]
    impl Subscribe for Panicking {
        async fn on_event(&self, _event: &Event) {
            panic!("boom");
        }

        fn name(&self) -> &'static str {
            "panicking"
        }
    }

    struct Counting(Arc<AtomicU32>);

    #[async_trait]
    impl Subscribe for Counting {
        async fn on_event(&self, _event: &Event) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    struct Stuck(Arc<Notify>);

    #[async_trait]
    impl Subscribe for Stuck {
        async fn on_event(&self, _event: &Event) {
            self.0.notified().await;
        }

        fn name(&self) -> &'static str {
            "stuck"
        }

        fn queue_capacity(&self) -> usize {
            1
        }
    }

    async fn settle() {
        for _ in 0..32 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_panic_is_published_and_worker_survives() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let count = Arc::new(AtomicU32::new(0));
        let subs: Vec<Arc<dyn Subscribe>> =
            vec![Arc::new(Panicking), Arc::new(Counting(Arc::clone(&count)))];
        let set = SubscriberSet::new(subs, bus.clone());

        set.emit(&Event::now(EventKind::StageFired));
        set.emit(&Event::now(EventKind::StageFired));
        settle().await;

        // Both panics got published; the worker kept processing.
        let mut panics = 0;
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::SubscriberPanicked {
                assert!(ev.reason.as_deref().unwrap_or("").contains("boom"));
                panics += 1;
            }
        }
        assert_eq!(panics, 2);
        assert_eq!(count.load(Ordering::SeqCst), 2);
        set.shutdown().await;
    }

    #[tokio::test]
    async fn test_queue_overflow_is_published() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let gate = Arc::new(Notify::new());
        let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Stuck(Arc::clone(&gate)))];
        let set = SubscriberSet::new(subs, bus.clone());

        // First event occupies the worker, second fills the queue of one,
        // third has nowhere to go.
        set.emit(&Event::now(EventKind::StageFired));
        settle().await;
        set.emit(&Event::now(EventKind::StageFired));
        set.emit(&Event::now(EventKind::StageFired));

        let overflow = loop {
            match rx.try_recv() {
                Ok(ev) if ev.kind == EventKind::SubscriberOverflow => break ev,
                Ok(_) => continue,
                Err(_) => panic!("no overflow event published"),
            }
        };
        assert!(overflow.reason.as_deref().unwrap_or("").contains("stuck"));
        // The worker is still parked on the gate; dropping the set tears it
        // down with the test runtime.
        drop(set);
    }
}
