//! # LogWriter — simple event printer.
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for tests or demos; real deployments plug their own subscriber.
//!
//! ## Example output
//! ```text
//! [started]
//! [armed] stage="videoCollection"
//! [fired] stage="videoCollection"
//! [starting] stage="videoCollection"
//! [succeeded] stage="videoCollection" duration_ms=412
//! [failed] stage="dataProcessing" err="nlp backend unreachable" duration_ms=90
//! [skipped] stage="dataProcessing"
//! [stopped]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let stage = e.stage.map(|s| s.as_str());
        match e.kind {
            EventKind::SchedulerStarted => {
                println!("[started]");
            }
            EventKind::SchedulerStopped => {
                println!("[stopped]");
            }
            EventKind::StageArmed => {
                println!("[armed] stage={stage:?}");
            }
            EventKind::CadenceRejected => {
                println!("[cadence-rejected] stage={stage:?} err={:?}", e.reason);
            }
            EventKind::StageFired => {
                println!("[fired] stage={stage:?}");
            }
            EventKind::StageStarting => {
                println!("[starting] stage={stage:?}");
            }
            EventKind::StageSucceeded => {
                println!("[succeeded] stage={stage:?} duration_ms={:?}", e.duration_ms);
            }
            EventKind::StageFailed => {
                println!(
                    "[failed] stage={stage:?} err={:?} duration_ms={:?}",
                    e.reason, e.duration_ms
                );
            }
            EventKind::StageTimedOut => {
                println!("[timeout] stage={stage:?} timeout_ms={:?}", e.timeout_ms);
            }
            EventKind::StageSkipped => {
                println!("[skipped] stage={stage:?}");
            }
            EventKind::SubscriberOverflow => {
                println!("[subscriber-overflow] reason={:?}", e.reason);
            }
            EventKind::SubscriberPanicked => {
                println!("[subscriber-panicked] reason={:?}", e.reason);
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
