//! # Event subscribers: the extension point for observability.
//!
//! - [`Subscribe`] - trait for plugging custom event handlers into the runtime
//! - [`SubscriberSet`] - non-blocking fan-out with per-subscriber queues
//! - [`LogWriter`] - built-in subscriber that prints events (demo/reference)

mod log;
mod set;
mod subscribe;

pub use self::log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
