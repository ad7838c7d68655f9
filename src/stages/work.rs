//! # Stage work abstraction and function-backed implementation.
//!
//! This module defines the [`StageWork`] trait (async, cancelable) and a
//! convenient function-backed implementation [`WorkFn`]. The common handle
//! type is [`WorkRef`], an `Arc<dyn StageWork>` suitable for sharing across
//! the runtime.
//!
//! Work is opaque to the scheduler: it takes no arguments beyond a
//! [`CancellationToken`] and either completes (optionally yielding a small
//! list of informational messages, recorded alongside a successful run) or
//! fails with a [`StageError`]. The scheduler never inspects what the work
//! does; tests substitute deterministic fakes.

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::StageError;

/// Shared handle to stage work (`Arc<dyn StageWork>`).
pub type WorkRef = Arc<dyn StageWork>;

/// # Asynchronous, cancelable unit of stage work.
///
/// Implementors should periodically check the token and exit promptly when
/// the scheduler shuts down or a per-run timeout fires.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use async_trait::async_trait;
/// use stagehand::{StageWork, StageError};
///
/// struct Collect;
///
/// #[async_trait]
/// impl StageWork for Collect {
///     async fn run(&self, ctx: CancellationToken) -> Result<Vec<String>, StageError> {
///         if ctx.is_cancelled() {
///             return Err(StageError::Canceled);
///         }
///         // fetch, store...
///         Ok(vec!["collected 12 items".to_string()])
///     }
/// }
/// ```
#[async_trait]
pub trait StageWork: Send + Sync + 'static {
    /// Executes one run of the stage until completion or cancellation.
    ///
    /// `Ok` may carry informational messages (a stage can report non-fatal
    /// sub-errors and still succeed); they end up in the run record.
    async fn run(&self, ctx: CancellationToken) -> Result<Vec<String>, StageError>;
}

/// Function-backed stage work.
///
/// Wraps a closure that *creates* a new future per run, so there is no
/// shared mutable state between runs; share state explicitly via `Arc`
/// inside the closure if needed.
///
/// ## Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use stagehand::{WorkFn, WorkRef, StageError};
///
/// let work: WorkRef = WorkFn::arc("noop", |_ctx: CancellationToken| async move {
///     Ok::<_, StageError>(Vec::new())
/// });
/// ```
pub struct WorkFn<F> {
    label: Cow<'static, str>,
    f: F,
}

impl<F> WorkFn<F> {
    /// Creates new function-backed work.
    ///
    /// The label is only used in `Debug` output; the scheduler identifies
    /// work by its [`StageName`](crate::StageName), not by this label.
    pub fn new(label: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            label: label.into(),
            f,
        }
    }

    /// Creates the work and returns it as a shared handle.
    pub fn arc(label: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(label, f))
    }
}

impl<F> std::fmt::Debug for WorkFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkFn").field("label", &self.label).finish()
    }
}

#[async_trait]
impl<F, Fut> StageWork for WorkFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<String>, StageError>> + Send + 'static,
{
    async fn run(&self, ctx: CancellationToken) -> Result<Vec<String>, StageError> {
        (self.f)(ctx).await
    }
}
