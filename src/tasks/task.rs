//! # Work-unit abstraction for supervised loops.
//!
//! This module defines the [`Runnable`] trait: one iteration of a
//! supervised loop, plus the hooks a [`Worker`](crate::Worker) drives
//! around it. The common handle type is [`RunnableRef`], an
//! `Arc<dyn Runnable>` suitable for sharing across the runtime.
//!
//! A work unit receives a [`CancellationToken`] and should propagate it
//! into any blocking call it makes, so the iteration wakes promptly
//! during shutdown instead of waiting out its full timeout.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// What the loop should do after a successful iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Run another iteration (after cleanup and the loop-top check).
    Continue,
    /// Request a graceful stop; honored at the next loop-top check,
    /// exactly like [`Worker::stop`](crate::Worker::stop).
    Stop,
}

/// What the loop should do with a failed iteration's error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDisposition {
    /// Expected condition (cancellation, queue closure); swallow it.
    Benign,
    /// Real failure; surface it as an [`IterationFailed`](crate::EventKind::IterationFailed)
    /// event. The loop continues either way.
    Report,
}

/// # One iteration of a supervised loop.
///
/// A `Runnable` has a stable [`name`](Runnable::name) and an async
/// [`step`](Runnable::step) that performs a single unit of work
/// (typically: dequeue one item with a short timeout, then process it).
/// The driving [`Worker`](crate::Worker) isolates each step's failure so
/// a bad iteration never kills the loop.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use conveyor::{Control, Runnable, TaskError};
///
/// struct Ticker;
///
/// #[async_trait]
/// impl Runnable for Ticker {
///     fn name(&self) -> &str { "ticker" }
///
///     async fn step(&self, ctx: &CancellationToken) -> Result<Control, TaskError> {
///         if ctx.is_cancelled() {
///             return Ok(Control::Stop);
///         }
///         // do one unit of work...
///         Ok(Control::Continue)
///     }
/// }
/// ```
#[async_trait]
pub trait Runnable: Send + Sync + 'static {
    /// Returns a stable, human-readable work-unit name.
    fn name(&self) -> &str;

    /// Performs one iteration.
    ///
    /// Implementations should pass `ctx` into blocking calls and exit
    /// promptly when it fires. Returning [`Control::Stop`] requests a
    /// graceful stop; returning `Err` routes the error through
    /// [`Runnable::on_error`] and the loop continues.
    async fn step(&self, ctx: &CancellationToken) -> Result<Control, TaskError>;

    /// Classifies a step error.
    ///
    /// The default swallows expected shutdown conditions
    /// ([`TaskError::is_expected`]) and reports everything else. An
    /// error never terminates the loop on its own, whatever this
    /// returns; only the loop-top check does.
    async fn on_error(&self, err: &TaskError, _ctx: &CancellationToken) -> ErrorDisposition {
        if err.is_expected() {
            ErrorDisposition::Benign
        } else {
            ErrorDisposition::Report
        }
    }

    /// Runs after every iteration, even a failed or panicked one.
    ///
    /// Default: no cleanup.
    async fn cleanup(&self, _ctx: &CancellationToken) {}
}

/// Shared handle to a work unit.
pub type RunnableRef = std::sync::Arc<dyn Runnable>;
