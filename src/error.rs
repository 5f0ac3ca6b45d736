//! Error types used by the conveyor runtime and work units.
//!
//! This module defines three error enums:
//!
//! - [`QueueError`] — outcomes of blocking queue operations that did not
//!   complete (timeout, cancellation, closure).
//! - [`TaskError`] — errors raised by a single iteration of a supervised
//!   work unit.
//! - [`RuntimeError`] — errors raised by the orchestration runtime itself.
//!
//! All three provide `as_label` for logging/metrics plus classification
//! helpers such as [`QueueError::is_retryable`] and [`TaskError::is_expected`],
//! so callers branch on outcome kind instead of matching error text.

use std::time::Duration;
use thiserror::Error;

/// # Non-completion outcomes of blocking queue operations.
///
/// `enqueue`/`dequeue` report these instead of raising: timing out on a
/// full or empty queue is an ordinary result, not a crash. The variants
/// are deliberately distinguishable so a caller can decide whether to
/// retry ([`QueueError::TimedOut`]) or stop using the queue
/// ([`QueueError::Canceled`], [`QueueError::Closed`]).
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The operation did not complete within the requested timeout.
    #[error("operation timed out")]
    TimedOut,

    /// The cancellation token fired while the operation was waiting.
    #[error("operation canceled")]
    Canceled,

    /// The queue is closed: enqueues are rejected, and dequeues report
    /// this once no pending items remain. Terminal: later calls keep
    /// returning it.
    #[error("queue closed")]
    Closed,
}

impl QueueError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use conveyor::QueueError;
    ///
    /// assert_eq!(QueueError::TimedOut.as_label(), "queue_timed_out");
    /// assert_eq!(QueueError::Closed.as_label(), "queue_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            QueueError::TimedOut => "queue_timed_out",
            QueueError::Canceled => "queue_canceled",
            QueueError::Closed => "queue_closed",
        }
    }

    /// Indicates whether the same call may succeed if simply retried.
    ///
    /// Only [`QueueError::TimedOut`] is retryable; cancellation and
    /// closure are terminal for the caller.
    ///
    /// # Example
    /// ```
    /// use conveyor::QueueError;
    ///
    /// assert!(QueueError::TimedOut.is_retryable());
    /// assert!(!QueueError::Closed.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, QueueError::TimedOut)
    }
}

/// # Errors produced by one iteration of a supervised work unit.
///
/// A [`Worker`](crate::Worker) catches these at the iteration boundary;
/// they never terminate the loop on their own. Expected errors
/// ([`TaskError::Canceled`], [`TaskError::QueueClosed`]) are swallowed by
/// the default error handler, everything else is surfaced as an event.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError {
    /// The iteration observed cancellation and gave up cooperatively.
    #[error("iteration canceled")]
    Canceled,

    /// The queue this work unit drains was closed and is empty.
    #[error("queue '{queue}' closed")]
    QueueClosed {
        /// Name of the closed queue.
        queue: String,
    },

    /// Any other failure inside the work unit.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },
}

impl TaskError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use conveyor::TaskError;
    ///
    /// let err = TaskError::Fail { error: "boom".into() };
    /// assert_eq!(err.as_label(), "task_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Canceled => "task_canceled",
            TaskError::QueueClosed { .. } => "task_queue_closed",
            TaskError::Fail { .. } => "task_failed",
        }
    }

    /// Indicates whether this error is an expected part of shutdown
    /// rather than a real failure.
    ///
    /// Expected errors are swallowed by the default
    /// [`Runnable::on_error`](crate::Runnable::on_error) implementation;
    /// unexpected ones are reported but still do not kill the loop.
    ///
    /// # Example
    /// ```
    /// use conveyor::TaskError;
    ///
    /// assert!(TaskError::Canceled.is_expected());
    /// assert!(!TaskError::Fail { error: "boom".into() }.is_expected());
    /// ```
    pub fn is_expected(&self) -> bool {
        matches!(self, TaskError::Canceled | TaskError::QueueClosed { .. })
    }
}

/// # Errors produced by the conveyor runtime.
///
/// Failures of the orchestration machinery itself, as opposed to queue
/// outcomes or work-unit errors.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// `start()` was called on a worker that is already running or has
    /// already run. A worker drives exactly one loop in its lifetime.
    #[error("worker '{name}' already started")]
    AlreadyStarted {
        /// Name of the offending worker.
        name: String,
    },

    /// Shutdown grace period elapsed with workers still running.
    #[error("shutdown grace {grace:?} exceeded; {running} workers still running")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Number of workers that did not stop in time.
        running: usize,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::AlreadyStarted { .. } => "runtime_already_started",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}
