//! # Runtime events emitted by workers and the supervisor.
//!
//! The [`EventKind`] enum classifies event types across two categories:
//! - **Worker lifecycle**: start, per-iteration failures, final stop
//! - **Runtime lifecycle**: shutdown request and its outcome
//!
//! The [`Event`] struct carries additional metadata such as timestamps,
//! worker name, failure reasons, and iteration numbers.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.
//!
//! ## Example
//! ```rust
//! use conveyor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::IterationFailed)
//!     .with_task("drain-0")
//!     .with_reason("boom")
//!     .with_iteration(3);
//!
//! assert_eq!(ev.kind, EventKind::IterationFailed);
//! assert_eq!(ev.task.as_deref(), Some("drain-0"));
//! assert_eq!(ev.reason.as_deref(), Some("boom"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Worker lifecycle events ===
    /// A worker entered its loop.
    ///
    /// Sets:
    /// - `task`: worker name
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    TaskStarting,

    /// A worker exited its loop (stop requested, cancelled, or
    /// self-stopped). Always the final event a worker publishes.
    ///
    /// Sets:
    /// - `task`: worker name
    /// - `iteration`: number of completed iterations
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    TaskStopped,

    /// One iteration raised an unexpected error. The loop continues.
    ///
    /// Sets:
    /// - `task`: worker name
    /// - `iteration`: iteration number (1-based)
    /// - `reason`: failure message
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    IterationFailed,

    /// One iteration panicked; the panic was caught and the loop continues.
    ///
    /// Sets:
    /// - `task`: worker name
    /// - `iteration`: iteration number
    /// - `reason`: panic payload, when printable
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    IterationPanicked,

    /// One iteration exceeded the configured per-step timeout and was
    /// abandoned. The loop continues.
    ///
    /// Sets:
    /// - `task`: worker name
    /// - `iteration`: iteration number
    /// - `timeout_ms`: configured step timeout (ms)
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    StepTimeout,

    // === Runtime lifecycle events ===
    /// Shutdown requested (OS signal observed).
    ///
    /// Sets:
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    ShutdownRequested,

    /// All workers stopped within the configured grace period.
    ///
    /// Sets:
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    AllStoppedWithin,

    /// Grace period exceeded; some workers did not stop in time.
    ///
    /// Sets:
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    GraceExceeded,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the worker, if applicable.
    pub task: Option<Arc<str>>,
    /// Human-readable reason (errors, panic payloads, etc.).
    pub reason: Option<Arc<str>>,
    /// Iteration count (starting from 1).
    pub iteration: Option<u64>,
    /// Step timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and
    /// next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            reason: None,
            iteration: None,
            timeout_ms: None,
        }
    }

    /// Attaches a worker name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an iteration count.
    #[inline]
    pub fn with_iteration(mut self, n: u64) -> Self {
        self.iteration = Some(n);
        self
    }

    /// Attaches a step timeout (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::TaskStarting);
        let b = Event::new(EventKind::TaskStopped);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_builders_set_fields() {
        let ev = Event::new(EventKind::StepTimeout)
            .with_task("w1")
            .with_iteration(7)
            .with_timeout(Duration::from_millis(250));
        assert_eq!(ev.task.as_deref(), Some("w1"));
        assert_eq!(ev.iteration, Some(7));
        assert_eq!(ev.timeout_ms, Some(250));
        assert!(ev.reason.is_none());
    }

    #[test]
    fn test_huge_timeout_saturates() {
        let ev = Event::new(EventKind::StepTimeout).with_timeout(Duration::from_secs(u64::MAX));
        assert_eq!(ev.timeout_ms, Some(u32::MAX));
    }
}
