//! # Global runtime configuration.
//!
//! Provides [`Config`], centralized settings for the conveyor runtime.
//!
//! Config is used in two ways:
//! 1. **Supervisor creation**: `Supervisor::new(config, subscribers)`
//! 2. **Work-unit defaults**: `QueueDrain::with_defaults(queue, handler, &config)`
//!
//! ## Sentinel values
//! - `step_timeout = 0s` → no per-iteration timeout
//! - `poll_timeout = 0s` → dequeue waits indefinitely

use std::time::Duration;

/// Global configuration for the conveyor runtime.
///
/// ## Field semantics
/// - `grace`: Maximum wait for workers to stop gracefully after shutdown
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
/// - `step_timeout`: Default per-iteration timeout (`0s` = no timeout)
/// - `poll_timeout`: Default dequeue wait used by [`QueueDrain`](crate::QueueDrain)
///   (`0s` = wait indefinitely)
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to
/// avoid sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum time to wait for graceful shutdown before giving up.
    ///
    /// When a shutdown signal is received:
    /// - Workers are cancelled via `CancellationToken`
    /// - Supervisor waits up to `grace` for workers to exit
    /// - If exceeded, `run` returns `RuntimeError::GraceExceeded`
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` events
    /// will skip over older items. Minimum value is 1 (enforced by Bus).
    pub bus_capacity: usize,

    /// Default per-iteration timeout for workers.
    ///
    /// - `Duration::ZERO` = no timeout (a step runs until it completes)
    /// - `> 0` = each step is abandoned after this long
    ///
    /// Used by `WorkerParams::with_defaults()`. Can be overridden per-worker.
    pub step_timeout: Duration,

    /// Default time a draining work unit waits for one item.
    ///
    /// - `Duration::ZERO` = wait indefinitely
    /// - `> 0` = give up the attempt after this long and poll again
    ///
    /// A short poll keeps drain loops responsive to `stop()` even when
    /// the queue stays empty.
    pub poll_timeout: Duration,
}

impl Config {
    /// Returns the default per-iteration timeout as an `Option`.
    ///
    /// - `None` → no timeout
    /// - `Some(d)` → timeout applied per step
    #[inline]
    pub fn step_timeout_opt(&self) -> Option<Duration> {
        if self.step_timeout == Duration::ZERO {
            None
        } else {
            Some(self.step_timeout)
        }
    }

    /// Returns the default dequeue wait as an `Option`.
    ///
    /// - `None` → wait indefinitely
    /// - `Some(d)` → poll with the given timeout
    #[inline]
    pub fn poll_timeout_opt(&self) -> Option<Duration> {
        if self.poll_timeout == Duration::ZERO {
            None
        } else {
            Some(self.poll_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `grace = 30s` (reasonable graceful shutdown window)
    /// - `bus_capacity = 1024` (good baseline)
    /// - `step_timeout = 0s` (no per-iteration timeout)
    /// - `poll_timeout = 100ms` (responsive drain loops)
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(30),
            bus_capacity: 1024,
            step_timeout: Duration::from_secs(0),
            poll_timeout: Duration::from_millis(100),
        }
    }
}
