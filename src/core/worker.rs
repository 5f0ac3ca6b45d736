//! # Worker: the supervised restart loop.
//!
//! A [`Worker`] repeatedly invokes one [`Runnable`]'s `step`, isolating
//! each iteration's failure so a single bad iteration cannot kill the
//! loop. The loop survives errors **and** panics; it exits only through
//! the loop-top continue check.
//!
//! ## State machine
//! ```text
//! Idle ──start()──► Running ──stop()/cancel/Control::Stop──► Stopped
//! ```
//! `start` drives the loop itself and does not return until the loop
//! exits; callers needing concurrency run it on their own task. A second
//! `start` is rejected. `stop` flips a flag read at the top of each
//! iteration; it never interrupts an in-flight step.
//!
//! ## Per-iteration protocol
//! ```text
//! loop {
//!   ├─► continue check (keep-running flag AND token not cancelled)
//!   ├─► step(child_token)       (optional per-step timeout)
//!   │       ├─ Ok(Continue)     → next iteration
//!   │       ├─ Ok(Stop)         → flag cleared, loop-top check exits
//!   │       ├─ Err(e)           → on_error(e): Benign → swallowed
//!   │       │                                  Report → IterationFailed event
//!   │       ├─ panic            → caught → IterationPanicked event
//!   │       └─ timeout          → child cancelled → StepTimeout event
//!   └─► cleanup()               (always, even after error/panic/timeout)
//! }
//! publish TaskStopped
//! ```
//!
//! ## Rules
//! - No iteration starts after a stop request is observed at loop-top.
//! - Cleanup runs once per iteration, whatever the step's outcome.
//! - The final `TaskStopped` event names the work unit, for operability.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;

use futures::FutureExt;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{RuntimeError, TaskError};
use crate::events::{Bus, Event, EventKind};
use crate::tasks::{Control, ErrorDisposition, RunnableRef};

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const STOPPED: u8 = 2;

/// Configuration parameters for a worker.
#[derive(Clone, Copy, Debug, Default)]
pub struct WorkerParams {
    /// Optional per-iteration timeout (`None` = no timeout).
    ///
    /// When a step exceeds it, the step's child token is cancelled, the
    /// in-flight step is abandoned (its work is dropped), a
    /// [`StepTimeout`](EventKind::StepTimeout) event is published, and
    /// the loop continues.
    pub step_timeout: Option<Duration>,
}

impl WorkerParams {
    /// Derives parameters from global config (`0s` timeout → `None`).
    pub fn with_defaults(cfg: &Config) -> Self {
        Self {
            step_timeout: cfg.step_timeout_opt(),
        }
    }
}

/// Outcome of one iteration, after timeout and panic handling.
enum StepOutcome {
    Continue,
    StopRequested,
    Failed(TaskError),
}

/// Supervises execution of a single [`Runnable`](crate::Runnable) until
/// stopped or cancelled.
///
/// Shareable as `Arc<Worker>` so one caller can drive [`Worker::start`]
/// while another invokes [`Worker::stop`].
pub struct Worker {
    runnable: RunnableRef,
    params: WorkerParams,
    bus: Bus,
    keep_running: AtomicBool,
    state: AtomicU8,
}

impl Worker {
    /// Creates a new worker bound to one work unit.
    pub fn new(runnable: RunnableRef, params: WorkerParams, bus: Bus) -> Self {
        Self {
            runnable,
            params,
            bus,
            keep_running: AtomicBool::new(true),
            state: AtomicU8::new(IDLE),
        }
    }

    /// Returns the underlying work unit's name.
    pub fn name(&self) -> &str {
        self.runnable.name()
    }

    /// True while the loop is executing.
    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) == RUNNING
    }

    /// Requests a graceful stop.
    ///
    /// Takes effect at the next loop-top check; an in-flight iteration
    /// completes (including its cleanup). Safe to call from any task,
    /// any number of times.
    pub fn stop(&self) {
        self.keep_running.store(false, Ordering::Release);
    }

    /// Drives the supervised loop until it exits.
    ///
    /// Does not return while the loop runs; spawn it for concurrency:
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use tokio_util::sync::CancellationToken;
    /// use conveyor::{Bus, Control, StepFn, TaskError, Worker, WorkerParams};
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let bus = Bus::new(16);
    /// let unit = StepFn::arc("one-shot", |_ctx: CancellationToken| async move {
    ///     Ok::<_, TaskError>(Control::Stop)
    /// });
    /// let worker = Arc::new(Worker::new(unit, WorkerParams::default(), bus));
    ///
    /// let handle = tokio::spawn({
    ///     let worker = Arc::clone(&worker);
    ///     async move { worker.start(CancellationToken::new()).await }
    /// });
    /// handle.await.unwrap().unwrap();
    /// # }
    /// ```
    ///
    /// ## Errors
    /// [`RuntimeError::AlreadyStarted`] if the worker is running or has
    /// already run; a worker drives exactly one loop in its lifetime.
    pub async fn start(&self, ctx: CancellationToken) -> Result<(), RuntimeError> {
        if self
            .state
            .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(RuntimeError::AlreadyStarted {
                name: self.runnable.name().to_string(),
            });
        }

        let name: Arc<str> = Arc::from(self.runnable.name());
        self.bus
            .publish(Event::new(EventKind::TaskStarting).with_task(Arc::clone(&name)));

        let mut iterations: u64 = 0;
        while self.should_continue(&ctx) {
            iterations += 1;
            match self.run_step(&ctx, iterations, &name).await {
                StepOutcome::Continue => {}
                StepOutcome::StopRequested => self.stop(),
                StepOutcome::Failed(err) => {
                    if let ErrorDisposition::Report = self.runnable.on_error(&err, &ctx).await {
                        self.bus.publish(
                            Event::new(EventKind::IterationFailed)
                                .with_task(Arc::clone(&name))
                                .with_iteration(iterations)
                                .with_reason(err.to_string()),
                        );
                    }
                }
            }
            // Always, even after a failed, panicked, or timed-out step.
            self.runnable.cleanup(&ctx).await;
        }

        self.state.store(STOPPED, Ordering::Release);
        self.bus.publish(
            Event::new(EventKind::TaskStopped)
                .with_task(name)
                .with_iteration(iterations),
        );
        Ok(())
    }

    /// The continue-condition checked before every iteration.
    fn should_continue(&self, ctx: &CancellationToken) -> bool {
        !ctx.is_cancelled() && self.keep_running.load(Ordering::Acquire)
    }

    /// Executes one step with timeout and panic isolation.
    ///
    /// Derives a child token per iteration so a step timeout cancels
    /// only that step, never the parent.
    async fn run_step(
        &self,
        parent: &CancellationToken,
        iteration: u64,
        name: &Arc<str>,
    ) -> StepOutcome {
        let child = parent.child_token();
        let step = AssertUnwindSafe(self.runnable.step(&child)).catch_unwind();

        let res = match self.params.step_timeout {
            Some(dur) => match time::timeout(dur, step).await {
                Ok(r) => r,
                Err(_elapsed) => {
                    child.cancel();
                    self.bus.publish(
                        Event::new(EventKind::StepTimeout)
                            .with_task(Arc::clone(name))
                            .with_iteration(iteration)
                            .with_timeout(dur),
                    );
                    return StepOutcome::Continue;
                }
            },
            None => step.await,
        };

        match res {
            Ok(Ok(Control::Continue)) => StepOutcome::Continue,
            Ok(Ok(Control::Stop)) => StepOutcome::StopRequested,
            Ok(Err(e)) => StepOutcome::Failed(e),
            Err(panic) => {
                self.bus.publish(
                    Event::new(EventKind::IterationPanicked)
                        .with_task(Arc::clone(name))
                        .with_iteration(iteration)
                        .with_reason(panic_message(panic.as_ref())),
                );
                StepOutcome::Continue
            }
        }
    }
}

/// Extracts a printable message from a caught panic payload.
fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::{Runnable, StepFn};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    /// Work unit whose step always fails; counts steps and cleanups.
    struct FlakyUnit {
        steps: AtomicUsize,
        cleanups: AtomicUsize,
    }

    #[async_trait]
    impl Runnable for FlakyUnit {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn step(&self, _ctx: &CancellationToken) -> Result<Control, TaskError> {
            self.steps.fetch_add(1, Ordering::SeqCst);
            Err(TaskError::Fail { error: "boom".into() })
        }

        async fn cleanup(&self, _ctx: &CancellationToken) {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Collects events published up to (and including) TaskStopped.
    async fn events_until_stopped(
        mut rx: tokio::sync::broadcast::Receiver<Event>,
    ) -> Vec<Event> {
        use tokio::sync::broadcast::error::RecvError;
        let mut out = Vec::new();
        loop {
            let ev = match time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("no TaskStopped within 5s")
            {
                Ok(ev) => ev,
                // The bus is lossy by contract; a flooded receiver skips the
                // dropped items and keeps reading the retained window.
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => panic!("bus closed before TaskStopped"),
            };
            let kind = ev.kind;
            out.push(ev);
            if kind == EventKind::TaskStopped {
                return out;
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failing_step_never_kills_the_loop() {
        let unit = Arc::new(FlakyUnit {
            steps: AtomicUsize::new(0),
            cleanups: AtomicUsize::new(0),
        });
        let bus = Bus::new(64);
        let worker = Arc::new(Worker::new(
            unit.clone(),
            WorkerParams::default(),
            bus.clone(),
        ));

        let handle = tokio::spawn({
            let worker = Arc::clone(&worker);
            async move { worker.start(CancellationToken::new()).await }
        });

        // Let it fail a few times, then stop.
        time::sleep(Duration::from_millis(100)).await;
        assert!(worker.is_running());
        worker.stop();
        handle.await.unwrap().unwrap();

        let steps = unit.steps.load(Ordering::SeqCst);
        assert!(steps > 1, "loop must survive failing iterations");
        // Cleanup ran once per iteration, errors included.
        assert_eq!(unit.cleanups.load(Ordering::SeqCst), steps);

        // No iteration after stop was observed.
        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(unit.steps.load(Ordering::SeqCst), steps);
        assert!(!worker.is_running());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unexpected_errors_are_reported_not_fatal() {
        let unit = Arc::new(FlakyUnit {
            steps: AtomicUsize::new(0),
            cleanups: AtomicUsize::new(0),
        });
        let bus = Bus::new(256);
        let rx = bus.subscribe();
        let worker = Arc::new(Worker::new(unit, WorkerParams::default(), bus));

        let handle = tokio::spawn({
            let worker = Arc::clone(&worker);
            async move { worker.start(CancellationToken::new()).await }
        });
        time::sleep(Duration::from_millis(50)).await;
        worker.stop();
        handle.await.unwrap().unwrap();

        let events = events_until_stopped(rx).await;
        assert!(
            events
                .iter()
                .any(|e| e.kind == EventKind::IterationFailed
                    && e.reason.as_deref() == Some("execution failed: boom")),
            "failed iterations must surface as events"
        );
        let stopped = events.last().unwrap();
        assert_eq!(stopped.task.as_deref(), Some("flaky"));
    }

    #[tokio::test]
    async fn test_control_stop_exits_after_one_iteration() {
        let bus = Bus::new(16);
        let rx = bus.subscribe();
        let unit = StepFn::arc("one-shot", |_ctx: CancellationToken| async move {
            Ok::<_, TaskError>(Control::Stop)
        });
        let worker = Worker::new(unit, WorkerParams::default(), bus);
        worker.start(CancellationToken::new()).await.unwrap();

        let events = events_until_stopped(rx).await;
        let stopped = events.last().unwrap();
        assert_eq!(stopped.kind, EventKind::TaskStopped);
        assert_eq!(stopped.iteration, Some(1));
    }

    #[tokio::test]
    async fn test_cancellation_exits_at_loop_top() {
        let bus = Bus::new(16);
        let unit = StepFn::arc("idle", |_ctx: CancellationToken| async move {
            time::sleep(Duration::from_millis(10)).await;
            Ok::<_, TaskError>(Control::Continue)
        });
        let worker = Arc::new(Worker::new(unit, WorkerParams::default(), bus));
        let ctx = CancellationToken::new();

        let handle = tokio::spawn({
            let worker = Arc::clone(&worker);
            let ctx = ctx.clone();
            async move { worker.start(ctx).await }
        });
        time::sleep(Duration::from_millis(50)).await;
        ctx.cancel();
        handle.await.unwrap().unwrap();
        assert!(!worker.is_running());
    }

    #[tokio::test]
    async fn test_second_start_is_rejected() {
        let bus = Bus::new(16);
        let unit = StepFn::arc("once", |_ctx: CancellationToken| async move {
            Ok::<_, TaskError>(Control::Stop)
        });
        let worker = Worker::new(unit, WorkerParams::default(), bus);
        worker.start(CancellationToken::new()).await.unwrap();

        let err = worker.start(CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.as_label(), "runtime_already_started");
    }

    #[tokio::test]
    async fn test_panicking_step_is_isolated() {
        let bus = Bus::new(64);
        let rx = bus.subscribe();
        let calls = Arc::new(AtomicUsize::new(0));
        let unit = StepFn::arc("panicky", {
            let calls = Arc::clone(&calls);
            move |_ctx: CancellationToken| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        panic!("iteration blew up");
                    }
                    Ok::<_, TaskError>(Control::Stop)
                }
            }
        });
        let worker = Worker::new(unit, WorkerParams::default(), bus);
        worker.start(CancellationToken::new()).await.unwrap();

        let events = events_until_stopped(rx).await;
        let panics = events
            .iter()
            .filter(|e| e.kind == EventKind::IterationPanicked)
            .count();
        assert_eq!(panics, 2);
        assert_eq!(events.last().unwrap().iteration, Some(3));
    }

    #[tokio::test]
    async fn test_step_timeout_abandons_iteration() {
        let bus = Bus::new(64);
        let rx = bus.subscribe();
        let unit = StepFn::arc("slow", |_ctx: CancellationToken| async move {
            time::sleep(Duration::from_secs(30)).await;
            Ok::<_, TaskError>(Control::Continue)
        });
        let params = WorkerParams {
            step_timeout: Some(Duration::from_millis(20)),
        };
        let worker = Arc::new(Worker::new(unit, params, bus));

        let handle = tokio::spawn({
            let worker = Arc::clone(&worker);
            async move { worker.start(CancellationToken::new()).await }
        });
        time::sleep(Duration::from_millis(100)).await;
        worker.stop();
        handle.await.unwrap().unwrap();

        let events = events_until_stopped(rx).await;
        assert!(
            events.iter().any(|e| e.kind == EventKind::StepTimeout
                && e.timeout_ms == Some(20)),
            "timed-out steps must surface as events"
        );
    }

    #[tokio::test]
    async fn test_expected_errors_are_swallowed() {
        let bus = Bus::new(64);
        let rx = bus.subscribe();
        let calls = Arc::new(AtomicUsize::new(0));
        let unit = StepFn::arc("graceful", {
            let calls = Arc::clone(&calls);
            move |_ctx: CancellationToken| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(TaskError::Canceled)
                    } else {
                        Ok(Control::Stop)
                    }
                }
            }
        });
        let worker = Worker::new(unit, WorkerParams::default(), bus);
        worker.start(CancellationToken::new()).await.unwrap();

        let events = events_until_stopped(rx).await;
        assert!(
            events.iter().all(|e| e.kind != EventKind::IterationFailed),
            "expected errors must not surface"
        );
    }
}
