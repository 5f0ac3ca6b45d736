//! # Supervisor: spawns workers, fans out events, handles graceful shutdown.
//!
//! The [`Supervisor`] owns the event bus, a [`SubscriberSet`], and global
//! runtime configuration. It spawns one [`Worker`] per work unit, shares a
//! single cancellation token across all of them, handles OS termination
//! signals, and bounds shutdown with a configurable grace period.
//!
//! ## High-level architecture
//! ```text
//! Inputs to run():
//!   Vec<RunnableRef> ──► Supervisor::run()
//!
//! Spawn workers:
//!   unit[0]      unit[1]      ...  unit[N-1]
//!     │            │                  │
//!     └──► Worker::new(unit, params, bus)               (one per unit)
//!                └──► child CancellationToken = runtime_token.child_token()
//!                     set.spawn(worker.start(child_token))
//!
//! Event flow:
//!   Worker ... ── publish(Event) ──► Bus ──► SubscriberSet listener
//!                                              └─► sub.on_event(&Event)
//!
//! Shutdown path:
//!   shutdown::wait_for_shutdown_signal()
//!             └─► Bus.publish(ShutdownRequested)
//!             └─► runtime_token.cancel()   → propagates to child tokens
//!             └─► wait_all_with_grace(cfg.grace):
//!                    ├─ Ok (all joined)    → Bus.publish(AllStoppedWithin)
//!                    └─ Timeout exceeded   → Bus.publish(GraceExceeded)
//! ```
//!
//! The composition root stays thin: pick the work units (how many drains
//! over which queue), hand them to `run`, and decide when to close the
//! queue. Fan-out, cancellation wiring, signal handling, and shutdown
//! bounding all live here.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use conveyor::{
//!     BoundedQueue, Config, LogWriter, QueueDrain, RunnableRef, Subscribe, Supervisor,
//!     TaskError,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config::default();
//!     let queue = Arc::new(BoundedQueue::new("jobs", 100));
//!
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
//!     let sup = Supervisor::new(cfg.clone(), subs);
//!
//!     let units: Vec<RunnableRef> = (0..4)
//!         .map(|i| {
//!             QueueDrain::arc(
//!                 format!("drain-{i}"),
//!                 Arc::clone(&queue),
//!                 |job: String| async move {
//!                     println!("{job}");
//!                     Ok::<_, TaskError>(())
//!                 },
//!                 Some(Duration::from_millis(100)),
//!             ) as RunnableRef
//!         })
//!         .collect();
//!
//!     sup.run(units).await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::core::shutdown;
use crate::core::worker::{Worker, WorkerParams};
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::tasks::RunnableRef;

/// Coordinates workers, event delivery (via [`SubscriberSet`]), and
/// graceful shutdown.
pub struct Supervisor {
    /// Global runtime configuration.
    pub cfg: Config,
    /// Event bus shared with all workers.
    pub bus: Bus,
    /// Fan-out set for subscribers.
    pub subs: Arc<SubscriberSet>,
}

impl Supervisor {
    /// Creates a new supervisor with the given config and subscribers.
    pub fn new(cfg: Config, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        Self {
            cfg,
            bus,
            subs: Arc::new(SubscriberSet::new(subscribers)),
        }
    }

    /// Runs the provided work units until either:
    /// - all workers exit on their own, or
    /// - a termination signal arrives → graceful shutdown (may end with
    ///   [`RuntimeError::GraceExceeded`]).
    pub async fn run(&self, units: Vec<RunnableRef>) -> Result<(), RuntimeError> {
        let token = CancellationToken::new();
        Arc::clone(&self.subs).listen(&self.bus);

        let mut set = JoinSet::new();
        self.spawn_workers(&mut set, &token, units);
        self.drive_shutdown(&mut set, &token).await
    }

    /// Spawns one worker per unit and adds them to the given join set.
    fn spawn_workers(
        &self,
        set: &mut JoinSet<()>,
        runtime_token: &CancellationToken,
        units: Vec<RunnableRef>,
    ) {
        for unit in units {
            let worker = Worker::new(unit, WorkerParams::with_defaults(&self.cfg), self.bus.clone());
            let child = runtime_token.child_token();
            set.spawn(async move {
                // A freshly constructed worker cannot be AlreadyStarted.
                let _ = worker.start(child).await;
            });
        }
    }

    /// Waits until either all workers finish or a shutdown signal is
    /// received.
    async fn drive_shutdown(
        &self,
        set: &mut JoinSet<()>,
        runtime_token: &CancellationToken,
    ) -> Result<(), RuntimeError> {
        tokio::select! {
            _ = shutdown::wait_for_shutdown_signal() => {
                self.bus.publish(Event::new(EventKind::ShutdownRequested));
                runtime_token.cancel();
                self.wait_all_with_grace(set).await
            }
            _ = async { while set.join_next().await.is_some() {} } => {
                Ok(())
            }
        }
    }

    /// Waits for all workers to finish within the configured grace period.
    ///
    /// Publishes [`EventKind::AllStoppedWithin`] on success, or
    /// [`EventKind::GraceExceeded`] on timeout and returns
    /// [`RuntimeError::GraceExceeded`] with the number of workers still
    /// running.
    async fn wait_all_with_grace(&self, set: &mut JoinSet<()>) -> Result<(), RuntimeError> {
        let grace = self.cfg.grace;
        let done = async { while set.join_next().await.is_some() {} };
        let timed = tokio::time::timeout(grace, done).await;

        match timed {
            Ok(_) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_) => {
                self.bus.publish(Event::new(EventKind::GraceExceeded));
                Err(RuntimeError::GraceExceeded {
                    grace,
                    running: set.len(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use crate::queue::BoundedQueue;
    use crate::tasks::{Control, QueueDrain, StepFn};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Test subscriber capturing every event kind it sees.
    struct Capture {
        kinds: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Capture {
        async fn on_event(&self, event: &Event) {
            self.kinds.lock().unwrap().push(event.kind);
        }

        fn name(&self) -> &'static str {
            "capture"
        }
    }

    #[tokio::test]
    async fn test_run_completes_when_all_workers_self_stop() {
        let capture = Arc::new(Capture {
            kinds: Mutex::new(Vec::new()),
        });
        let subs: Vec<Arc<dyn Subscribe>> = vec![capture.clone()];
        let sup = Supervisor::new(Config::default(), subs);

        let units: Vec<RunnableRef> = (0..3)
            .map(|i| {
                StepFn::arc(format!("unit-{i}"), |_ctx: CancellationToken| async move {
                    Ok::<_, TaskError>(Control::Stop)
                }) as RunnableRef
            })
            .collect();

        sup.run(units).await.unwrap();

        // Give the listener a beat to drain the bus.
        tokio::time::sleep(Duration::from_millis(100)).await;
        let kinds = capture.kinds.lock().unwrap();
        let stopped = kinds
            .iter()
            .filter(|k| **k == EventKind::TaskStopped)
            .count();
        assert_eq!(stopped, 3);
    }

    // Worker-pool scenario: one producer, 10k items through a
    // capacity-100 queue shared by 500 drains. After close, every drain
    // observes the terminal condition and exits; every item is handled
    // exactly once.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_drain_pool_consumes_everything_then_exits() {
        const WORKERS: usize = 500;
        const ITEMS: usize = 10_000;

        let sup = Supervisor::new(Config::default(), Vec::new());
        let queue = Arc::new(BoundedQueue::new("pool", 100));
        let handled = Arc::new(AtomicUsize::new(0));
        let distinct = Arc::new(Mutex::new(std::collections::HashSet::new()));

        let units: Vec<RunnableRef> = (0..WORKERS)
            .map(|i| {
                let handled = Arc::clone(&handled);
                let distinct = Arc::clone(&distinct);
                QueueDrain::arc(
                    format!("drain-{i}"),
                    Arc::clone(&queue),
                    move |item: usize| {
                        let handled = Arc::clone(&handled);
                        let distinct = Arc::clone(&distinct);
                        async move {
                            assert!(
                                distinct.lock().unwrap().insert(item),
                                "item {item} delivered twice"
                            );
                            handled.fetch_add(1, Ordering::SeqCst);
                            Ok::<_, TaskError>(())
                        }
                    },
                    Some(Duration::from_millis(10)),
                ) as RunnableRef
            })
            .collect();

        let producer = tokio::spawn({
            let queue = Arc::clone(&queue);
            async move {
                let ctx = CancellationToken::new();
                for i in 0..ITEMS {
                    queue.enqueue(i, None, &ctx).await.unwrap();
                }
                queue.close();
            }
        });

        sup.run(units).await.unwrap();
        producer.await.unwrap();

        assert_eq!(handled.load(Ordering::SeqCst), ITEMS);
        assert_eq!(distinct.lock().unwrap().len(), ITEMS);
        assert!(queue.is_empty());
    }
}
