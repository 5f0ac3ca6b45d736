//! # conveyor
//!
//! **Conveyor** is a bounded, backpressure-aware producer-consumer queue
//! paired with supervised workers that drain it.
//!
//! It provides two primitives and the runtime around them: a
//! fixed-capacity async MPMC channel with timeout/cancellation/close
//! semantics, and a restart loop that repeatedly invokes a work unit,
//! isolating each iteration's failure so the loop survives and continues
//! until externally stopped.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  producer 1 ──┐                       ┌──► Worker(QueueDrain #1) ──┐
//!  producer 2 ──┼──► BoundedQueue<T> ───┼──► Worker(QueueDrain #2)   │
//!  producer N ──┘    (capacity C,       └──► Worker(QueueDrain #M) ──┤
//!                     FIFO, close)                                   │
//!                                                 publish Events:    │
//!                                                 - TaskStarting     │
//!                                                 - IterationFailed  │
//!                                                 - TaskStopped      │
//!                                                        ▼           ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                      Bus (broadcast channel)                      │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                         SubscriberSet listener
//!                           ├─► LogWriter.on_event()
//!                           └─► custom Subscribe impls
//! ```
//!
//! ### Worker lifecycle
//! ```text
//! Runnable ──► Worker::start(token)
//!
//! loop {
//!   ├─► continue check (stop flag AND cancellation token)
//!   ├─► step(ctx)
//!   │       ├─ Ok(Continue)  ─► next iteration
//!   │       ├─ Ok(Stop)      ─► graceful exit at loop-top
//!   │       ├─ Err(expected) ─► swallowed (cancellation, queue closed)
//!   │       └─ Err(other)    ─► IterationFailed event, loop continues
//!   └─► cleanup(ctx)            (always runs)
//! }
//!
//! On exit: publish TaskStopped naming the worker
//! ```
//!
//! ## Features
//! | Area            | Description                                               | Key types / traits                  |
//! |-----------------|-----------------------------------------------------------|-------------------------------------|
//! | **Queue**       | Bounded FIFO handoff with backpressure and close.         | [`BoundedQueue`], [`QueueError`]    |
//! | **Work units**  | Loop bodies as trait impls, closures, or queue drains.    | [`Runnable`], [`StepFn`], [`QueueDrain`] |
//! | **Supervision** | Failure-isolating restart loops and worker fan-out.       | [`Worker`], [`Supervisor`]          |
//! | **Errors**      | Tagged outcomes instead of control-flow exceptions.       | [`QueueError`], [`TaskError`], [`RuntimeError`] |
//! | **Events**      | Lifecycle observability over a broadcast bus.             | [`Bus`], [`Event`], [`Subscribe`]   |
//! | **Configuration** | Centralized runtime settings with sentinel conventions. | [`Config`]                          |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use conveyor::{BoundedQueue, Config, QueueDrain, RunnableRef, Supervisor, TaskError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config::default();
//!     let queue = Arc::new(BoundedQueue::new("jobs", 8));
//!     let sup = Supervisor::new(cfg.clone(), Vec::new());
//!
//!     // Two drains sharing one queue model a small worker pool.
//!     let units: Vec<RunnableRef> = (0..2)
//!         .map(|i| {
//!             QueueDrain::arc(
//!                 format!("drain-{i}"),
//!                 Arc::clone(&queue),
//!                 |job: &'static str| async move {
//!                     let _ = job; // process...
//!                     Ok::<_, TaskError>(())
//!                 },
//!                 Some(Duration::from_millis(20)),
//!             ) as RunnableRef
//!         })
//!         .collect();
//!
//!     let ctx = CancellationToken::new();
//!     for job in ["a", "b", "c"] {
//!         queue.enqueue(job, None, &ctx).await?;
//!     }
//!     // Closing lets the drains finish the backlog and stop cleanly.
//!     queue.close();
//!
//!     sup.run(units).await?;
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod queue;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use config::Config;
pub use core::{Supervisor, Worker, WorkerParams};
pub use error::{QueueError, RuntimeError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use queue::BoundedQueue;
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use tasks::{Control, ErrorDisposition, QueueDrain, Runnable, RunnableRef, StepFn};
