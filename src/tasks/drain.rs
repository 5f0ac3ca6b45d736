//! # QueueDrain: the canonical consumer work unit.
//!
//! One [`step`](crate::Runnable::step) dequeues a single item with a short
//! poll timeout and hands it to the handler. Queue outcomes map onto the
//! loop contract:
//!
//! ```text
//! Ok(item)        → handler(item) → Continue   (handler error → Fail, reported)
//! Err(TimedOut)   → Continue                   (idle poll, nothing arrived)
//! Err(Canceled)   → Err(Canceled)              (benign; loop-top check exits)
//! Err(Closed)     → Stop                       (terminal: queue drained, no
//!                                               item will ever arrive again)
//! ```
//!
//! The short poll keeps the loop responsive to `stop()` even when the
//! queue stays empty; a `poll_timeout` of `None` trades that for zero
//! wakeups (the loop then relies on cancellation or closure to exit).

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{QueueError, TaskError};
use crate::queue::BoundedQueue;
use crate::tasks::task::{Control, Runnable};

/// Work unit that drains one queue: dequeue one item, handle it, repeat.
///
/// Several `QueueDrain`s over one shared queue model a worker pool.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use conveyor::{BoundedQueue, QueueDrain, RunnableRef, TaskError};
///
/// let queue = Arc::new(BoundedQueue::new("jobs", 100));
/// let unit: RunnableRef = QueueDrain::arc(
///     "drain-0",
///     Arc::clone(&queue),
///     |job: String| async move {
///         println!("{job}");
///         Ok::<_, TaskError>(())
///     },
///     Some(Duration::from_millis(10)),
/// );
/// assert_eq!(unit.name(), "drain-0");
/// ```
pub struct QueueDrain<T, H> {
    name: Cow<'static, str>,
    queue: Arc<BoundedQueue<T>>,
    handler: H,
    poll_timeout: Option<Duration>,
}

impl<T, H> QueueDrain<T, H> {
    /// Creates a drain over `queue` with an explicit poll timeout.
    ///
    /// `poll_timeout` follows the queue's sentinel rule: `None` or zero
    /// waits indefinitely for an item.
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        queue: Arc<BoundedQueue<T>>,
        handler: H,
        poll_timeout: Option<Duration>,
    ) -> Self {
        Self {
            name: name.into(),
            queue,
            handler,
            poll_timeout,
        }
    }

    /// Creates the drain and returns it as a shared handle.
    pub fn arc(
        name: impl Into<Cow<'static, str>>,
        queue: Arc<BoundedQueue<T>>,
        handler: H,
        poll_timeout: Option<Duration>,
    ) -> Arc<Self> {
        Arc::new(Self::new(name, queue, handler, poll_timeout))
    }

    /// Creates a drain inheriting the poll timeout from global config.
    pub fn with_defaults(
        name: impl Into<Cow<'static, str>>,
        queue: Arc<BoundedQueue<T>>,
        handler: H,
        cfg: &Config,
    ) -> Self {
        Self::new(name, queue, handler, cfg.poll_timeout_opt())
    }
}

#[async_trait]
impl<T, H, Fut> Runnable for QueueDrain<T, H>
where
    T: Send + 'static,
    H: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn step(&self, ctx: &CancellationToken) -> Result<Control, TaskError> {
        match self.queue.dequeue(self.poll_timeout, ctx).await {
            Ok(item) => {
                (self.handler)(item).await?;
                Ok(Control::Continue)
            }
            // Nothing arrived this poll; go around again.
            Err(QueueError::TimedOut) => Ok(Control::Continue),
            Err(QueueError::Canceled) => Err(TaskError::Canceled),
            // Closed and drained: no item will ever arrive again.
            Err(QueueError::Closed) => Ok(Control::Stop),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_drain(
        queue: Arc<BoundedQueue<u32>>,
        seen: Arc<AtomicUsize>,
    ) -> QueueDrain<u32, impl Fn(u32) -> std::future::Ready<Result<(), TaskError>>> {
        QueueDrain::new(
            "drain",
            queue,
            move |_item| {
                seen.fetch_add(1, Ordering::SeqCst);
                std::future::ready(Ok(()))
            },
            Some(Duration::from_millis(10)),
        )
    }

    #[tokio::test]
    async fn test_step_handles_one_item() {
        let queue = Arc::new(BoundedQueue::new("q", 4));
        let seen = Arc::new(AtomicUsize::new(0));
        let drain = counting_drain(Arc::clone(&queue), Arc::clone(&seen));
        let ctx = CancellationToken::new();

        queue.enqueue(7, None, &ctx).await.unwrap();
        assert_eq!(drain.step(&ctx).await.unwrap(), Control::Continue);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_idle_poll_continues() {
        let queue = Arc::new(BoundedQueue::new("q", 4));
        let seen = Arc::new(AtomicUsize::new(0));
        let drain = counting_drain(Arc::clone(&queue), Arc::clone(&seen));
        let ctx = CancellationToken::new();

        assert_eq!(drain.step(&ctx).await.unwrap(), Control::Continue);
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_closed_and_drained_stops() {
        let queue = Arc::new(BoundedQueue::new("q", 4));
        let seen = Arc::new(AtomicUsize::new(0));
        let drain = counting_drain(Arc::clone(&queue), Arc::clone(&seen));
        let ctx = CancellationToken::new();

        queue.enqueue(1, None, &ctx).await.unwrap();
        queue.close();

        // Pending item is still delivered, then the drain asks to stop.
        assert_eq!(drain.step(&ctx).await.unwrap(), Control::Continue);
        assert_eq!(drain.step(&ctx).await.unwrap(), Control::Stop);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancellation_maps_to_expected_error() {
        let queue: Arc<BoundedQueue<u32>> = Arc::new(BoundedQueue::new("q", 4));
        let drain = counting_drain(Arc::clone(&queue), Arc::new(AtomicUsize::new(0)));
        let ctx = CancellationToken::new();
        ctx.cancel();

        let err = drain.step(&ctx).await.unwrap_err();
        assert!(err.is_expected());
    }

    #[tokio::test]
    async fn test_handler_error_propagates_as_fail() {
        let queue = Arc::new(BoundedQueue::new("q", 4));
        let drain = QueueDrain::new(
            "drain",
            Arc::clone(&queue),
            |_item: u32| async move {
                Err::<(), _>(TaskError::Fail { error: "bad item".into() })
            },
            Some(Duration::from_millis(10)),
        );
        let ctx = CancellationToken::new();

        queue.enqueue(1, None, &ctx).await.unwrap();
        let err = drain.step(&ctx).await.unwrap_err();
        assert!(!err.is_expected());
        assert_eq!(err.as_label(), "task_failed");
    }
}
