//! # BoundedQueue: fixed-capacity async MPMC FIFO channel.
//!
//! Safe handoff between any number of producers and consumers under a hard
//! capacity limit, with per-operation timeouts, cooperative cancellation,
//! and idempotent close.
//!
//! ## Internals
//! ```text
//! enqueue ──► acquire slot permit ──► push_back ──► add item permit
//!                  (cancellable,                        │
//!                   deadline-raced)                     ▼
//! dequeue ──► acquire item permit ──► pop_front ──► add slot permit
//! ```
//! Two semaphores count free slots and readable items; the buffer itself
//! sits behind a mutex held only for push/pop. Blocked callers suspend in
//! semaphore acquisition raced against a deadline sleep and the
//! cancellation token; there is no busy-waiting.
//!
//! ## Close semantics
//! `close()` closes both semaphores, which wakes **every** blocked producer
//! and consumer with a terminal outcome. New enqueues are rejected with
//! [`QueueError::Closed`]; pending items remain drainable, and dequeue
//! reports `Closed` only once the buffer is empty (from then on,
//! deterministically forever).
//!
//! ## Rules
//! - FIFO among successfully accepted items.
//! - Exactly-once handoff: no item is delivered to two consumers.
//! - At no observable instant does the pending count exceed capacity.
//! - A timeout of `None` or zero means wait indefinitely (see
//!   [`BoundedQueue::enqueue`]).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::select;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::QueueError;

/// Buffer plus the closed flag, guarded by one mutex.
struct Inner<T> {
    buf: VecDeque<T>,
    closed: bool,
}

/// Fixed-capacity async FIFO channel for producer-consumer handoff.
///
/// Cheap to share as `Arc<BoundedQueue<T>>`; all operations take `&self`.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
/// use conveyor::BoundedQueue;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let queue = BoundedQueue::new("jobs", 16);
/// let ctx = CancellationToken::new();
///
/// queue.enqueue("a", None, &ctx).await.unwrap();
/// let item = queue.dequeue(Some(Duration::from_millis(50)), &ctx).await.unwrap();
/// assert_eq!(item, "a");
/// # }
/// ```
pub struct BoundedQueue<T> {
    name: Arc<str>,
    capacity: usize,
    /// Free capacity; producers take one permit per accepted item.
    slots: Arc<Semaphore>,
    /// Readable items; consumers take one permit per delivered item.
    items: Arc<Semaphore>,
    inner: Mutex<Inner<T>>,
}

impl<T> BoundedQueue<T> {
    /// Creates a queue with the given name and capacity.
    ///
    /// The name is an opaque label used only in diagnostics. Capacity is
    /// clamped to at least 1 (and to the semaphore permit ceiling above).
    pub fn new(name: impl Into<Arc<str>>, capacity: usize) -> Self {
        let capacity = capacity.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            name: name.into(),
            capacity,
            slots: Arc::new(Semaphore::new(capacity)),
            items: Arc::new(Semaphore::new(0)),
            inner: Mutex::new(Inner {
                buf: VecDeque::with_capacity(capacity),
                closed: false,
            }),
        }
    }

    /// Returns the queue name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the fixed capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of pending items.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().buf.len()
    }

    /// True if no items are pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True once `close()` has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().unwrap().closed
    }

    /// Blocks until the item is accepted, the timeout elapses, the token
    /// fires, or the queue is closed.
    ///
    /// ## Timeout sentinel
    /// `None` **or** `Some(Duration::ZERO)` means wait indefinitely. Zero
    /// never means fail-fast; call sites rely on the indefinite-wait
    /// default.
    ///
    /// ## Errors
    /// - [`QueueError::TimedOut`] — no slot freed up in time; retryable.
    /// - [`QueueError::Canceled`] — the token fired while waiting.
    /// - [`QueueError::Closed`] — the queue is closed; terminal.
    ///
    /// The item is dropped on failure; retrying callers keep their own
    /// copy.
    pub async fn enqueue(
        &self,
        item: T,
        timeout: Option<Duration>,
        ctx: &CancellationToken,
    ) -> Result<(), QueueError> {
        let deadline = deadline_after(timeout);
        let permit = acquire(&self.slots, deadline, ctx).await?;
        {
            let mut inner = self.inner.lock().unwrap();
            // The queue may have closed between acquisition and here.
            if inner.closed {
                return Err(QueueError::Closed);
            }
            inner.buf.push_back(item);
        }
        // Capacity is now owned by the stored item; it returns to `slots`
        // when a consumer pops it.
        permit.forget();
        self.items.add_permits(1);
        Ok(())
    }

    /// Blocks until an item is available, the timeout elapses, the token
    /// fires, or the queue is closed with nothing left to drain.
    ///
    /// The timeout sentinel matches [`BoundedQueue::enqueue`]: `None` or
    /// zero waits indefinitely.
    ///
    /// ## Errors
    /// - [`QueueError::TimedOut`] — queue stayed empty; retryable.
    /// - [`QueueError::Canceled`] — the token fired while waiting.
    /// - [`QueueError::Closed`] — closed **and** drained; no item will
    ///   ever arrive again. Terminal: callers should stop using the queue.
    pub async fn dequeue(
        &self,
        timeout: Option<Duration>,
        ctx: &CancellationToken,
    ) -> Result<T, QueueError> {
        let deadline = deadline_after(timeout);
        loop {
            match acquire(&self.items, deadline, ctx).await {
                Ok(permit) => {
                    let popped = self.inner.lock().unwrap().buf.pop_front();
                    match popped {
                        Some(item) => {
                            permit.forget();
                            self.slots.add_permits(1);
                            return Ok(item);
                        }
                        // A post-close drain consumed the item this permit
                        // was minted for; the semaphore is closed now, so
                        // the next round takes the drain path below.
                        None => continue,
                    }
                }
                Err(QueueError::Closed) => {
                    let popped = self.inner.lock().unwrap().buf.pop_front();
                    return match popped {
                        Some(item) => Ok(item),
                        None => Err(QueueError::Closed),
                    };
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Closes the queue. Idempotent.
    ///
    /// Every blocked `enqueue`/`dequeue` is woken with a terminal outcome;
    /// no caller is left blocked. Pending items remain drainable.
    pub fn close(&self) {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.closed {
                return;
            }
            inner.closed = true;
        }
        // Wakes all blocked producers and consumers with AcquireError.
        self.slots.close();
        self.items.close();
    }
}

/// Converts the caller-facing timeout into an absolute deadline.
///
/// `None` or zero means no deadline (wait indefinitely).
fn deadline_after(timeout: Option<Duration>) -> Option<Instant> {
    match timeout {
        Some(d) if d > Duration::ZERO => Some(Instant::now() + d),
        _ => None,
    }
}

/// Waits for one permit, racing the deadline and the cancellation token.
async fn acquire(
    sem: &Arc<Semaphore>,
    deadline: Option<Instant>,
    ctx: &CancellationToken,
) -> Result<OwnedSemaphorePermit, QueueError> {
    let permit_future = sem.clone().acquire_owned();
    tokio::pin!(permit_future);

    match deadline {
        Some(at) => select! {
            res = &mut permit_future => res.map_err(|_closed| QueueError::Closed),
            _ = time::sleep_until(at) => Err(QueueError::TimedOut),
            _ = ctx.cancelled() => Err(QueueError::Canceled),
        },
        None => select! {
            res = &mut permit_future => res.map_err(|_closed| QueueError::Closed),
            _ = ctx.cancelled() => Err(QueueError::Canceled),
        },
    }
}
