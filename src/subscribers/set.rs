//! # SubscriberSet: fan-out of bus events to subscribers.
//!
//! [`SubscriberSet`] delivers each [`Event`] from the bus to every
//! subscriber, in registration order, from a single listener task.
//!
//! ## What it guarantees
//! - FIFO delivery per subscriber (bus order).
//! - Panics inside subscribers are caught and logged (isolation).
//!
//! ## What it does **not** guarantee
//! - Throughput under slow subscribers: delivery is sequential, and a
//!   listener that falls behind the bus capacity skips the oldest
//!   events (broadcast lag). The runtime emits low-rate lifecycle
//!   events, so this trade keeps the machinery small.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::broadcast::error::RecvError;

use crate::events::{Bus, Event};

use super::Subscribe;

/// Fan-out over a fixed set of subscribers.
pub struct SubscriberSet {
    subs: Vec<Arc<dyn Subscribe>>,
}

impl SubscriberSet {
    /// Creates a new set.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>) -> Self {
        Self { subs }
    }

    /// Subscribes to the bus and spawns the listener task.
    ///
    /// No-op for an empty set. The listener runs until the bus is
    /// dropped; call once per supervisor run.
    pub fn listen(self: Arc<Self>, bus: &Bus) {
        if self.subs.is_empty() {
            return;
        }
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => self.deliver(&ev).await,
                    // Skipped over lagged items; keep consuming.
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    /// Delivers one event to all subscribers, isolating panics.
    async fn deliver(&self, event: &Event) {
        for sub in &self.subs {
            let fut = sub.on_event(event);
            if let Err(panic_err) = AssertUnwindSafe(fut).catch_unwind().await {
                eprintln!(
                    "[conveyor] subscriber '{}' panicked: {:?}",
                    sub.name(),
                    panic_err
                );
            }
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subs.len()
    }
}
