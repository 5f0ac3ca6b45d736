//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for plugging custom event handlers
//! into the runtime. Subscribers are driven by the
//! [`SubscriberSet`](crate::SubscriberSet) listener fed from the
//! [`Bus`](crate::Bus).
//!
//! ## Contract
//! - Implementations should avoid long blocking work: subscribers on one
//!   listener share a lane, and a slow handler delays the others.
//! - Panics inside a subscriber are caught and logged; they never reach
//!   the workers.

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event subscribers.
///
/// Called from the listener task. Implementations should prefer async
/// I/O and cooperative waits over blocking the runtime.
///
/// ## Example
/// ```rust
/// use async_trait::async_trait;
/// use conveyor::{Event, Subscribe};
///
/// struct Audit;
///
/// #[async_trait]
/// impl Subscribe for Audit {
///     async fn on_event(&self, event: &Event) {
///         // write audit record...
///         let _ = event;
///     }
///
///     fn name(&self) -> &'static str { "audit" }
/// }
/// ```
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event.
    ///
    /// # Parameters
    /// - `event`: Reference to the event (does not transfer ownership)
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs/metrics).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
