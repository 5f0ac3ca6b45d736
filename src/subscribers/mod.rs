//! # Event subscribers.
//!
//! Extension point for consuming runtime [`Event`](crate::events::Event)s:
//! - [`Subscribe`] - trait for custom event handlers
//! - [`SubscriberSet`] - fan-out listener over a [`Bus`](crate::events::Bus)
//! - [`LogWriter`] - simple stdout sink for debugging and demos

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
