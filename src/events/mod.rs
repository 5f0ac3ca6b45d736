//! # Runtime events and the bus they travel on.
//!
//! Queue workers and the supervisor publish lifecycle [`Event`]s to a
//! shared [`Bus`]; subscribers consume them for logging, metrics, or
//! tests. Publishing is non-blocking and fire-and-forget.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
