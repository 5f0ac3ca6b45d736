//! # Bounded producer-consumer queue.
//!
//! [`BoundedQueue`] is the crate's leaf primitive: a fixed-capacity async
//! FIFO channel with blocking-with-timeout semantics, cooperative
//! cancellation, and explicit shutdown via `close()`.

mod bounded;

pub use bounded::BoundedQueue;
