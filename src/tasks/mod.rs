//! # Work-unit abstractions.
//!
//! This module provides the core work-unit types:
//! - [`Runnable`] - trait for implementing supervised loop bodies
//! - [`StepFn`] - function-backed work unit
//! - [`QueueDrain`] - ready-made dequeue-and-handle work unit
//! - [`RunnableRef`] - shared reference to a work unit (`Arc<dyn Runnable>`)

mod drain;
mod task;
mod task_fn;

pub use drain::QueueDrain;
pub use task::{Control, ErrorDisposition, Runnable, RunnableRef};
pub use task_fn::StepFn;
