//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format.
//! This is primarily useful for development, debugging, and examples.
//!
//! ## Output format
//! ```text
//! [starting] task=drain-0
//! [iteration-failed] task=drain-0 iteration=3 err="execution failed: boom"
//! [iteration-panicked] task=drain-0 iteration=4 reason="index out of bounds"
//! [step-timeout] task=drain-0 iteration=5 timeout_ms=250
//! [stopped] task=drain-0 iterations=17
//! [shutdown-requested]
//! [all-stopped-within-grace]
//! [grace-exceeded]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Simple stdout logging subscriber.
///
/// Not intended for production use - implement a custom [`Subscribe`]
/// for structured logging or metrics collection.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::TaskStarting => {
                if let Some(task) = &e.task {
                    println!("[starting] task={task}");
                }
            }
            EventKind::TaskStopped => {
                println!(
                    "[stopped] task={} iterations={}",
                    e.task.as_deref().unwrap_or("?"),
                    e.iteration.unwrap_or(0)
                );
            }
            EventKind::IterationFailed => {
                println!(
                    "[iteration-failed] task={} iteration={} err={:?}",
                    e.task.as_deref().unwrap_or("?"),
                    e.iteration.unwrap_or(0),
                    e.reason.as_deref().unwrap_or("")
                );
            }
            EventKind::IterationPanicked => {
                println!(
                    "[iteration-panicked] task={} iteration={} reason={:?}",
                    e.task.as_deref().unwrap_or("?"),
                    e.iteration.unwrap_or(0),
                    e.reason.as_deref().unwrap_or("")
                );
            }
            EventKind::StepTimeout => {
                println!(
                    "[step-timeout] task={} iteration={} timeout_ms={}",
                    e.task.as_deref().unwrap_or("?"),
                    e.iteration.unwrap_or(0),
                    e.timeout_ms.unwrap_or(0)
                );
            }
            EventKind::ShutdownRequested => {
                println!("[shutdown-requested]");
            }
            EventKind::AllStoppedWithin => {
                println!("[all-stopped-within-grace]");
            }
            EventKind::GraceExceeded => {
                println!("[grace-exceeded]");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
