//! # Function-backed work unit (`StepFn`)
//!
//! [`StepFn`] wraps a closure `F: Fn(CancellationToken) -> Fut`, producing
//! a fresh future per iteration. This avoids shared mutable state: each
//! call owns its own future, and restarts carry nothing over. If a loop
//! needs shared state, move an `Arc<...>` into the closure explicitly.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use conveyor::{Control, RunnableRef, StepFn, TaskError};
//!
//! let unit: RunnableRef = StepFn::arc("worker", |ctx: CancellationToken| async move {
//!     if ctx.is_cancelled() {
//!         return Ok(Control::Stop);
//!     }
//!     // do work...
//!     Ok::<_, TaskError>(Control::Continue)
//! });
//!
//! assert_eq!(unit.name(), "worker");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::task::{Control, Runnable};

/// Function-backed work unit.
///
/// Wraps a closure that *creates* a new future per iteration.
#[derive(Debug)]
pub struct StepFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> StepFn<F> {
    /// Creates a new function-backed work unit.
    ///
    /// Prefer [`StepFn::arc`] when you immediately need a
    /// [`RunnableRef`](crate::RunnableRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self { name: name.into(), f }
    }

    /// Creates the work unit and returns it as a shared handle
    /// (`Arc<dyn Runnable>`).
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Runnable for StepFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<Control, TaskError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn step(&self, ctx: &CancellationToken) -> Result<Control, TaskError> {
        (self.f)(ctx.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::task::RunnableRef;

    #[tokio::test]
    async fn test_step_fn_runs_closure() {
        let unit: RunnableRef = StepFn::arc("demo", |_ctx: CancellationToken| async move {
            Ok::<_, TaskError>(Control::Continue)
        });
        let ctx = CancellationToken::new();
        assert_eq!(unit.step(&ctx).await.unwrap(), Control::Continue);
        assert_eq!(unit.name(), "demo");
    }

    #[tokio::test]
    async fn test_step_fn_observes_cancellation() {
        let unit: RunnableRef = StepFn::arc("cancelable", |ctx: CancellationToken| async move {
            if ctx.is_cancelled() {
                return Ok(Control::Stop);
            }
            Ok::<_, TaskError>(Control::Continue)
        });
        let ctx = CancellationToken::new();
        ctx.cancel();
        assert_eq!(unit.step(&ctx).await.unwrap(), Control::Stop);
    }
}
