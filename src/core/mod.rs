//! Runtime core: supervised execution and lifecycle.
//!
//! Internal modules:
//! - [`worker`]: drives one work unit's supervised loop (start/stop state
//!   machine, per-iteration failure isolation);
//! - [`supervisor`]: spawns a worker per work unit and handles graceful
//!   shutdown;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod shutdown;
mod supervisor;
mod worker;

pub use supervisor::Supervisor;
pub use worker::{Worker, WorkerParams};
