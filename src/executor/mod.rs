//! Executor Module
//!
//! Bounded background execution for slow side-work (follower logging).
//!
//! ## Architecture
//! - Fixed set of worker threads started up front
//! - One shared zero-capacity hand-off channel (no backlog)
//! - Per-worker stop channel
//! - Every accepted task gets its own [`CancelToken`] with a fixed budget
//!
//! ```text
//!   enqueue(deadline) ──► bounded(0) ──┬──► worker 0
//!                                      ├──► worker 1
//!                                      └──► worker N-1
//! ```

mod cancel;
mod runner;
mod worker;

use std::time::Duration;

use crate::error::Result;

pub use cancel::CancelToken;
pub use runner::TaskRunner;

/// Execution budget a worker gives each task unless configured otherwise
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(60);

/// A unit of deferred work
///
/// Reports success or failure only through its own side effects.
pub type Task = Box<dyn FnOnce(&CancelToken) + Send + 'static>;

/// The enqueue contract consumed by the request handler
pub trait Enqueue: Send + Sync {
    /// Hand off `task`, failing with `EnqueueTimeout` if no worker takes it in time
    fn enqueue(&self, timeout: Duration, task: Task) -> Result<()>;
}
