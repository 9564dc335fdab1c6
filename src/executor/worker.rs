//! Worker
//!
//! A single execution context pulling tasks off the shared hand-off channel.
//!
//! ## States
//! ```text
//!   Idle ──task──► Executing ──done/budget──► Idle
//!   Idle ──stop──► Stopped
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender};
use crossbeam::select;

use crate::error::Result;

use super::{CancelToken, Task};

/// Handle the runner keeps for each worker thread
pub(super) struct Worker {
    id: usize,
    stop: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawn a worker blocked on either a task hand-off or a stop signal
    pub(super) fn spawn(id: usize, tasks: Receiver<Task>, task_timeout: Duration) -> Result<Self> {
        let (stop, stop_rx) = channel::bounded(0);
        let handle = thread::Builder::new()
            .name(format!("twt-worker-{id}"))
            .spawn(move || run_loop(id, tasks, stop_rx, task_timeout))?;

        Ok(Self {
            id,
            stop,
            handle: Some(handle),
        })
    }

    /// Deliver the stop signal; blocks until the worker is between tasks
    pub(super) fn signal_stop(&self) {
        // A disconnected channel means the thread is already gone.
        let _ = self.stop.send(());
    }

    /// Wait for the worker thread to exit
    pub(super) fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::debug!(worker = self.id, "worker thread panicked");
            }
        }
    }
}

fn run_loop(id: usize, tasks: Receiver<Task>, stop: Receiver<()>, task_timeout: Duration) {
    tracing::trace!(worker = id, "worker started");
    loop {
        select! {
            recv(tasks) -> task => match task {
                Ok(task) => execute(id, task, task_timeout),
                // Runner dropped its sender
                Err(_) => break,
            },
            recv(stop) -> _ => break,
        }
    }
    tracing::trace!(worker = id, "worker stopped");
}

/// Run one task under a fresh execution budget
///
/// The budget is only a signal: a task that ignores it keeps this worker busy
/// until it returns.
fn execute(id: usize, task: Task, task_timeout: Duration) {
    let token = CancelToken::with_timeout(task_timeout);
    let started = Instant::now();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| task(&token)));
    if outcome.is_err() {
        tracing::debug!(worker = id, "task panicked");
    }

    if token.is_cancelled() {
        tracing::debug!(
            worker = id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "task overran its execution budget"
        );
    }
}
