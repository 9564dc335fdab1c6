//! Task runner
//!
//! Fixed pool of workers fed through a zero-capacity hand-off channel.

use std::time::{Duration, Instant};

use crossbeam::channel::{self, SendTimeoutError, Sender};
use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{Result, TwtError};

use super::worker::Worker;
use super::{CancelToken, Enqueue, Task, DEFAULT_TASK_TIMEOUT};

/// Bounded executor for short deferred tasks
///
/// ## Backpressure:
/// - The task channel has no buffer: `enqueue` returns only once an idle
///   worker has taken the task, or fails with [`TwtError::EnqueueTimeout`]
///   when the deadline passes first.
/// - At most `worker_count()` tasks execute at once and nothing queues behind
///   them, so overload shows up at the submitter.
pub struct TaskRunner {
    /// Sending half of the hand-off channel (workers own the receivers)
    tasks: Sender<Task>,

    /// Running workers; emptied by `stop`
    workers: Mutex<Vec<Worker>>,

    /// Number of workers started
    worker_count: usize,
}

impl TaskRunner {
    /// Start `workers` threads, each giving accepted tasks `task_timeout` to run
    ///
    /// With zero workers every submission fails with `ExecutorStopped`.
    pub fn new(workers: usize, task_timeout: Duration) -> Result<Self> {
        let (tasks, task_rx) = channel::bounded::<Task>(0);

        let mut pool = Vec::with_capacity(workers);
        for id in 0..workers {
            pool.push(Worker::spawn(id, task_rx.clone(), task_timeout)?);
        }

        tracing::debug!(workers, ?task_timeout, "task runner started");

        Ok(Self {
            tasks,
            workers: Mutex::new(pool),
            worker_count: workers,
        })
    }

    /// Start `workers` threads with the default one-minute budget
    pub fn with_workers(workers: usize) -> Result<Self> {
        Self::new(workers, DEFAULT_TASK_TIMEOUT)
    }

    /// Start a runner from the executor settings of a [`Config`]
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.workers, config.task_timeout)
    }

    /// Hand `task` to an idle worker, waiting at most `timeout`
    pub fn enqueue<F>(&self, timeout: Duration, task: F) -> Result<()>
    where
        F: FnOnce(&CancelToken) + Send + 'static,
    {
        self.submit(timeout, Box::new(task))
    }

    /// Hand `task` to an idle worker, waiting until `deadline` at the latest
    pub fn enqueue_until<F>(&self, deadline: Instant, task: F) -> Result<()>
    where
        F: FnOnce(&CancelToken) + Send + 'static,
    {
        self.submit_until(deadline, Box::new(task))
    }

    fn submit(&self, timeout: Duration, task: Task) -> Result<()> {
        match self.tasks.send_timeout(task, timeout) {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => Err(TwtError::EnqueueTimeout),
            Err(SendTimeoutError::Disconnected(_)) => Err(TwtError::ExecutorStopped),
        }
    }

    fn submit_until(&self, deadline: Instant, task: Task) -> Result<()> {
        match self.tasks.send_deadline(task, deadline) {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => Err(TwtError::EnqueueTimeout),
            Err(SendTimeoutError::Disconnected(_)) => Err(TwtError::ExecutorStopped),
        }
    }

    /// Stop every worker and wait for each to exit
    ///
    /// Idle workers stop immediately; a worker that is executing stops after its
    /// task returns. A task that never returns makes this call block forever.
    /// Calling `stop` again is a no-op.
    pub fn stop(&self) {
        let mut workers = std::mem::take(&mut *self.workers.lock());
        if workers.is_empty() {
            return;
        }

        for worker in &workers {
            worker.signal_stop();
        }
        for worker in &mut workers {
            worker.join();
        }

        tracing::debug!(workers = workers.len(), "task runner stopped");
    }

    /// Number of workers the runner was started with
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Whether `stop` has run
    pub fn is_stopped(&self) -> bool {
        self.workers.lock().is_empty()
    }
}

impl Enqueue for TaskRunner {
    fn enqueue(&self, timeout: Duration, task: Task) -> Result<()> {
        self.submit(timeout, task)
    }
}

impl Drop for TaskRunner {
    fn drop(&mut self) {
        self.stop();
    }
}
