//! Configuration for twtstore
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crate::auth::Credentials;
use crate::error::{Result, TwtError};

/// Main configuration for a twtstore instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── twtxt.txt        (the feed, append-only)
    ///     └── followers.log    (follower audit log)
    pub data_dir: PathBuf,

    /// Sync strategy: whether appends are fsynced
    pub sync_strategy: SyncStrategy,

    // -------------------------------------------------------------------------
    // Executor Configuration
    // -------------------------------------------------------------------------
    /// Number of background workers
    pub workers: usize,

    /// Execution budget handed to every accepted task
    pub task_timeout: Duration,

    /// How long a request waits for a free worker before dropping its follow-up
    pub enqueue_timeout: Duration,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds)
    pub write_timeout_ms: u64,

    /// Credentials required to post; `None` leaves posting open
    pub credentials: Option<Credentials>,
}

/// Feed sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// Leave flushing to the OS (plain append semantics)
    OsBuffered,

    /// fsync the feed after every append
    EveryWrite,
}

/// Half the available parallelism, rounded up
pub fn default_workers() -> usize {
    let cpus = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    cpus.div_ceil(2).max(1)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            sync_strategy: SyncStrategy::OsBuffered,
            workers: default_workers(),
            task_timeout: Duration::from_secs(60),
            enqueue_timeout: Duration::from_secs(10),
            listen_addr: "127.0.0.1:8080".to_string(),
            max_connections: 1024,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
            credentials: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the store, runner or server cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(TwtError::Config("workers must be at least 1".to_string()));
        }
        if self.task_timeout.is_zero() {
            return Err(TwtError::Config("task timeout must be non-zero".to_string()));
        }
        if self.enqueue_timeout.is_zero() {
            return Err(TwtError::Config("enqueue timeout must be non-zero".to_string()));
        }
        if self.max_connections == 0 {
            return Err(TwtError::Config(
                "max connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the feed sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Set the number of background workers
    pub fn workers(mut self, count: usize) -> Self {
        self.config.workers = count;
        self
    }

    /// Set the per-task execution budget
    pub fn task_timeout(mut self, timeout: Duration) -> Self {
        self.config.task_timeout = timeout;
        self
    }

    /// Set the hand-off deadline used for follow-up tasks
    pub fn enqueue_timeout(mut self, timeout: Duration) -> Self {
        self.config.enqueue_timeout = timeout;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Require these credentials for posting
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.config.credentials = Some(credentials);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
