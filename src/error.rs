//! Error types for twtstore
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using TwtError
pub type Result<T> = std::result::Result<T, TwtError>;

/// Unified error type for twtstore operations
#[derive(Debug, Error)]
pub enum TwtError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    /// The feed could not be loaded into the cache; the cache stays empty.
    #[error("failed to load feed: {0}")]
    FeedLoad(#[source] std::io::Error),

    /// Appending to the feed failed; the cache was already invalidated.
    #[error("failed to append to feed: {0}")]
    FeedAppend(#[source] std::io::Error),

    #[error("failed to log follower: {0}")]
    FollowerLog(#[source] std::io::Error),

    // -------------------------------------------------------------------------
    // Executor Errors
    // -------------------------------------------------------------------------
    /// No worker accepted the task before the submission deadline.
    #[error("timeout enqueuing task")]
    EnqueueTimeout,

    #[error("task runner is stopped")]
    ExecutorStopped,

    // -------------------------------------------------------------------------
    // Request Errors
    // -------------------------------------------------------------------------
    #[error("unauthorized")]
    Unauthorized,

    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("invalid media type: {0}")]
    InvalidMediaType(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
