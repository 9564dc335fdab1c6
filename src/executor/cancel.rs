//! Cancellation tokens
//!
//! A cooperative cancellation signal with optional deadline, derivable into
//! children that observe their parent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cooperative cancellation signal handed to every task
///
/// Cancelled when [`cancel`](Self::cancel) is called on it or any ancestor, or
/// once its (or any ancestor's) deadline passes. Tasks are expected to poll
/// [`is_cancelled`](Self::is_cancelled); nothing is interrupted forcibly.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<TokenInner>,
}

#[derive(Debug, Default)]
struct TokenInner {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
    parent: Option<CancelToken>,
}

impl CancelToken {
    /// A token that is only cancelled explicitly
    pub fn new() -> Self {
        Self::default()
    }

    /// A root token that expires after `timeout`
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::derive(None, timeout)
    }

    /// A child that expires after `timeout` or when `self` is cancelled
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        Self::derive(Some(self.clone()), timeout)
    }

    fn derive(parent: Option<CancelToken>, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                deadline: Instant::now().checked_add(timeout),
                parent,
            }),
        }
    }

    /// Trigger this token and every child derived from it
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    /// Has this token been cancelled or expired?
    pub fn is_cancelled(&self) -> bool {
        if self.inner.cancelled.load(Ordering::Acquire) {
            return true;
        }
        if matches!(self.inner.deadline, Some(deadline) if Instant::now() >= deadline) {
            return true;
        }
        self.inner
            .parent
            .as_ref()
            .is_some_and(CancelToken::is_cancelled)
    }

    /// Earliest deadline along the ancestor chain
    pub fn deadline(&self) -> Option<Instant> {
        let parent = self.inner.parent.as_ref().and_then(CancelToken::deadline);
        match (self.inner.deadline, parent) {
            (Some(own), Some(parent)) => Some(own.min(parent)),
            (own, parent) => own.or(parent),
        }
    }

    /// Time left before the deadline, `None` if there is no deadline
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}
