//! # twtstore
//!
//! A small twtxt feed server built around two concurrent components:
//! - A cache-coherent single-file store (many readers, serialized writers)
//! - A bounded task executor with synchronous hand-off and backpressure
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │                  (Multiple Clients)                          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Service                                 │
//! │        (fetch feed, post status, follower follow-up)         │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │ sync                             │ async hand-off
//!            ▼                                  ▼
//!   ┌─────────────────┐                ┌─────────────────┐
//!   │    FeedStore    │◄───────────────│   TaskRunner    │
//!   │ (RwLock + cache)│  log_follower  │  (N workers)    │
//!   └────────┬────────┘                └─────────────────┘
//!            │
//!            ▼
//!   ┌─────────────────┐
//!   │ twtxt.txt       │
//!   │ followers.log   │
//!   └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod store;
pub mod executor;
pub mod follower;
pub mod auth;
pub mod service;
pub mod protocol;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{TwtError, Result};
pub use config::Config;
pub use store::{FeedDb, FeedStore};
pub use executor::{Enqueue, TaskRunner};
pub use service::Service;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of twtstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
