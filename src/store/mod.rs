//! Store Module
//!
//! Cache-coherent access to the single feed file plus the follower log.
//!
//! ## Responsibilities
//! - Serve cached snapshots of the feed to many concurrent readers
//! - Serialize appends and invalidate the cache before touching the file
//! - Append follower records to an independent log
//!
//! ## Concurrency Model
//! ```text
//!   readers ──► RwLock (shared) ──► cache: Option<Bytes>
//!                                        │ None ⇒ reload from twtxt.txt
//!   writers ──► RwLock (exclusive) ──► cache = None ──► append twtxt.txt
//!
//!   followers ──► Mutex<File> ──► followers.log   (independent domain)
//! ```

mod feed;
mod reader;
mod followers;

use std::io::Read;

use crate::error::Result;

pub use feed::FeedStore;
pub use reader::FeedReader;
pub use followers::FollowerLog;

/// File name of the feed inside the data directory
pub const FEED_FILENAME: &str = "twtxt.txt";

/// File name of the follower log inside the data directory
pub const FOLLOWERS_FILENAME: &str = "followers.log";

/// The store contract consumed by the request handler
///
/// Implemented by [`FeedStore`]; tests substitute fakes.
pub trait FeedDb: Send + Sync {
    /// Readable view of the current feed; dropping it releases any lock it holds
    fn get(&self) -> Result<Box<dyn Read + '_>>;

    /// Append a status stream to the feed
    fn post_status(&self, status: &mut dyn Read) -> Result<()>;

    /// Append one line to the follower log
    fn log_follower(&self, entry: &str) -> Result<()>;
}
