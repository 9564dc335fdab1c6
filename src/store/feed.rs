//! Feed store
//!
//! The cache-coherent single-file store backing `twtxt.txt`.

use std::fs::{self, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use parking_lot::{RwLock, RwLockWriteGuard};

use crate::config::{Config, SyncStrategy};
use crate::error::{Result, TwtError};

use super::{FeedDb, FeedReader, FollowerLog, FEED_FILENAME, FOLLOWERS_FILENAME};

/// Single-file feed store with a lazily loaded in-memory cache
///
/// ## Concurrency:
/// - `cache`: Protected by RwLock (many concurrent readers, exclusive writer)
/// - `None` means "must be reloaded from disk"; `Some` is an exact mirror of the
///   file as of the last load. Writers clear it before appending, under the same
///   exclusive lock, so a cached snapshot never diverges from durable content.
/// - The follower log lives in its own locking domain.
///
/// A thread holding a [`FeedReader`] must drop it before calling
/// [`post_status`](Self::post_status), or it will deadlock on itself.
pub struct FeedStore {
    /// Path of the feed file
    feed_path: PathBuf,

    /// Cached feed content, guarded for readers/writers
    cache: RwLock<Option<Bytes>>,

    /// Whether appends are fsynced
    sync_strategy: SyncStrategy,

    /// Independent follower audit log
    followers: FollowerLog,
}

impl FeedStore {
    /// Open or create the store inside `data_dir`
    ///
    /// On startup:
    /// 1. Create data directory if it doesn't exist
    /// 2. Create an empty feed if there is none (never truncates)
    /// 3. Open the follower log for appending
    ///
    /// The cache starts empty and is filled by the first read.
    pub fn open(data_dir: &Path, sync_strategy: SyncStrategy) -> Result<Self> {
        fs::create_dir_all(data_dir)?;

        let feed_path = data_dir.join(FEED_FILENAME);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&feed_path)?;

        let followers = FollowerLog::open(&data_dir.join(FOLLOWERS_FILENAME))?;

        tracing::debug!(path = %feed_path.display(), "feed store opened");

        Ok(Self {
            feed_path,
            cache: RwLock::new(None),
            sync_strategy,
            followers,
        })
    }

    /// Open using the storage settings of a [`Config`]
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::open(&config.data_dir, config.sync_strategy)
    }

    /// Get a read handle over the current feed
    ///
    /// Steps:
    /// 1. Take shared access; serve the cache if it is loaded
    /// 2. Otherwise release, take exclusive access and re-check
    /// 3. Load the file if still needed
    /// 4. Downgrade atomically to shared access and hand it to the reader
    ///
    /// A load failure leaves the cache empty so the next call retries.
    pub fn get(&self) -> Result<FeedReader<'_>> {
        let guard = self.cache.read();
        if guard.is_some() {
            return Ok(FeedReader::new(guard));
        }
        drop(guard);

        let mut guard = self.cache.write();
        if guard.is_none() {
            *guard = Some(self.load()?);
        }
        Ok(FeedReader::new(RwLockWriteGuard::downgrade(guard)))
    }

    /// Copy the current feed into `sink`, holding shared access only while copying
    pub fn read_into<W: Write + ?Sized>(&self, sink: &mut W) -> Result<u64> {
        let mut reader = self.get()?;
        Ok(io::copy(&mut reader, sink)?)
    }

    /// Owned copy of the current feed
    pub fn snapshot(&self) -> Result<Bytes> {
        let reader = self.get()?;
        Ok(Bytes::copy_from_slice(reader.as_bytes()))
    }

    /// Append a status stream to the feed
    ///
    /// The cache is cleared before the file is opened, so even a partial append
    /// forces the next reader to reconcile with what actually reached disk.
    pub fn post_status<R: Read + ?Sized>(&self, status: &mut R) -> Result<()> {
        let mut cache = self.cache.write();
        *cache = None;

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.feed_path)
            .map_err(TwtError::FeedAppend)?;

        let written = io::copy(status, &mut file).map_err(TwtError::FeedAppend)?;

        if self.sync_strategy == SyncStrategy::EveryWrite {
            file.sync_data().map_err(TwtError::FeedAppend)?;
        }

        tracing::trace!(bytes = written, "status appended");
        Ok(())
    }

    /// Append one entry to the follower log
    pub fn log_follower(&self, entry: &str) -> Result<()> {
        self.followers.append(entry)
    }

    /// Whether the cache currently holds a snapshot
    pub fn is_cached(&self) -> bool {
        self.cache.read().is_some()
    }

    /// Drop the cached snapshot; the next read reloads from disk
    pub fn invalidate(&self) {
        *self.cache.write() = None;
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Path of the feed file
    pub fn feed_path(&self) -> &Path {
        &self.feed_path
    }

    /// Path of the follower log
    pub fn followers_path(&self) -> &Path {
        self.followers.path()
    }

    /// Read the full feed file (called with the write lock held)
    fn load(&self) -> Result<Bytes> {
        let content = fs::read(&self.feed_path).map_err(TwtError::FeedLoad)?;
        tracing::debug!(bytes = content.len(), "feed loaded into cache");
        Ok(Bytes::from(content))
    }
}

impl FeedDb for FeedStore {
    fn get(&self) -> Result<Box<dyn Read + '_>> {
        Ok(Box::new(FeedStore::get(self)?))
    }

    fn post_status(&self, status: &mut dyn Read) -> Result<()> {
        FeedStore::post_status(self, status)
    }

    fn log_follower(&self, entry: &str) -> Result<()> {
        FeedStore::log_follower(self, entry)
    }
}
