//! Feed reader
//!
//! A read handle over the cached feed that owns a shared lock guard.

use std::io::{self, Read};

use bytes::Bytes;
use parking_lot::RwLockReadGuard;

/// Read handle returned by [`FeedStore::get`](super::FeedStore::get)
///
/// Holds shared access to the cache for as long as it lives, so no writer can
/// invalidate the snapshot mid-read. Dropping the reader releases the lock.
pub struct FeedReader<'a> {
    guard: RwLockReadGuard<'a, Option<Bytes>>,
    position: usize,
}

impl<'a> FeedReader<'a> {
    /// Wrap a guard whose cache is known to be populated
    pub(super) fn new(guard: RwLockReadGuard<'a, Option<Bytes>>) -> Self {
        debug_assert!(guard.is_some(), "feed reader over an unloaded cache");
        Self { guard, position: 0 }
    }

    /// The whole snapshot, regardless of how much has been read
    pub fn as_bytes(&self) -> &[u8] {
        self.guard.as_deref().unwrap_or_default()
    }

    /// Total snapshot length in bytes
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes not yet consumed through `Read`
    pub fn remaining(&self) -> &[u8] {
        &self.as_bytes()[self.position..]
    }
}

impl Read for FeedReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = {
            let remaining = self.remaining();
            let n = remaining.len().min(buf.len());
            buf[..n].copy_from_slice(&remaining[..n]);
            n
        };
        self.position += n;
        Ok(n)
    }
}

impl std::fmt::Debug for FeedReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedReader")
            .field("len", &self.len())
            .field("position", &self.position)
            .finish()
    }
}
