//! Tests for FeedStore
//!
//! These tests verify:
//! - Reads serve the file content, cached after the first load
//! - Posts are appended in order and always visible to the next read
//! - A held reader blocks writers until dropped
//! - Concurrent readers never see a torn snapshot
//! - Load/append failures leave the cache empty

use std::fs;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use twtstore::config::{Config, SyncStrategy};
use twtstore::store::{FeedDb, FeedStore, FEED_FILENAME, FOLLOWERS_FILENAME};
use twtstore::TwtError;
use tempfile::TempDir;

const STATUS: &str = "2022-01-01T00:00:00Z\tI have a thought\n";
const NEXT_STATUS: &str = "2022-01-02T00:00:00Z\thello\n";

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_store_with(content: &str) -> (TempDir, FeedStore) {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join(FEED_FILENAME), content).unwrap();
    let store = FeedStore::open(temp_dir.path(), SyncStrategy::OsBuffered).unwrap();
    (temp_dir, store)
}

fn read_all(store: &FeedStore) -> String {
    let mut content = String::new();
    store.get().unwrap().read_to_string(&mut content).unwrap();
    content
}

// =============================================================================
// Open Tests
// =============================================================================

#[test]
fn test_open_creates_directory_and_files() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("feeds");

    let store = FeedStore::open(&data_dir, SyncStrategy::OsBuffered).unwrap();

    assert!(data_dir.join(FEED_FILENAME).exists());
    assert!(data_dir.join(FOLLOWERS_FILENAME).exists());
    assert_eq!(store.feed_path(), data_dir.join(FEED_FILENAME));
    assert_eq!(read_all(&store), "");
}

#[test]
fn test_open_does_not_truncate_existing_feed() {
    let (_temp, store) = setup_store_with(STATUS);
    assert_eq!(read_all(&store), STATUS);
}

#[test]
fn test_from_config_uses_data_dir() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .sync_strategy(SyncStrategy::EveryWrite)
        .build();

    let store = FeedStore::from_config(&config).unwrap();
    store.post_status(&mut STATUS.as_bytes()).unwrap();

    assert_eq!(
        fs::read_to_string(temp_dir.path().join(FEED_FILENAME)).unwrap(),
        STATUS
    );
}

// =============================================================================
// Read Tests
// =============================================================================

#[test]
fn test_get_returns_file_content() {
    let (_temp, store) = setup_store_with(STATUS);

    let reader = store.get().unwrap();

    assert_eq!(reader.as_bytes(), STATUS.as_bytes());
    assert_eq!(reader.len(), STATUS.len());
}

#[test]
fn test_get_populates_cache() {
    let (_temp, store) = setup_store_with(STATUS);
    assert!(!store.is_cached());

    drop(store.get().unwrap());

    assert!(store.is_cached());
}

#[test]
fn test_cached_content_served_without_touching_disk() {
    let (_temp, store) = setup_store_with(STATUS);
    assert_eq!(read_all(&store), STATUS);

    // Out-of-band edits are not the store's business until it is invalidated
    fs::write(store.feed_path(), "changed\n").unwrap();
    assert_eq!(read_all(&store), STATUS);

    store.invalidate();
    assert_eq!(read_all(&store), "changed\n");
}

#[test]
fn test_empty_feed_is_cached() {
    let (_temp, store) = setup_store_with("");

    let reader = store.get().unwrap();
    assert!(reader.is_empty());
    drop(reader);

    assert!(store.is_cached());
}

#[test]
fn test_reader_reads_in_small_chunks() {
    let (_temp, store) = setup_store_with(STATUS);
    let mut reader = store.get().unwrap();

    let mut buf = [0u8; 7];
    let mut collected = Vec::new();
    loop {
        let n = reader.read(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        collected.extend_from_slice(&buf[..n]);
    }

    assert_eq!(collected, STATUS.as_bytes());
    assert!(reader.remaining().is_empty());
}

#[test]
fn test_read_into_and_snapshot() {
    let (_temp, store) = setup_store_with(STATUS);

    let mut sink = Vec::new();
    let copied = store.read_into(&mut sink).unwrap();

    assert_eq!(copied, STATUS.len() as u64);
    assert_eq!(sink, STATUS.as_bytes());
    assert_eq!(&store.snapshot().unwrap()[..], STATUS.as_bytes());
}

#[test]
fn test_many_readers_share_the_lock() {
    let (_temp, store) = setup_store_with(STATUS);

    let first = store.get().unwrap();
    let second = store.get().unwrap();

    assert_eq!(first.as_bytes(), second.as_bytes());
}

// =============================================================================
// Write Tests
// =============================================================================

#[test]
fn test_post_then_get_scenario() {
    let (_temp, store) = setup_store_with(STATUS);
    assert_eq!(read_all(&store), STATUS);

    store.post_status(&mut NEXT_STATUS.as_bytes()).unwrap();

    assert_eq!(read_all(&store), format!("{STATUS}{NEXT_STATUS}"));
}

#[test]
fn test_post_invalidates_warm_cache() {
    let (_temp, store) = setup_store_with(STATUS);
    drop(store.get().unwrap());
    assert!(store.is_cached());

    store.post_status(&mut NEXT_STATUS.as_bytes()).unwrap();

    assert!(!store.is_cached());
    assert!(read_all(&store).ends_with(NEXT_STATUS));
}

#[test]
fn test_posts_are_appended_in_order() {
    let (_temp, store) = setup_store_with(STATUS);

    let mut expected = STATUS.to_string();
    for day in 2..=9 {
        let line = format!("2022-01-0{day}T00:00:00Z\tstatus {day}\n");
        store.post_status(&mut line.as_bytes()).unwrap();
        expected.push_str(&line);
        // Interleave reads so the cache is rebuilt between writes
        if day % 2 == 0 {
            assert_eq!(read_all(&store), expected);
        }
    }

    assert_eq!(read_all(&store), expected);
    assert_eq!(fs::read_to_string(store.feed_path()).unwrap(), expected);
}

#[test]
fn test_held_reader_blocks_writer() {
    let (_temp, store) = setup_store_with(STATUS);
    let store = Arc::new(store);
    let posted = Arc::new(AtomicBool::new(false));

    let reader = store.get().unwrap();

    let writer = {
        let store = Arc::clone(&store);
        let posted = Arc::clone(&posted);
        thread::spawn(move || {
            store.post_status(&mut NEXT_STATUS.as_bytes()).unwrap();
            posted.store(true, Ordering::SeqCst);
        })
    };

    thread::sleep(Duration::from_millis(100));
    assert!(!posted.load(Ordering::SeqCst), "writer ran while a reader held the lock");
    assert_eq!(reader.as_bytes(), STATUS.as_bytes());

    drop(reader);
    writer.join().unwrap();

    assert!(posted.load(Ordering::SeqCst));
    assert_eq!(read_all(&store), format!("{STATUS}{NEXT_STATUS}"));
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_get_missing_file_errors_and_retries() {
    let (_temp, store) = setup_store_with(STATUS);
    fs::remove_file(store.feed_path()).unwrap();

    assert!(matches!(store.get(), Err(TwtError::FeedLoad(_))));
    assert!(!store.is_cached());

    fs::write(store.feed_path(), STATUS).unwrap();
    assert_eq!(read_all(&store), STATUS);
}

#[test]
fn test_post_to_missing_file_errors_and_invalidates() {
    let (_temp, store) = setup_store_with(STATUS);
    drop(store.get().unwrap());
    fs::remove_file(store.feed_path()).unwrap();

    let result = store.post_status(&mut NEXT_STATUS.as_bytes());

    assert!(matches!(result, Err(TwtError::FeedAppend(_))));
    assert!(!store.is_cached());
    assert!(matches!(store.get(), Err(TwtError::FeedLoad(_))));
}

struct FailingReader {
    sent: bool,
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.sent {
            return Err(std::io::Error::new(std::io::ErrorKind::Other, "body broke"));
        }
        self.sent = true;
        let partial = b"2022-01-02T00:00:00Z\tpart";
        buf[..partial.len()].copy_from_slice(partial);
        Ok(partial.len())
    }
}

#[test]
fn test_partial_post_is_reconciled_from_disk() {
    let (_temp, store) = setup_store_with(STATUS);
    drop(store.get().unwrap());

    let result = store.post_status(&mut FailingReader { sent: false });

    assert!(matches!(result, Err(TwtError::FeedAppend(_))));
    // Whatever reached the file is what readers see, never the stale cache
    let on_disk = fs::read_to_string(store.feed_path()).unwrap();
    assert_eq!(read_all(&store), on_disk);
    assert!(on_disk.starts_with(STATUS));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_readers_never_see_torn_writes() {
    let (_temp, store) = setup_store_with(STATUS);
    let store = Arc::new(store);

    const WRITERS: usize = 4;
    const POSTS: usize = 25;
    const READERS: usize = 4;
    let barrier = Arc::new(Barrier::new(WRITERS + READERS));
    let done = Arc::new(AtomicBool::new(false));

    let writers: Vec<_> = (0..WRITERS)
        .map(|w| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..POSTS {
                    let line = format!("2022-02-01T00:00:00Z\twriter {w} post {i:03} {}\n", "x".repeat(64));
                    store.post_status(&mut line.as_bytes()).unwrap();
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                barrier.wait();
                let mut previous = String::new();
                while !done.load(Ordering::SeqCst) {
                    let snapshot = read_all(&store);
                    assert!(snapshot.starts_with(STATUS));
                    assert!(snapshot.ends_with('\n'), "torn snapshot");
                    for line in snapshot.lines().skip(1) {
                        assert!(line.ends_with(&"x".repeat(64)), "interleaved line: {line}");
                    }
                    // Append-only: every snapshot extends the one before it
                    assert!(snapshot.starts_with(&previous));
                    previous = snapshot;
                }
            })
        })
        .collect();

    for writer in writers {
        writer.join().unwrap();
    }
    done.store(true, Ordering::SeqCst);
    for reader in readers {
        reader.join().unwrap();
    }

    let final_content = read_all(&store);
    assert_eq!(final_content.lines().count(), 1 + WRITERS * POSTS);
    for w in 0..WRITERS {
        let posts: Vec<_> = final_content
            .lines()
            .filter(|l| l.contains(&format!("writer {w} ")))
            .collect();
        // Each writer's own posts keep their submission order
        let mut sorted = posts.clone();
        sorted.sort();
        assert_eq!(posts, sorted);
        assert_eq!(posts.len(), POSTS);
    }
}

// =============================================================================
// FeedDb Trait Tests
// =============================================================================

#[test]
fn test_feed_db_trait_object() {
    let (_temp, store) = setup_store_with(STATUS);
    let db: Arc<dyn FeedDb> = Arc::new(store);

    db.post_status(&mut NEXT_STATUS.as_bytes()).unwrap();
    let mut content = String::new();
    db.get().unwrap().read_to_string(&mut content).unwrap();

    assert_eq!(content, format!("{STATUS}{NEXT_STATUS}"));
}
