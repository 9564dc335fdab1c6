//! Tests for Service
//!
//! These tests verify:
//! - Feed fetches and the follower follow-up task
//! - Status posting: auth, media types, store failures
//! - Error reporting through ServiceLog
//! - The service wired to a real FeedStore and TaskRunner

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use twtstore::auth::Credentials;
use twtstore::config::{Config, SyncStrategy};
use twtstore::executor::{Enqueue, TaskRunner};
use twtstore::service::{Service, TracingLog, FEED_MEDIA_TYPE};
use twtstore::store::{FeedDb, FeedStore};
use twtstore::TwtError;
use tempfile::TempDir;

use crate::helpers::{
    FailingIo, FakeDb, MockLog, NoopEnqueue, StubDb, SyncEnqueue, TimeoutEnqueue,
};

const STATUS: &str = "2022-01-01T00:00:00Z\tI have a thought\n";
const FOLLOWER_UA: &str = "twtxt/1.2.3 (+https://example.com/twtxt.txt; @somebody)";
const LIST_UA: &str =
    "twtxt-hub/0.1 (~https://hub.example.com/list.txt; contact=https://hub.example.com/contact)";

// =============================================================================
// Helper Functions
// =============================================================================

fn service(db: Arc<dyn FeedDb>, enqueue: Arc<dyn Enqueue>, log: Arc<MockLog>) -> Service {
    Service::new(db, enqueue, log)
}

fn fetch(service: &Service, user_agent: Option<&str>) -> String {
    let mut body = Vec::new();
    service.fetch_feed(user_agent, &mut body).unwrap();
    String::from_utf8(body).unwrap()
}

fn post(service: &Service, status: &str) -> twtstore::Result<()> {
    service.post_status(None, FEED_MEDIA_TYPE, &mut status.as_bytes())
}

// =============================================================================
// Posting Tests
// =============================================================================

#[test]
fn test_posted_statuses_can_be_read_back() {
    let svc = service(Arc::new(FakeDb::default()), Arc::new(NoopEnqueue), Arc::default());

    post(&svc, STATUS).unwrap();

    assert_eq!(fetch(&svc, None), STATUS);
}

#[test]
fn test_post_rejects_invalid_media_type() {
    let svc = service(Arc::new(StubDb::default()), Arc::new(NoopEnqueue), Arc::default());

    let result = svc.post_status(None, "", &mut STATUS.as_bytes());

    assert!(matches!(result, Err(TwtError::InvalidMediaType(_))));
}

#[test]
fn test_post_rejects_unsupported_media_type() {
    let svc = service(Arc::new(StubDb::default()), Arc::new(NoopEnqueue), Arc::default());

    let result = svc.post_status(None, "text/plain", &mut STATUS.as_bytes());

    assert!(matches!(result, Err(TwtError::UnsupportedMediaType(ref t)) if t == "text/plain"));
}

#[test]
fn test_post_accepts_both_twtxt_media_types() {
    let db = Arc::new(FakeDb::default());
    let svc = service(db, Arc::new(NoopEnqueue), Arc::default());

    svc.post_status(None, "text/vnd.twtxt", &mut STATUS.as_bytes()).unwrap();
    svc.post_status(None, "text/vnd.twtxt+plain; charset=utf-8", &mut STATUS.as_bytes())
        .unwrap();

    assert_eq!(fetch(&svc, None), format!("{STATUS}{STATUS}"));
}

#[test]
fn test_post_store_failure_is_returned_and_logged() {
    let log = Arc::new(MockLog::default());
    let db = StubDb {
        post_fails: true,
        ..Default::default()
    };
    let svc = service(Arc::new(db), Arc::new(NoopEnqueue), log.clone());

    let result = post(&svc, STATUS);

    assert!(matches!(result, Err(TwtError::FeedAppend(_))));
    assert_eq!(log.posting_status.lock().len(), 1);
    assert!(log.posting_status.lock()[0].contains("post err"));
}

// =============================================================================
// Auth Tests
// =============================================================================

#[test]
fn test_post_requires_credentials_when_configured() {
    let db = Arc::new(FakeDb::default());
    let svc = service(db.clone(), Arc::new(NoopEnqueue), Arc::default())
        .with_credentials(Credentials::new("alice", "s3cret"));
    assert!(svc.requires_auth());

    let missing = svc.post_status(None, FEED_MEDIA_TYPE, &mut STATUS.as_bytes());
    let wrong = svc.post_status(Some(("alice", "nope")), FEED_MEDIA_TYPE, &mut STATUS.as_bytes());

    assert!(matches!(missing, Err(TwtError::Unauthorized)));
    assert!(matches!(wrong, Err(TwtError::Unauthorized)));
    assert_eq!(fetch(&svc, None), "");

    svc.post_status(Some(("alice", "s3cret")), FEED_MEDIA_TYPE, &mut STATUS.as_bytes())
        .unwrap();
    assert_eq!(fetch(&svc, None), STATUS);
}

#[test]
fn test_auth_checked_before_media_type() {
    let svc = service(Arc::new(StubDb::default()), Arc::new(NoopEnqueue), Arc::default())
        .with_credentials(Credentials::new("alice", "s3cret"));

    let result = svc.post_status(None, "text/plain", &mut STATUS.as_bytes());

    assert!(matches!(result, Err(TwtError::Unauthorized)));
}

// =============================================================================
// Fetch Tests
// =============================================================================

#[test]
fn test_fetch_store_failure_is_returned_and_logged() {
    let log = Arc::new(MockLog::default());
    let db = StubDb {
        get_fails: true,
        ..Default::default()
    };
    let svc = service(Arc::new(db), Arc::new(SyncEnqueue), log.clone());

    let result = svc.fetch_feed(Some(FOLLOWER_UA), &mut Vec::new());

    assert!(matches!(result, Err(TwtError::FeedLoad(_))));
    assert_eq!(log.getting_feed.lock().len(), 1);
}

#[test]
fn test_fetch_read_failure_is_logged_as_body_error() {
    let log = Arc::new(MockLog::default());
    let db = StubDb {
        read_fails: true,
        ..Default::default()
    };
    let svc = service(Arc::new(db), Arc::new(NoopEnqueue), log.clone());

    let result = svc.fetch_feed(None, &mut Vec::new());

    assert!(result.is_err());
    assert_eq!(log.writing_body.lock().len(), 1);
    assert!(log.writing_body.lock()[0].contains("read err"));
}

#[test]
fn test_fetch_sink_failure_is_logged_as_body_error() {
    let log = Arc::new(MockLog::default());
    let db = Arc::new(FakeDb::default());
    let svc = service(db.clone(), Arc::new(SyncEnqueue), log.clone());
    post(&svc, STATUS).unwrap();

    let result = svc.fetch_feed(Some(FOLLOWER_UA), &mut FailingIo);

    assert!(result.is_err());
    assert_eq!(log.writing_body.lock().len(), 1);
    // No follow-up for a failed fetch
    assert!(db.followers.lock().is_empty());
}

#[test]
fn test_fetch_logs_single_follower() {
    let db = Arc::new(FakeDb::default());
    let svc = service(db.clone(), Arc::new(SyncEnqueue), Arc::default());

    fetch(&svc, Some(FOLLOWER_UA));

    assert_eq!(*db.followers.lock(), vec![FOLLOWER_UA.to_string()]);
}

#[test]
fn test_fetch_logs_list_follower() {
    let db = Arc::new(FakeDb::default());
    let svc = service(db.clone(), Arc::new(SyncEnqueue), Arc::default());

    fetch(&svc, Some(LIST_UA));

    assert_eq!(*db.followers.lock(), vec![LIST_UA.to_string()]);
}

#[test]
fn test_fetch_ignores_non_followers() {
    let db = Arc::new(FakeDb::default());
    let svc = service(db.clone(), Arc::new(SyncEnqueue), Arc::default());

    fetch(&svc, Some("curl/8.0.1"));
    fetch(&svc, None);

    assert!(db.followers.lock().is_empty());
}

#[test]
fn test_enqueue_failure_is_logged_but_fetch_succeeds() {
    let log = Arc::new(MockLog::default());
    let db = Arc::new(FakeDb::default());
    let svc = service(db.clone(), Arc::new(TimeoutEnqueue), log.clone());
    post(&svc, STATUS).unwrap();

    assert_eq!(fetch(&svc, Some(FOLLOWER_UA)), STATUS);

    assert_eq!(log.follower_logging.lock().len(), 1);
    assert!(log.follower_logging.lock()[0].contains("timeout enqueuing task"));
}

#[test]
fn test_follower_log_failure_inside_task_is_logged() {
    let log = Arc::new(MockLog::default());
    let db = StubDb {
        log_fails: true,
        ..Default::default()
    };
    let svc = service(Arc::new(db), Arc::new(SyncEnqueue), log.clone());

    fetch(&svc, Some(FOLLOWER_UA));

    assert_eq!(log.follower_logging.lock().len(), 1);
    assert!(log.follower_logging.lock()[0].contains("follower err"));
    assert_eq!(log.total(), 1);
}

// =============================================================================
// Wiring Tests (real store + runner)
// =============================================================================

#[test]
fn test_from_config_with_real_components() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .sync_strategy(SyncStrategy::EveryWrite)
        .workers(2)
        .enqueue_timeout(Duration::from_secs(1))
        .credentials(Credentials::new("alice", "s3cret"))
        .build();
    config.validate().unwrap();

    let store = Arc::new(FeedStore::from_config(&config).unwrap());
    let runner = Arc::new(TaskRunner::from_config(&config).unwrap());
    let svc = Service::from_config(&config, store.clone(), runner.clone(), Arc::new(TracingLog));

    svc.post_status(Some(("alice", "s3cret")), FEED_MEDIA_TYPE, &mut STATUS.as_bytes())
        .unwrap();
    assert_eq!(fetch(&svc, Some(FOLLOWER_UA)), STATUS);

    // The follower line is written by a worker; wait for it
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let followers = std::fs::read_to_string(store.followers_path()).unwrap();
        if followers.contains(FOLLOWER_UA) {
            break;
        }
        assert!(Instant::now() < deadline, "follower was never logged");
        thread::sleep(Duration::from_millis(10));
    }

    runner.stop();
}

#[test]
fn test_busy_runner_drops_follow_up_after_deadline() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(FeedStore::open(temp_dir.path(), SyncStrategy::OsBuffered).unwrap());
    let runner = Arc::new(TaskRunner::with_workers(1).unwrap());
    let log = Arc::new(MockLog::default());
    let svc = Service::new(store.clone(), runner.clone(), log.clone())
        .with_enqueue_timeout(Duration::from_millis(10));

    let (release, wait) = mpsc::channel::<()>();
    runner
        .enqueue(Duration::from_secs(5), move |_| {
            let _ = wait.recv();
        })
        .unwrap();

    let started = Instant::now();
    fetch(&svc, Some(FOLLOWER_UA));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(log.follower_logging.lock().len(), 1);

    release.send(()).unwrap();
    runner.stop();
    let followers = std::fs::read_to_string(store.followers_path()).unwrap();
    assert!(!followers.contains(FOLLOWER_UA));
}
