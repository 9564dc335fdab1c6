//! Service
//!
//! The request handler: serves the feed, accepts new statuses and hands
//! follower bookkeeping to the background executor.
//!
//! ## Flow
//! ```text
//! fetch_feed ──► FeedDb::get ──► sink
//!                     └──► Enqueue (deadline) ──► worker ──► FeedDb::log_follower
//!
//! post_status ──► credentials ──► media type ──► FeedDb::post_status
//! ```

use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::Credentials;
use crate::config::Config;
use crate::error::{Result, TwtError};
use crate::executor::{CancelToken, Enqueue, Task};
use crate::follower::Follower;
use crate::store::FeedDb;

/// Media type the feed is served with
pub const FEED_MEDIA_TYPE: &str = "text/vnd.twtxt+plain";

/// Media types accepted for new statuses
const ACCEPTED_MEDIA_TYPES: [&str; 2] = [FEED_MEDIA_TYPE, "text/vnd.twtxt"];

/// Default hand-off deadline for follower bookkeeping
const DEFAULT_ENQUEUE_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Error reporting
// =============================================================================

/// Where the handler reports failures it does not (or cannot) return
pub trait ServiceLog: Send + Sync {
    fn getting_feed_err(&self, err: &TwtError);
    fn writing_body_err(&self, err: &TwtError);
    fn follower_logging_err(&self, err: &TwtError);
    fn posting_status_err(&self, err: &TwtError);
}

/// [`ServiceLog`] backed by `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl ServiceLog for TracingLog {
    fn getting_feed_err(&self, err: &TwtError) {
        tracing::error!(error = %err, "error getting twtxt.txt");
    }

    fn writing_body_err(&self, err: &TwtError) {
        tracing::warn!(error = %err, "error writing body");
    }

    fn follower_logging_err(&self, err: &TwtError) {
        tracing::warn!(error = %err, "error logging follower");
    }

    fn posting_status_err(&self, err: &TwtError) {
        tracing::error!(error = %err, "error posting status");
    }
}

// =============================================================================
// Service
// =============================================================================

/// Request handler composing the store and the executor
pub struct Service {
    db: Arc<dyn FeedDb>,
    enqueue: Arc<dyn Enqueue>,
    log: Arc<dyn ServiceLog>,
    credentials: Option<Credentials>,
    enqueue_timeout: Duration,
}

impl Service {
    /// Create a handler with open posting and a 10s follow-up deadline
    pub fn new(db: Arc<dyn FeedDb>, enqueue: Arc<dyn Enqueue>, log: Arc<dyn ServiceLog>) -> Self {
        Self {
            db,
            enqueue,
            log,
            credentials: None,
            enqueue_timeout: DEFAULT_ENQUEUE_TIMEOUT,
        }
    }

    /// Create a handler using the credentials and deadline from a [`Config`]
    pub fn from_config(
        config: &Config,
        db: Arc<dyn FeedDb>,
        enqueue: Arc<dyn Enqueue>,
        log: Arc<dyn ServiceLog>,
    ) -> Self {
        let service = Self::new(db, enqueue, log).with_enqueue_timeout(config.enqueue_timeout);
        match &config.credentials {
            Some(credentials) => service.with_credentials(credentials.clone()),
            None => service,
        }
    }

    /// Require credentials for posting
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set how long a fetch waits to hand off follower bookkeeping
    pub fn with_enqueue_timeout(mut self, timeout: Duration) -> Self {
        self.enqueue_timeout = timeout;
        self
    }

    /// Whether posting requires credentials
    pub fn requires_auth(&self) -> bool {
        self.credentials.is_some()
    }

    /// Write the feed to `sink` and schedule follower bookkeeping
    ///
    /// The follow-up runs on the executor. Failing to schedule it is reported
    /// through [`ServiceLog`] and does not fail the fetch.
    pub fn fetch_feed(&self, user_agent: Option<&str>, sink: &mut dyn Write) -> Result<u64> {
        let written = {
            let mut feed = match self.db.get() {
                Ok(feed) => feed,
                Err(err) => {
                    self.log.getting_feed_err(&err);
                    return Err(err);
                }
            };
            match io::copy(&mut feed, sink) {
                Ok(n) => n,
                Err(err) => {
                    let err = TwtError::Io(err);
                    self.log.writing_body_err(&err);
                    return Err(err);
                }
            }
        };

        let user_agent = user_agent.unwrap_or_default().to_string();
        let db = Arc::clone(&self.db);
        let log = Arc::clone(&self.log);
        let task: Task = Box::new(move |_: &CancelToken| {
            if let Some(follower) = Follower::parse(&user_agent) {
                tracing::debug!(%follower, "feed fetched by follower");
                if let Err(err) = db.log_follower(&user_agent) {
                    log.follower_logging_err(&err);
                }
            }
        });
        if let Err(err) = self.enqueue.enqueue(self.enqueue_timeout, task) {
            self.log.follower_logging_err(&err);
        }

        Ok(written)
    }

    /// Append a status after checking credentials and media type
    pub fn post_status(
        &self,
        auth: Option<(&str, &str)>,
        content_type: &str,
        body: &mut dyn Read,
    ) -> Result<()> {
        if let Some(credentials) = &self.credentials {
            let (username, password) = auth.unwrap_or_default();
            if !credentials.verify(username, password) {
                return Err(TwtError::Unauthorized);
            }
        }

        let media_type = parse_media_type(content_type)?;
        if !ACCEPTED_MEDIA_TYPES.contains(&media_type.as_str()) {
            return Err(TwtError::UnsupportedMediaType(media_type));
        }

        self.db.post_status(body).inspect_err(|err| {
            self.log.posting_status_err(err);
        })
    }
}

/// Extract the lowercased `type/subtype` from a Content-Type value
fn parse_media_type(content_type: &str) -> Result<String> {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    let invalid = || TwtError::InvalidMediaType(content_type.to_string());

    let (kind, subtype) = essence.split_once('/').ok_or_else(invalid)?;
    let is_token = |s: &str| {
        !s.is_empty()
            && s.chars()
                .all(|c| c.is_ascii_alphanumeric() || "!#$&-^_.+".contains(c))
    };
    if !is_token(kind) || !is_token(subtype) {
        return Err(invalid());
    }

    for param in content_type.split(';').skip(1) {
        let param = param.trim();
        if param.is_empty() {
            continue;
        }
        match param.split_once('=') {
            Some((name, _)) if is_token(name.trim()) => {}
            _ => return Err(invalid()),
        }
    }

    Ok(essence.to_ascii_lowercase())
}
