//! Follower log
//!
//! Append-only audit log of feed followers, kept apart from the feed.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use crate::error::{Result, TwtError};

/// Timestamp prefix written in front of every entry
const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Append-only follower log
///
/// Not cached. Guarded by its own mutex so follower writes never contend with
/// feed readers or writers.
pub struct FollowerLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl FollowerLog {
    /// Open or create the log for appending
    pub fn open(path: &Path) -> Result<Self> {
        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let file = options.open(path).map_err(TwtError::FollowerLog)?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    /// Append `entry` as exactly one timestamped line
    ///
    /// Line breaks inside the entry are replaced with spaces.
    pub fn append(&self, entry: &str) -> Result<()> {
        let line = format_line(&Local::now().format(TIMESTAMP_FORMAT).to_string(), entry);
        let mut file = self.file.lock();
        file.write_all(line.as_bytes())
            .map_err(TwtError::FollowerLog)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn format_line(timestamp: &str, entry: &str) -> String {
    let entry: String = entry
        .trim_end_matches(['\r', '\n'])
        .chars()
        .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
        .collect();
    format!("{timestamp} {entry}\n")
}
