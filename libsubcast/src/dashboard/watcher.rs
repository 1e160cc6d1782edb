//! Background refresh of the dashboard cache from the events file
//!
//! The watcher polls the file's modification time and size at a fixed
//! interval. When either changes it re-reads and re-parses the whole file
//! and swaps the result into the cache. A read or parse failure leaves the
//! cache exactly as it was.
//!
//! The file must be a JSON array of objects. Entries are not checked against
//! [`Event`](crate::types::Event), so files from older or newer posters load.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::dashboard::cache::EventCache;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
}

/// What a single refresh pass did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// File unchanged since the last pass
    Unchanged,
    /// File absent or unreadable; cache untouched
    Missing,
    /// Cache replaced with this many events
    Refreshed(usize),
    /// File changed but did not parse; cache untouched
    Rejected(String),
}

pub struct EventFileWatcher {
    path: PathBuf,
    cache: Arc<EventCache>,
    interval: Duration,
    last_seen: Option<Fingerprint>,
}

impl EventFileWatcher {
    pub fn new(path: impl Into<PathBuf>, cache: Arc<EventCache>, interval: Duration) -> Self {
        Self {
            path: path.into(),
            cache,
            interval,
            last_seen: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create an empty events file if none exists, then load it
    ///
    /// # Errors
    ///
    /// Returns an error only if the empty file cannot be created.
    pub async fn prime(&mut self) -> Result<RefreshOutcome> {
        if tokio::fs::metadata(&self.path).await.is_err() {
            tokio::fs::write(&self.path, "[]").await?;
            info!("Created empty events file at {}", self.path.display());
        }
        Ok(self.refresh_if_changed().await)
    }

    /// Re-read the file if it changed since the last pass
    pub async fn refresh_if_changed(&mut self) -> RefreshOutcome {
        let metadata = match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!("Events file {} unavailable: {}", self.path.display(), e);
                return RefreshOutcome::Missing;
            }
        };

        let fingerprint = Fingerprint {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        };
        if self.last_seen == Some(fingerprint) {
            return RefreshOutcome::Unchanged;
        }
        // A rejected version is not retried until the file changes again
        self.last_seen = Some(fingerprint);

        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Error reading events file {}: {}", self.path.display(), e);
                self.last_seen = None;
                return RefreshOutcome::Missing;
            }
        };

        match parse_entries(&content) {
            Ok(events) => {
                let count = events.len();
                self.cache.replace(events);
                info!("Updated events cache: {} events", count);
                RefreshOutcome::Refreshed(count)
            }
            Err(reason) => {
                warn!("Error updating events cache: {}", reason);
                RefreshOutcome::Rejected(reason)
            }
        }
    }

    /// Poll forever on a background task
    pub fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(
                "File watcher started on {} (every {}ms)",
                self.path.display(),
                self.interval.as_millis()
            );
            loop {
                ticker.tick().await;
                self.refresh_if_changed().await;
            }
        })
    }
}

/// Parse an events file into its entries, requiring an array of objects
fn parse_entries(content: &str) -> std::result::Result<Vec<Value>, String> {
    let entries: Vec<Value> = serde_json::from_str(content).map_err(|e| e.to_string())?;
    match entries.iter().position(|entry| !entry.is_object()) {
        Some(index) => Err(format!("entry {} is not an object", index)),
        None => Ok(entries),
    }
}
