//! Snapshot cache behind the dashboard endpoints
//!
//! The cache holds one immutable [`Snapshot`] behind an `Arc`. A refresh
//! builds a complete new snapshot and swaps the reference, so readers see
//! either the old list or the new one, never a mix.
//!
//! Entries are kept as the JSON objects found in the events file, so the
//! dashboard serves what the poster wrote, including fields this build
//! does not know about.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub events: Vec<Value>,
    pub refreshed_at: DateTime<Utc>,
}

/// Response body of the status endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStatus {
    pub events_count: usize,
    pub last_update: DateTime<Utc>,
    pub server_time: DateTime<Utc>,
}

#[derive(Debug)]
pub struct EventCache {
    current: RwLock<Arc<Snapshot>>,
}

impl Default for EventCache {
    fn default() -> Self {
        Self::new()
    }
}

impl EventCache {
    /// Empty cache, stamped with the current time
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot {
                events: Vec::new(),
                refreshed_at: Utc::now(),
            })),
        }
    }

    /// Current snapshot; holding it never blocks a refresh
    pub fn snapshot(&self) -> Arc<Snapshot> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Install a new event list and return the snapshot that now serves reads
    pub fn replace(&self, events: Vec<Value>) -> Arc<Snapshot> {
        let next = Arc::new(Snapshot {
            events,
            refreshed_at: Utc::now(),
        });
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::clone(&next);
        next
    }

    pub fn status(&self) -> DashboardStatus {
        let snapshot = self.snapshot();
        DashboardStatus {
            events_count: snapshot.events.len(),
            last_update: snapshot.refreshed_at,
            server_time: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::Attempt;

    fn failed(title: &str) -> Value {
        let event = Attempt::start("test", title).rejected(ErrorKind::Submission, "boom".to_string());
        serde_json::to_value(event).unwrap()
    }

    #[test]
    fn test_new_cache_is_empty() {
        let cache = EventCache::new();
        assert!(cache.snapshot().events.is_empty());
        assert_eq!(cache.status().events_count, 0);
    }

    #[test]
    fn test_replace_swaps_whole_list() {
        let cache = EventCache::new();
        let before = cache.snapshot();

        cache.replace(vec![failed("a"), failed("b")]);

        // Readers holding the old snapshot keep seeing it unchanged
        assert!(before.events.is_empty());
        let after = cache.snapshot();
        assert_eq!(after.events.len(), 2);
        assert!(after.refreshed_at >= before.refreshed_at);
    }

    #[test]
    fn test_status_reports_count_and_times() {
        let cache = EventCache::new();
        let snapshot = cache.replace(vec![failed("a")]);

        let status = cache.status();
        assert_eq!(status.events_count, 1);
        assert_eq!(status.last_update, snapshot.refreshed_at);
        assert!(status.server_time >= status.last_update);
    }

    #[test]
    fn test_status_json_keys() {
        let value = serde_json::to_value(EventCache::new().status()).unwrap();
        assert!(value.get("events_count").is_some());
        assert!(value.get("last_update").is_some());
        assert!(value.get("server_time").is_some());
    }

    #[test]
    fn test_concurrent_readers_see_complete_lists() {
        let cache = Arc::new(EventCache::new());
        let writer = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                for n in 1..=50 {
                    cache.replace((0..n).map(|i| failed(&i.to_string())).collect());
                }
            })
        };

        for _ in 0..200 {
            let snapshot = cache.snapshot();
            // Each published list is 0..n, so titles are always contiguous
            for (i, event) in snapshot.events.iter().enumerate() {
                assert_eq!(event["title"], i.to_string());
            }
        }
        writer.join().unwrap();
        assert_eq!(cache.snapshot().events.len(), 50);
    }
}
