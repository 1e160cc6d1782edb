//! Activity dashboard
//!
//! A cache of the latest parsed events file, a background task that keeps
//! it current, and a small HTTP server that renders it.

pub mod cache;
pub mod routes;
pub mod watcher;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

pub use cache::{DashboardStatus, EventCache, Snapshot};
pub use routes::{build, serve};
pub use watcher::{EventFileWatcher, RefreshOutcome};

use crate::config::{expand_path, DashboardConfig};
use crate::error::Result;

/// A primed cache with its watcher already polling
pub struct Dashboard {
    cache: Arc<EventCache>,
    watcher: JoinHandle<()>,
    config: DashboardConfig,
}

impl Dashboard {
    /// Ensure the events file exists, load it, and start watching it
    pub async fn start(config: DashboardConfig) -> Result<Self> {
        let cache = Arc::new(EventCache::new());
        let mut watcher = EventFileWatcher::new(
            events_path(&config),
            Arc::clone(&cache),
            Duration::from_millis(config.poll_interval_ms.max(1)),
        );
        watcher.prime().await?;

        Ok(Self {
            cache,
            watcher: watcher.spawn(),
            config,
        })
    }

    pub fn cache(&self) -> Arc<EventCache> {
        Arc::clone(&self.cache)
    }

    /// Serve HTTP until the server shuts down, then stop the watcher
    pub async fn serve(self) -> Result<()> {
        let result = serve(Arc::clone(&self.cache), &self.config).await;
        self.watcher.abort();
        result
    }
}

/// Events file the dashboard reads
pub fn events_path(config: &DashboardConfig) -> PathBuf {
    expand_path(&config.events_path)
}
