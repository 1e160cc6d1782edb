//! Mock platform implementation for testing
//!
//! This module provides a configurable mock platform that can simulate
//! missing communities, rejected credentials and failing submissions. It's
//! designed for integration tests of the posting client and batch runner
//! without requiring Reddit credentials or network access.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use crate::error::{PlatformError, Result};
use crate::platforms::Platform;
use crate::types::{PostKind, Submission};

/// One submission the mock accepted or refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSubmission {
    pub community: String,
    pub title: String,
    pub kind: PostKind,
}

/// Shared call counters, readable after the platform has been boxed
#[derive(Debug, Clone, Default)]
pub struct MockProbe {
    lookups: Arc<Mutex<Vec<String>>>,
    submissions: Arc<Mutex<Vec<RecordedSubmission>>>,
    auth_calls: Arc<Mutex<usize>>,
}

impl MockProbe {
    /// Communities looked up, in call order
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }

    /// Every submit call, in call order
    pub fn submissions(&self) -> Vec<RecordedSubmission> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn submit_call_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }

    pub fn auth_call_count(&self) -> usize {
        *self.auth_calls.lock().unwrap()
    }
}

/// Configuration for mock platform behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Platform name
    pub name: String,

    /// Communities that exist; `None` means every community exists
    pub communities: Option<HashSet<String>>,

    /// Error to return from authenticate
    pub auth_error: Option<String>,

    /// Error to return from every submit call
    pub submit_error: Option<PlatformError>,

    /// Delay before completing operations (simulates network latency)
    pub delay: Duration,

    pub probe: MockProbe,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            communities: None,
            auth_error: None,
            submit_error: None,
            delay: Duration::from_millis(0),
            probe: MockProbe::default(),
        }
    }
}

/// Mock platform for testing
pub struct MockPlatform {
    config: MockConfig,
    next_id: Mutex<u64>,
}

impl MockPlatform {
    /// Create a new mock platform with the given configuration
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            next_id: Mutex::new(0),
        }
    }

    /// Create a mock platform where every community exists and every post succeeds
    pub fn success() -> Self {
        Self::new(MockConfig::default())
    }

    /// Create a mock platform that only knows the given communities
    pub fn with_communities(communities: &[&str]) -> Self {
        Self::new(MockConfig {
            communities: Some(communities.iter().map(|c| c.to_string()).collect()),
            ..Default::default()
        })
    }

    /// Create a mock platform that fails every submission with `error`
    pub fn submit_failure(error: PlatformError) -> Self {
        Self::new(MockConfig {
            submit_error: Some(error),
            ..Default::default()
        })
    }

    /// Create a mock platform that rejects authentication
    pub fn auth_failure(error: &str) -> Self {
        Self::new(MockConfig {
            auth_error: Some(error.to_string()),
            ..Default::default()
        })
    }

    /// Handle onto the call counters
    pub fn probe(&self) -> MockProbe {
        self.config.probe.clone()
    }

    async fn simulate_latency(&self) {
        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }
    }

    fn record(&self, community: &str, title: &str, kind: PostKind) -> Result<Submission> {
        self.config
            .probe
            .submissions
            .lock()
            .unwrap()
            .push(RecordedSubmission {
                community: community.to_string(),
                title: title.to_string(),
                kind,
            });

        if let Some(error) = &self.config.submit_error {
            return Err(error.clone().into());
        }

        let mut next_id = self.next_id.lock().unwrap();
        *next_id += 1;
        let id = format!("mock{}", next_id);
        Ok(Submission {
            url: format!("https://www.reddit.com/r/{}/comments/{}/", community, id),
            id,
        })
    }
}

#[async_trait]
impl Platform for MockPlatform {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn authenticate(&mut self) -> Result<()> {
        *self.config.probe.auth_calls.lock().unwrap() += 1;
        self.simulate_latency().await;

        match &self.config.auth_error {
            Some(error) => Err(PlatformError::Authentication(error.clone()).into()),
            None => Ok(()),
        }
    }

    async fn community_name(&self, community: &str) -> Result<String> {
        self.config
            .probe
            .lookups
            .lock()
            .unwrap()
            .push(community.to_string());
        self.simulate_latency().await;

        match &self.config.communities {
            Some(known) if !known.contains(community) => Err(PlatformError::NotFound(format!(
                "r/{} does not exist",
                community
            ))
            .into()),
            _ => Ok(community.to_string()),
        }
    }

    async fn submit_text(&self, community: &str, title: &str, body: &str) -> Result<Submission> {
        self.simulate_latency().await;
        self.record(community, title, PostKind::Text(body.to_string()))
    }

    async fn submit_link(&self, community: &str, title: &str, url: &str) -> Result<Submission> {
        self.simulate_latency().await;
        self.record(community, title, PostKind::Link(url.to_string()))
    }

    async fn submit_image(
        &self,
        community: &str,
        title: &str,
        image_path: &Path,
    ) -> Result<Submission> {
        self.simulate_latency().await;
        self.record(community, title, PostKind::Image(PathBuf::from(image_path)))
    }
}
