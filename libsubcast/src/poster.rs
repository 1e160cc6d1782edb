//! Posting client
//!
//! Wraps one authenticated platform handle and keeps an append-only log of
//! every post attempt made through it. Nothing a platform call returns ever
//! escapes `post_content` as an error: each failure is folded into the
//! event recorded for that attempt.

use std::path::Path;

use tracing::{info, warn};

use crate::config::Credentials;
use crate::error::{ErrorKind, Result, SubcastError};
use crate::platforms::{reddit::RedditClient, Platform};
use crate::types::{Attempt, Event, PostKind, PostRequest};

pub struct PostingClient {
    platform: Box<dyn Platform>,
    events: Vec<Event>,
}

impl PostingClient {
    /// Build a Reddit-backed client and authenticate it
    ///
    /// # Errors
    ///
    /// Initialization or authentication failure is fatal: no posting can
    /// happen without a usable handle.
    pub async fn connect(credentials: Credentials) -> Result<Self> {
        let mut platform = RedditClient::new(credentials)?;
        platform.authenticate().await?;
        info!("Posting client initialized");
        Ok(Self::new(Box::new(platform)))
    }

    /// Wrap an already-authenticated platform
    pub fn new(platform: Box<dyn Platform>) -> Self {
        Self {
            platform,
            events: Vec::new(),
        }
    }

    /// Check that a community exists and is readable
    ///
    /// Never fails: any lookup error is logged and reported as `false`.
    pub async fn validate_community(&self, name: &str) -> bool {
        match self.platform.community_name(name).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Subreddit validation failed for {}: {}", name, e);
                false
            }
        }
    }

    /// Post one piece of content and record the outcome
    ///
    /// The post kind follows [`PostKind::select`]. The returned event has
    /// already been appended to [`events`](Self::events).
    pub async fn post_content(
        &mut self,
        community: &str,
        title: &str,
        body: Option<&str>,
        url: Option<&str>,
        image_path: Option<&Path>,
    ) -> Event {
        let attempt = Attempt::start(community, title);

        let event = if !self.validate_community(community).await {
            attempt.rejected(
                ErrorKind::CommunityNotFound,
                format!("Subreddit {} could not be validated", community),
            )
        } else {
            let kind = PostKind::select(body, url, image_path);
            match self.platform.submit(community, title, &kind).await {
                Ok(submission) => {
                    info!("Successfully posted to r/{}: {}", community, submission.url);
                    attempt.succeeded(kind.tag(), submission)
                }
                Err(e) => {
                    warn!("Failed to post to r/{}: {}", community, e);
                    match e {
                        SubcastError::Platform(platform_error) => {
                            attempt.failed(Some(kind.tag()), &platform_error)
                        }
                        other => attempt.rejected(ErrorKind::Submission, other.to_string()),
                    }
                }
            }
        };

        self.events.push(event.clone());
        event
    }

    /// Post a configured request
    pub async fn post_request(&mut self, request: &PostRequest) -> Event {
        self.post_content(
            &request.community,
            &request.title,
            request.body.as_deref(),
            request.url.as_deref(),
            request.image_path.as_deref(),
        )
        .await
    }

    /// Every event recorded so far, in processing order
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn platform_name(&self) -> &str {
        self.platform.name()
    }

    /// Write all recorded events to `path` as a pretty-printed JSON array,
    /// replacing any existing file
    pub fn export_events(&self, path: &Path) -> Result<()> {
        export_events(&self.events, path)?;
        info!("Exported {} events to {}", self.events.len(), path.display());
        Ok(())
    }
}

/// Serialize an event list to `path`, overwriting it
pub fn export_events(events: &[Event], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(events)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Read an exported event list back
pub fn import_events(path: &Path) -> Result<Vec<Event>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
