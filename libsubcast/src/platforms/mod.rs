//! Platform abstraction and implementations
//!
//! A platform is anything that can look up a community and accept text, link
//! and image submissions into it. The Reddit client talks to the real HTTP
//! API; the mock platform stands in for it in tests.
//!
//! # Examples
//!
//! ```no_run
//! use libsubcast::config::Credentials;
//! use libsubcast::platforms::{Platform, reddit::RedditClient};
//!
//! # async fn example() -> libsubcast::error::Result<()> {
//! let credentials = Credentials::load(std::path::Path::new("credentials.json"))?;
//! let mut platform = RedditClient::new(credentials)?;
//! platform.authenticate().await?;
//!
//! let name = platform.community_name("rust").await?;
//! let submission = platform.submit_text(&name, "Hello", "First post").await?;
//! println!("Posted: {}", submission.url);
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{PostKind, Submission};

pub mod reddit;

// Mock platform is available for all builds (not just tests) to support integration tests
pub mod mock;

/// Capability set consumed by the posting client
#[async_trait]
pub trait Platform: Send + Sync {
    /// Lowercase identifier for the platform (e.g., "reddit")
    fn name(&self) -> &str;

    /// Establish an authenticated session
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Authentication` if the credentials are rejected.
    async fn authenticate(&mut self) -> Result<()>;

    /// Read the canonical display name of a community
    ///
    /// A successful read proves the community exists and is visible to the
    /// authenticated account.
    async fn community_name(&self, community: &str) -> Result<String>;

    /// Submit a text (self) post; `body` may be empty
    async fn submit_text(&self, community: &str, title: &str, body: &str) -> Result<Submission>;

    /// Submit a link post
    async fn submit_link(&self, community: &str, title: &str, url: &str) -> Result<Submission>;

    /// Upload a local image and submit it as an image post
    async fn submit_image(
        &self,
        community: &str,
        title: &str,
        image_path: &Path,
    ) -> Result<Submission>;

    /// Dispatch to the submit call matching `kind`
    async fn submit(&self, community: &str, title: &str, kind: &PostKind) -> Result<Submission> {
        match kind {
            PostKind::Text(body) => self.submit_text(community, title, body).await,
            PostKind::Link(url) => self.submit_link(community, title, url).await,
            PostKind::Image(path) => self.submit_image(community, title, path).await,
        }
    }
}
