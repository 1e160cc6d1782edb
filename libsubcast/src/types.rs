//! Core types for Subcast

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, PlatformError};

/// Value of the `action` field on every recorded event
pub const POST_ATTEMPT: &str = "post_attempt";

/// One entry in a posting batch
///
/// Field names on the wire follow the post configuration file
/// (`subreddit, title, content, url, image_path`); unused fields may be null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRequest {
    #[serde(rename = "subreddit")]
    pub community: String,
    pub title: String,
    #[serde(default, rename = "content")]
    pub body: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub image_path: Option<PathBuf>,
}

impl PostRequest {
    /// Text post with the given body
    pub fn text(community: &str, title: &str, body: &str) -> Self {
        Self {
            community: community.to_string(),
            title: title.to_string(),
            body: Some(body.to_string()),
            url: None,
            image_path: None,
        }
    }

    /// Link post pointing at `url`
    pub fn link(community: &str, title: &str, url: &str) -> Self {
        Self {
            community: community.to_string(),
            title: title.to_string(),
            body: None,
            url: Some(url.to_string()),
            image_path: None,
        }
    }

    /// Image post uploading the file at `path`
    pub fn image(community: &str, title: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            community: community.to_string(),
            title: title.to_string(),
            body: None,
            url: None,
            image_path: Some(path.into()),
        }
    }

    /// Submission mode this request resolves to right now
    pub fn kind(&self) -> PostKind {
        PostKind::select(
            self.body.as_deref(),
            self.url.as_deref(),
            self.image_path.as_deref(),
        )
    }
}

/// Mutually exclusive submission mode, carrying its payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostKind {
    Text(String),
    Link(String),
    Image(PathBuf),
}

impl PostKind {
    /// Choose the submission mode for a request.
    ///
    /// An image path wins only when the file exists; otherwise a non-empty
    /// URL makes a link post; otherwise the body (possibly empty) is posted
    /// as text.
    pub fn select(body: Option<&str>, url: Option<&str>, image_path: Option<&Path>) -> Self {
        if let Some(path) = image_path.filter(|p| !p.as_os_str().is_empty() && p.exists()) {
            return PostKind::Image(path.to_path_buf());
        }
        if let Some(url) = url.filter(|u| !u.is_empty()) {
            return PostKind::Link(url.to_string());
        }
        PostKind::Text(body.unwrap_or_default().to_string())
    }

    pub fn tag(&self) -> PostKindTag {
        match self {
            PostKind::Text(_) => PostKindTag::Text,
            PostKind::Link(_) => PostKindTag::Link,
            PostKind::Image(_) => PostKindTag::Image,
        }
    }
}

/// Payload-free post kind, as recorded on an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKindTag {
    Text,
    Link,
    Image,
}

impl std::fmt::Display for PostKindTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PostKindTag::Text => write!(f, "text"),
            PostKindTag::Link => write!(f, "link"),
            PostKindTag::Image => write!(f, "image"),
        }
    }
}

/// What the platform hands back for an accepted submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Success,
    Failed,
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventStatus::Success => write!(f, "success"),
            EventStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Immutable record of one post attempt and its outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// When the attempt started
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub subreddit: String,
    pub title: String,
    pub status: EventStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<PostKindTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_complete: Option<DateTime<Utc>>,
}

impl Event {
    pub fn is_success(&self) -> bool {
        self.status == EventStatus::Success
    }
}

/// An attempt in progress; finalizing it yields the [`Event`]
#[derive(Debug, Clone)]
pub struct Attempt {
    started: DateTime<Utc>,
    community: String,
    title: String,
}

impl Attempt {
    pub fn start(community: &str, title: &str) -> Self {
        Self {
            started: Utc::now(),
            community: community.to_string(),
            title: title.to_string(),
        }
    }

    pub fn succeeded(self, kind: PostKindTag, submission: Submission) -> Event {
        Event {
            kind: Some(kind),
            post_id: Some(submission.id),
            post_url: Some(submission.url),
            ..self.finish(EventStatus::Success)
        }
    }

    pub fn failed(self, kind: Option<PostKindTag>, error: &PlatformError) -> Event {
        Event {
            kind,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
            ..self.finish(EventStatus::Failed)
        }
    }

    /// Failure raised before anything was submitted
    pub fn rejected(self, error_kind: ErrorKind, message: String) -> Event {
        Event {
            error: Some(message),
            error_kind: Some(error_kind),
            ..self.finish(EventStatus::Failed)
        }
    }

    fn finish(self, status: EventStatus) -> Event {
        Event {
            timestamp: self.started,
            action: POST_ATTEMPT.to_string(),
            subreddit: self.community,
            title: self.title,
            status,
            kind: None,
            post_id: None,
            post_url: None,
            error: None,
            error_kind: None,
            timestamp_complete: Some(Utc::now()),
        }
    }
}

/// Supported image MIME types for image posts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ImageMimeType {
    Jpeg,
    Png,
    Gif,
    WebP,
}

impl ImageMimeType {
    /// Detect MIME type from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Detect MIME type from a file path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::WebP => "image/webp",
        }
    }
}

impl std::fmt::Display for ImageMimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_post_request_parses_config_keys() {
        let json = r#"{
            "subreddit": "test",
            "title": "Example ad post",
            "content": "Body",
            "url": null,
            "image_path": null
        }"#;
        let request: PostRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.community, "test");
        assert_eq!(request.body.as_deref(), Some("Body"));
        assert!(request.url.is_none());
        assert!(request.image_path.is_none());
    }

    #[test]
    fn test_post_request_optional_keys_may_be_absent() {
        let request: PostRequest =
            serde_json::from_str(r#"{"subreddit": "rust", "title": "Hi"}"#).unwrap();
        assert_eq!(request.kind(), PostKind::Text(String::new()));
    }

    #[test]
    fn test_post_request_requires_title() {
        let result = serde_json::from_str::<PostRequest>(r#"{"subreddit": "rust"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_kind_text_by_default() {
        let request = PostRequest::text("test", "T1", "hello");
        assert_eq!(request.kind(), PostKind::Text("hello".to_string()));
    }

    #[test]
    fn test_kind_link_when_url_given() {
        let request = PostRequest::link("test", "T", "https://example.com/product");
        assert_eq!(
            request.kind(),
            PostKind::Link("https://example.com/product".to_string())
        );
    }

    #[test]
    fn test_kind_missing_image_falls_back_to_link() {
        let mut request = PostRequest::link("test", "T", "https://example.com");
        request.image_path = Some(PathBuf::from("/definitely/not/here.png"));
        assert_eq!(request.kind().tag(), PostKindTag::Link);
    }

    #[test]
    fn test_kind_missing_image_without_url_is_text() {
        let request = PostRequest::image("test", "T", "/definitely/not/here.png");
        assert_eq!(request.kind(), PostKind::Text(String::new()));
    }

    #[test]
    fn test_kind_existing_image_wins_over_link() {
        let temp_dir = TempDir::new().unwrap();
        let image = temp_dir.path().join("cat.png");
        std::fs::write(&image, b"png").unwrap();

        let mut request = PostRequest::image("test", "T", &image);
        request.url = Some("https://example.com".to_string());
        request.body = Some("ignored".to_string());
        assert_eq!(request.kind(), PostKind::Image(image));
    }

    #[test]
    fn test_kind_empty_url_is_ignored() {
        let mut request = PostRequest::text("test", "T", "body");
        request.url = Some(String::new());
        assert_eq!(request.kind(), PostKind::Text("body".to_string()));
    }

    #[test]
    fn test_succeeded_event_fields() {
        let event = Attempt::start("test", "T1").succeeded(
            PostKindTag::Text,
            Submission {
                id: "abc123".to_string(),
                url: "https://www.reddit.com/r/test/comments/abc123/t1/".to_string(),
            },
        );

        assert!(event.is_success());
        assert_eq!(event.action, POST_ATTEMPT);
        assert_eq!(event.post_id.as_deref(), Some("abc123"));
        assert!(event.error.is_none());
        assert!(event.error_kind.is_none());
        assert!(event.timestamp_complete.unwrap() >= event.timestamp);
    }

    #[test]
    fn test_failed_event_keeps_raw_message() {
        let error = PlatformError::RateLimit("you are doing that too much".to_string());
        let event = Attempt::start("test", "T").failed(Some(PostKindTag::Link), &error);

        assert_eq!(event.status, EventStatus::Failed);
        assert_eq!(event.error_kind, Some(ErrorKind::RateLimited));
        assert!(event
            .error
            .as_deref()
            .unwrap()
            .contains("you are doing that too much"));
        assert!(event.post_id.is_none());
    }

    #[test]
    fn test_event_json_shape() {
        let event = Attempt::start("test", "T").rejected(
            ErrorKind::CommunityNotFound,
            "Subreddit test could not be validated".to_string(),
        );
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["action"], "post_attempt");
        assert_eq!(value["subreddit"], "test");
        assert_eq!(value["status"], "failed");
        assert_eq!(value["error_kind"], "community_not_found");
        assert!(value.get("post_id").is_none());
        assert!(value.get("kind").is_none());
    }

    #[test]
    fn test_image_mime_from_path() {
        assert_eq!(
            ImageMimeType::from_path(Path::new("a/b/photo.JPG")),
            Some(ImageMimeType::Jpeg)
        );
        assert_eq!(ImageMimeType::from_path(Path::new("noext")), None);
        assert_eq!(ImageMimeType::WebP.to_string(), "image/webp");
    }
}
