//! Reddit platform implementation
//!
//! Talks to the Reddit OAuth API with a script-app password grant. Image
//! posts go through Reddit's media lease flow: request an upload lease, push
//! the file to the returned bucket, then submit the uploaded asset URL.
//! Reddit finishes image posts asynchronously and announces the created post
//! on the websocket named in the lease, so the client listens there before
//! submitting.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::config::Credentials;
use crate::error::{PlatformError, Result};
use crate::platforms::Platform;
use crate::types::{ImageMimeType, Submission};

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_BASE: &str = "https://oauth.reddit.com";
const WEB_BASE: &str = "https://www.reddit.com";

/// Upper bound on any single HTTP exchange with Reddit
const REQUEST_TIMEOUT: Duration = Duration::from_secs(16);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// How long Reddit may take to turn an uploaded image into a post
const MEDIA_TIMEOUT: Duration = Duration::from_secs(60);

const MAX_COMMUNITY_NAME_LEN: usize = 21;

type MediaSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Map an HTTP status from Reddit to a PlatformError
///
/// `context` names the operation (e.g., "submit", "community lookup") and is
/// included in the message alongside Reddit's own response text.
fn map_reddit_status(status: StatusCode, body: &str, context: &str) -> PlatformError {
    let detail = if body.trim().is_empty() {
        status.to_string()
    } else {
        format!("{} {}", status, body.trim())
    };

    match status.as_u16() {
        401 => PlatformError::Authentication(format!(
            "Reddit rejected the session during {}: {}",
            context, detail
        )),
        403 => PlatformError::Forbidden(format!("Reddit denied {}: {}", context, detail)),
        404 => PlatformError::NotFound(format!("Reddit {} found nothing: {}", context, detail)),
        429 => PlatformError::RateLimit(format!(
            "Reddit rate limit exceeded during {}: {}",
            context, detail
        )),
        400 | 422 => PlatformError::Validation(format!(
            "Reddit rejected the request during {}: {}",
            context, detail
        )),
        _ => PlatformError::Posting(format!("Reddit {} failed: {}", context, detail)),
    }
}

/// Map a transport-level reqwest error to a PlatformError
fn map_transport_error(error: reqwest::Error, context: &str) -> PlatformError {
    if error.is_timeout() || error.is_connect() || error.is_request() {
        PlatformError::Network(format!(
            "Network error while contacting Reddit during {}: {}",
            context, error
        ))
    } else if error.is_decode() {
        PlatformError::Posting(format!(
            "Unexpected Reddit response during {}: {}",
            context, error
        ))
    } else {
        PlatformError::Posting(format!("Reddit {} failed: {}", context, error))
    }
}

/// Map the `json.errors` array of an `api_type=json` response
///
/// Reddit reports business errors (bad subreddit, rate limit, banned) with a
/// 200 status and entries like `["RATELIMIT", "you are doing that too much", "ratelimit"]`.
fn map_api_errors(errors: &[Vec<Value>], context: &str) -> Option<PlatformError> {
    let first = errors.first()?;
    let code = first.first().and_then(Value::as_str).unwrap_or("UNKNOWN");
    let message = first
        .get(1)
        .and_then(Value::as_str)
        .unwrap_or("no message");
    let detail = format!("{}: {}", code, message);

    Some(match code {
        "RATELIMIT" => PlatformError::RateLimit(format!("Reddit {} throttled: {}", context, detail)),
        "SUBREDDIT_NOEXIST" | "SUBREDDIT_NOTALLOWED" => {
            PlatformError::NotFound(format!("Reddit {} rejected community: {}", context, detail))
        }
        "USER_REQUIRED" => PlatformError::Authentication(format!(
            "Reddit {} requires a logged-in user: {}",
            context, detail
        )),
        "SUBREDDIT_NOTALLOWED_BANNED" | "NO_SELFS" | "NO_LINKS" | "NO_IMAGES" => {
            PlatformError::Forbidden(format!("Reddit {} not permitted: {}", context, detail))
        }
        _ => PlatformError::Posting(format!("Reddit {} failed: {}", context, detail)),
    })
}

/// Subreddit names are 1-21 ASCII letters, digits or underscores
fn is_valid_community_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_COMMUNITY_NAME_LEN
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn build_http(user_agent: &str, timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(user_agent.to_string())
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .timeout(timeout)
        .build()
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AboutResponse {
    kind: Option<String>,
    data: Option<AboutData>,
}

#[derive(Debug, Deserialize)]
struct AboutData {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubmitEnvelope {
    json: SubmitBody,
}

#[derive(Debug, Deserialize)]
struct SubmitBody {
    #[serde(default)]
    errors: Vec<Vec<Value>>,
    data: Option<SubmitData>,
}

#[derive(Debug, Deserialize)]
struct SubmitData {
    id: Option<String>,
    url: Option<String>,
    user_submitted_page: Option<String>,
    websocket_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MediaLease {
    args: LeaseArgs,
    asset: LeaseAsset,
}

#[derive(Debug, Deserialize)]
struct LeaseArgs {
    action: String,
    fields: Vec<LeaseField>,
}

#[derive(Debug, Deserialize)]
struct LeaseField {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct LeaseAsset {
    asset_id: String,
    websocket_url: Option<String>,
}

impl MediaLease {
    /// Absolute upload endpoint; Reddit returns it protocol-relative
    fn upload_url(&self) -> String {
        absolute_url(&self.args.action)
    }

    /// Public URL of the uploaded object
    fn asset_url(&self) -> Option<String> {
        self.args
            .fields
            .iter()
            .find(|f| f.name == "key")
            .map(|key| format!("{}/{}", self.upload_url(), key.value))
    }
}

/// An image sitting in Reddit's bucket, ready to be submitted
struct UploadedImage {
    asset_url: String,
    websocket_url: Option<String>,
}

/// Message pushed on the media websocket once processing ends
#[derive(Debug, Deserialize)]
struct MediaUpdate {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

fn absolute_url(url: &str) -> String {
    if url.starts_with("//") {
        format!("https:{}", url)
    } else if url.starts_with('/') {
        format!("{}{}", WEB_BASE, url)
    } else {
        url.to_string()
    }
}

/// Base-36 id following `/comments/` in a post permalink
fn post_id_from_url(url: &str) -> Option<String> {
    let mut segments = url.split('/');
    segments.by_ref().find(|segment| *segment == "comments")?;
    segments
        .next()
        .filter(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_string)
}

#[derive(Debug, PartialEq, Eq)]
enum SubmitReply {
    /// The post exists and its id is known
    Created(Submission),
    /// Accepted, but the post is still being built (media submissions)
    Processing,
}

impl SubmitReply {
    fn created(self, context: &str) -> Result<Submission> {
        match self {
            SubmitReply::Created(submission) => Ok(submission),
            SubmitReply::Processing => Err(PlatformError::Posting(format!(
                "Reddit {} returned no post id",
                context
            ))
            .into()),
        }
    }
}

/// Interpret a submit response
fn parse_submission(envelope: SubmitEnvelope, context: &str) -> Result<SubmitReply> {
    if let Some(error) = map_api_errors(&envelope.json.errors, context) {
        return Err(error.into());
    }

    let data = envelope.json.data.ok_or_else(|| {
        PlatformError::Posting(format!("Reddit {} returned no submission data", context))
    })?;

    match data.id.filter(|id| !id.is_empty()) {
        Some(id) => {
            let url = data
                .url
                .map(|url| absolute_url(&url))
                .unwrap_or_else(|| format!("{}/comments/{}/", WEB_BASE, id));
            Ok(SubmitReply::Created(Submission { id, url }))
        }
        None if data.websocket_url.is_some() || data.user_submitted_page.is_some() => {
            Ok(SubmitReply::Processing)
        }
        None => Err(PlatformError::Posting(format!(
            "Reddit {} returned no post id",
            context
        ))
        .into()),
    }
}

/// Read one media websocket message
///
/// Returns `None` for anything that is not a final success or failure.
fn parse_media_update(text: &str, context: &str) -> Option<Result<Submission>> {
    let update: MediaUpdate = serde_json::from_str(text).ok()?;
    match update.kind.as_str() {
        "success" => {
            let redirect = update.payload.get("redirect").and_then(Value::as_str);
            Some(submission_from_redirect(redirect, context))
        }
        "failed" => Some(Err(PlatformError::Posting(format!(
            "Reddit could not process the {}: {}",
            context, update.payload
        ))
        .into())),
        _ => None,
    }
}

fn submission_from_redirect(redirect: Option<&str>, context: &str) -> Result<Submission> {
    let url = redirect.map(absolute_url).ok_or_else(|| {
        PlatformError::Posting(format!("Reddit finished the {} without a post URL", context))
    })?;
    let id = post_id_from_url(&url).ok_or_else(|| {
        PlatformError::Posting(format!(
            "Reddit finished the {} at {}, which is not a post",
            context, url
        ))
    })?;
    Ok(Submission { id, url })
}

async fn connect_media_socket(url: &str, context: &str) -> Result<MediaSocket> {
    let connected = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(url))
        .await
        .map_err(|_| {
            PlatformError::Network(format!(
                "Timed out opening the Reddit media socket for {}",
                context
            ))
        })?;
    let (socket, _) = connected.map_err(|e| {
        PlatformError::Network(format!(
            "Could not open the Reddit media socket for {}: {}",
            context, e
        ))
    })?;
    Ok(socket)
}

async fn read_media_update(socket: &mut MediaSocket, context: &str) -> Result<Submission> {
    while let Some(message) = socket.next().await {
        let message = message.map_err(|e| {
            PlatformError::Network(format!("Reddit media socket failed during {}: {}", context, e))
        })?;
        match message {
            Message::Text(text) => {
                if let Some(outcome) = parse_media_update(&text, context) {
                    return outcome;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    Err(PlatformError::Posting(format!(
        "Reddit closed the media socket before the {} finished",
        context
    ))
    .into())
}

/// Wait for Reddit to report the post built from an uploaded image
async fn await_media_post(mut socket: MediaSocket, context: &str) -> Result<Submission> {
    let outcome = tokio::time::timeout(MEDIA_TIMEOUT, read_media_update(&mut socket, context))
        .await
        .map_err(|_| {
            PlatformError::Network(format!(
                "Timed out after {}s waiting for Reddit to finish the {}",
                MEDIA_TIMEOUT.as_secs(),
                context
            ))
        })?;
    let _ = socket.close(None).await;
    outcome
}

/// Reddit platform client
pub struct RedditClient {
    http: Client,
    credentials: Credentials,
    token: Option<SecretString>,
}

impl RedditClient {
    /// Create an unauthenticated client
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Authentication` if the HTTP client cannot be built.
    pub fn new(credentials: Credentials) -> Result<Self> {
        let http = build_http(&credentials.user_agent, REQUEST_TIMEOUT).map_err(|e| {
            PlatformError::Authentication(format!("Failed to create Reddit client: {}", e))
        })?;

        Ok(Self {
            http,
            credentials,
            token: None,
        })
    }

    fn bearer(&self) -> Result<&str> {
        self.token
            .as_ref()
            .map(|t| t.expose_secret())
            .ok_or_else(|| PlatformError::Authentication("Not authenticated".to_string()).into())
    }

    async fn checked(response: Response, context: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(map_reddit_status(status, &body, context).into())
    }

    async fn post_submit(&self, form: Vec<(&str, &str)>, context: &str) -> Result<SubmitReply> {
        let mut form = form;
        form.push(("api_type", "json"));
        form.push(("resubmit", "true"));

        let response = self
            .http
            .post(format!("{}/api/submit", API_BASE))
            .bearer_auth(self.bearer()?)
            .form(&form)
            .send()
            .await
            .map_err(|e| map_transport_error(e, context))?;

        let envelope: SubmitEnvelope = Self::checked(response, context)
            .await?
            .json()
            .await
            .map_err(|e| map_transport_error(e, context))?;

        parse_submission(envelope, context)
    }

    async fn upload_image(&self, image_path: &Path) -> Result<UploadedImage> {
        let context = "image upload";
        let mime = ImageMimeType::from_path(image_path).ok_or_else(|| {
            PlatformError::Validation(format!(
                "Unsupported image type: {}",
                image_path.display()
            ))
        })?;
        let file_name = image_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();

        let lease: MediaLease = Self::checked(
            self.http
                .post(format!("{}/api/media/asset.json", API_BASE))
                .bearer_auth(self.bearer()?)
                .form(&[("filepath", file_name.as_str()), ("mimetype", mime.as_str())])
                .send()
                .await
                .map_err(|e| map_transport_error(e, context))?,
            context,
        )
        .await?
        .json()
        .await
        .map_err(|e| map_transport_error(e, context))?;

        debug!("Received media lease {}", lease.asset.asset_id);

        let bytes = tokio::fs::read(image_path).await.map_err(|e| {
            PlatformError::Validation(format!(
                "Failed to read image {}: {}",
                image_path.display(),
                e
            ))
        })?;

        let mut upload = reqwest::multipart::Form::new();
        for field in &lease.args.fields {
            upload = upload.text(field.name.clone(), field.value.clone());
        }
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime.as_str())
            .map_err(|e| map_transport_error(e, context))?;
        upload = upload.part("file", part);

        Self::checked(
            self.http
                .post(lease.upload_url())
                .multipart(upload)
                .send()
                .await
                .map_err(|e| map_transport_error(e, context))?,
            context,
        )
        .await?;

        let asset_url = lease.asset_url().ok_or_else(|| {
            PlatformError::Posting("Reddit media lease did not include an object key".to_string())
        })?;
        Ok(UploadedImage {
            asset_url,
            websocket_url: lease.asset.websocket_url,
        })
    }
}

#[async_trait]
impl Platform for RedditClient {
    fn name(&self) -> &str {
        "reddit"
    }

    async fn authenticate(&mut self) -> Result<()> {
        let context = "authentication";
        let (client_secret, password) = self.credentials.secret_pair();

        let response = self
            .http
            .post(TOKEN_URL)
            .basic_auth(&self.credentials.client_id, Some(client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", self.credentials.username.as_str()),
                ("password", password),
            ])
            .send()
            .await
            .map_err(|e| map_transport_error(e, context))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match map_reddit_status(status, &body, context) {
                PlatformError::Forbidden(msg) | PlatformError::Validation(msg) => {
                    PlatformError::Authentication(msg)
                }
                other => other,
            }
            .into());
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| map_transport_error(e, context))?;

        match (token.access_token, token.error) {
            (Some(access_token), _) => {
                self.token = Some(SecretString::from(access_token));
                debug!("Authenticated with Reddit as {}", self.credentials.username);
                Ok(())
            }
            (None, Some(error)) => Err(PlatformError::Authentication(format!(
                "Reddit rejected the password grant: {}",
                error
            ))
            .into()),
            (None, None) => Err(PlatformError::Authentication(
                "Reddit returned no access token".to_string(),
            )
            .into()),
        }
    }

    async fn community_name(&self, community: &str) -> Result<String> {
        let context = "community lookup";
        // The name becomes a path segment; anything else would address another resource
        if !is_valid_community_name(community) {
            return Err(PlatformError::NotFound(format!(
                "'{}' is not a valid subreddit name",
                community
            ))
            .into());
        }

        let response = self
            .http
            .get(format!("{}/r/{}/about", API_BASE, community))
            .bearer_auth(self.bearer()?)
            .query(&[("raw_json", "1")])
            .send()
            .await
            .map_err(|e| map_transport_error(e, context))?;

        let about: AboutResponse = Self::checked(response, context)
            .await?
            .json()
            .await
            .map_err(|e| map_transport_error(e, context))?;

        // Unknown names redirect to a search listing instead of a t5 record
        match (about.kind.as_deref(), about.data.and_then(|d| d.display_name)) {
            (Some("t5"), Some(name)) => Ok(name),
            _ => Err(PlatformError::NotFound(format!("r/{} does not exist", community)).into()),
        }
    }

    async fn submit_text(&self, community: &str, title: &str, body: &str) -> Result<Submission> {
        let context = "text submission";
        self.post_submit(
            vec![("sr", community), ("title", title), ("kind", "self"), ("text", body)],
            context,
        )
        .await?
        .created(context)
    }

    async fn submit_link(&self, community: &str, title: &str, url: &str) -> Result<Submission> {
        let context = "link submission";
        self.post_submit(
            vec![("sr", community), ("title", title), ("kind", "link"), ("url", url)],
            context,
        )
        .await?
        .created(context)
    }

    async fn submit_image(
        &self,
        community: &str,
        title: &str,
        image_path: &Path,
    ) -> Result<Submission> {
        let context = "image submission";
        let image = self.upload_image(image_path).await?;

        // Listen before submitting so the completion message cannot be missed
        let socket = match &image.websocket_url {
            Some(url) => Some(connect_media_socket(url, context).await?),
            None => None,
        };

        let reply = self
            .post_submit(
                vec![
                    ("sr", community),
                    ("title", title),
                    ("kind", "image"),
                    ("url", image.asset_url.as_str()),
                ],
                context,
            )
            .await?;

        match (reply, socket) {
            (SubmitReply::Created(submission), _) => Ok(submission),
            (SubmitReply::Processing, Some(socket)) => await_media_post(socket, context).await,
            (SubmitReply::Processing, None) => Err(PlatformError::Posting(
                "Reddit accepted the image but offered no way to learn the post id".to_string(),
            )
            .into()),
        }
    }
}
