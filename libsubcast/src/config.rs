//! Configuration management for Subcast
//!
//! Three files feed a run:
//! - an optional TOML settings file with defaults for both binaries,
//! - the Reddit credentials file (flat JSON object),
//! - the post configuration file (JSON array of post requests).

use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ConfigError, Result};
use crate::types::PostRequest;

/// Sample value written into scaffolded credentials
pub const PLACEHOLDER_CLIENT_ID: &str = "YOUR_CLIENT_ID";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub posting: PostingConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostingConfig {
    pub config_path: String,
    pub credentials_path: String,
    pub export_path: String,
    pub delay_floor_secs: u64,
    pub delay_spread_secs: u64,
}

impl Default for PostingConfig {
    fn default() -> Self {
        Self {
            config_path: "post_config.json".to_string(),
            credentials_path: "credentials.json".to_string(),
            export_path: "events.json".to_string(),
            delay_floor_secs: 60,
            delay_spread_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub address: String,
    pub port: u16,
    pub poll_interval_ms: u64,
    pub events_path: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 5000,
            poll_interval_ms: 1000,
            events_path: "events.json".to_string(),
        }
    }
}

impl Config {
    /// Load settings from the default location, or defaults when absent
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        if !config_path.exists() {
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    /// Load settings from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }
}

/// Resolve the settings file path following the XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("SUBCAST_CONFIG") {
        return Ok(expand_path(&path));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("subcast").join("config.toml"))
}

/// Expand a leading `~` in a user-supplied path
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}

/// Reddit API secrets
///
/// Loaded once at startup and never mutated. The secret fields are wrapped
/// so they are zeroed on drop and never appear in `Debug` output.
pub struct Credentials {
    pub client_id: String,
    pub client_secret: SecretString,
    pub user_agent: String,
    pub username: String,
    pub password: SecretString,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("user_agent", &self.user_agent)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Deserialize)]
struct RawCredentials {
    client_id: Option<String>,
    client_secret: Option<String>,
    user_agent: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingField(field.to_string()).into()),
    }
}

impl Credentials {
    /// Load credentials from a flat JSON object
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be read or parsed,
    /// a key is missing or empty, or the file still holds sample values.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.display().to_string(),
            source,
        })?;
        let raw: RawCredentials =
            serde_json::from_str(&content).map_err(|source| ConfigError::JsonError {
                path: path.display().to_string(),
                source,
            })?;

        let credentials = Self {
            client_id: required(raw.client_id, "client_id")?,
            client_secret: SecretString::from(required(raw.client_secret, "client_secret")?),
            user_agent: required(raw.user_agent, "user_agent")?,
            username: required(raw.username, "username")?,
            password: SecretString::from(required(raw.password, "password")?),
        };

        if credentials.is_placeholder() {
            return Err(ConfigError::Placeholder(path.display().to_string()).into());
        }

        Ok(credentials)
    }

    /// True while the sample client id has not been replaced
    pub fn is_placeholder(&self) -> bool {
        self.client_id == PLACEHOLDER_CLIENT_ID
    }

    pub(crate) fn secret_pair(&self) -> (&str, &str) {
        (
            self.client_secret.expose_secret(),
            self.password.expose_secret(),
        )
    }
}

/// Load the ordered list of post requests from a JSON array
pub fn load_post_requests(path: &Path) -> Result<Vec<PostRequest>> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.display().to_string(),
        source,
    })?;
    let requests: Vec<PostRequest> =
        serde_json::from_str(&content).map_err(|source| ConfigError::JsonError {
            path: path.display().to_string(),
            source,
        })?;
    Ok(requests)
}

/// Write a sample credentials file unless one already exists.
///
/// Returns `true` when a file was written.
pub fn write_sample_credentials(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    let sample = serde_json::json!({
        "client_id": PLACEHOLDER_CLIENT_ID,
        "client_secret": "YOUR_CLIENT_SECRET",
        "user_agent": "SubcastAgent/1.0 by YourUsername",
        "username": "YOUR_REDDIT_USERNAME",
        "password": "YOUR_REDDIT_PASSWORD"
    });
    std::fs::write(path, serde_json::to_string_pretty(&sample)?)?;
    info!("Created sample credentials file at {}", path.display());
    Ok(true)
}

/// Write a sample post configuration unless one already exists.
///
/// Returns `true` when a file was written.
pub fn write_sample_post_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    let sample = vec![
        PostRequest::text(
            "test",
            "Example post",
            "This is an example post created by Subcast.",
        ),
        PostRequest::link(
            "AnotherSubreddit",
            "Check out this cool product",
            "https://example.com/product",
        ),
    ];
    std::fs::write(path, serde_json::to_string_pretty(&sample)?)?;
    info!("Created sample post configuration at {}", path.display());
    Ok(true)
}
