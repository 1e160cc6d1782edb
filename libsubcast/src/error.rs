//! Error types for Subcast

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SubcastError>;

#[derive(Error, Debug)]
pub enum SubcastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Dashboard error: {0}")]
    Dashboard(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SubcastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            SubcastError::InvalidInput(_) => 3,
            SubcastError::Platform(PlatformError::Authentication(_)) => 2,
            SubcastError::Platform(_) => 1,
            SubcastError::Config(_) => 1,
            SubcastError::Io(_) => 1,
            SubcastError::Json(_) => 1,
            SubcastError::Dashboard(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to parse {path}: {source}")]
    JsonError {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("{0} still contains sample values; fill in your Reddit API credentials")]
    Placeholder(String),

    #[error("Invalid delay range: minimum {min}s exceeds maximum {max}s")]
    InvalidDelay { min: u64, max: u64 },
}

/// Failure reported by a platform client.
///
/// Every variant carries the platform's own message so it can be preserved
/// verbatim in the event log.
#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Community not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Content validation failed: {0}")]
    Validation(String),

    #[error("Posting failed: {0}")]
    Posting(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),
}

impl PlatformError {
    /// Category recorded alongside the message on a failed event
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlatformError::Authentication(_) => ErrorKind::Authentication,
            PlatformError::NotFound(_) => ErrorKind::CommunityNotFound,
            PlatformError::Forbidden(_) => ErrorKind::Forbidden,
            PlatformError::Validation(_) => ErrorKind::Validation,
            PlatformError::Posting(_) => ErrorKind::Submission,
            PlatformError::Network(_) => ErrorKind::Network,
            PlatformError::RateLimit(_) => ErrorKind::RateLimited,
        }
    }
}

/// Machine-readable failure category stored in exported events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    CommunityNotFound,
    Authentication,
    Forbidden,
    RateLimited,
    Network,
    Validation,
    Submission,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::CommunityNotFound => "community_not_found",
            ErrorKind::Authentication => "authentication",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Network => "network",
            ErrorKind::Validation => "validation",
            ErrorKind::Submission => "submission",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_invalid_input() {
        let error = SubcastError::InvalidInput("No posts configured".to_string());
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_authentication_error() {
        let error = SubcastError::Platform(PlatformError::Authentication(
            "invalid_grant".to_string(),
        ));
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_other_errors() {
        let posting = SubcastError::Platform(PlatformError::Posting("boom".to_string()));
        assert_eq!(posting.exit_code(), 1);

        let config = SubcastError::Config(ConfigError::MissingField("client_id".to_string()));
        assert_eq!(config.exit_code(), 1);

        let io = SubcastError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "File not found",
        ));
        assert_eq!(io.exit_code(), 1);
    }

    #[test]
    fn test_error_message_formatting_authentication() {
        let error = SubcastError::Platform(PlatformError::Authentication(
            "Reddit rejected the password grant".to_string(),
        ));
        assert_eq!(
            error.to_string(),
            "Platform error: Authentication failed: Reddit rejected the password grant"
        );
    }

    #[test]
    fn test_error_message_formatting_config() {
        let error = SubcastError::Config(ConfigError::MissingField("client_secret".to_string()));
        assert_eq!(
            error.to_string(),
            "Configuration error: Missing required field: client_secret"
        );
    }

    #[test]
    fn test_placeholder_message_names_file() {
        let error = ConfigError::Placeholder("credentials.json".to_string());
        let message = error.to_string();
        assert!(message.contains("credentials.json"));
        assert!(message.contains("sample values"));
    }

    #[test]
    fn test_invalid_delay_message() {
        let error = ConfigError::InvalidDelay { min: 90, max: 30 };
        assert_eq!(
            error.to_string(),
            "Invalid delay range: minimum 90s exceeds maximum 30s"
        );
    }

    #[test]
    fn test_platform_error_kinds() {
        assert_eq!(
            PlatformError::Authentication("x".into()).kind(),
            ErrorKind::Authentication
        );
        assert_eq!(
            PlatformError::NotFound("x".into()).kind(),
            ErrorKind::CommunityNotFound
        );
        assert_eq!(PlatformError::Forbidden("x".into()).kind(), ErrorKind::Forbidden);
        assert_eq!(PlatformError::RateLimit("x".into()).kind(), ErrorKind::RateLimited);
        assert_eq!(PlatformError::Network("x".into()).kind(), ErrorKind::Network);
        assert_eq!(PlatformError::Validation("x".into()).kind(), ErrorKind::Validation);
        assert_eq!(PlatformError::Posting("x".into()).kind(), ErrorKind::Submission);
    }

    #[test]
    fn test_error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::CommunityNotFound).unwrap();
        assert_eq!(json, "\"community_not_found\"");
        assert_eq!(ErrorKind::RateLimited.to_string(), "rate_limited");
    }

    #[test]
    fn test_error_conversion_from_platform_error() {
        let platform_error = PlatformError::Posting("test".to_string());
        let subcast_error: SubcastError = platform_error.into();

        match subcast_error {
            SubcastError::Platform(_) => {}
            _ => panic!("Expected SubcastError::Platform"),
        }
    }

    #[test]
    fn test_platform_error_clone() {
        let original = PlatformError::Network("Connection failed".to_string());
        let cloned = original.clone();

        assert_eq!(format!("{}", original), format!("{}", cloned));
    }
}
