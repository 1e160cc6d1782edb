//! Tracing setup shared by `sub-post` and `sub-dash`
//!
//! Everything logs to stderr so stdout stays free for command output. The
//! format is text, JSON lines, or pretty. An optional log file receives the
//! same events as plain text.
//!
//! ```no_run
//! use libsubcast::logging::{LogFormat, LoggingConfig};
//!
//! LoggingConfig::new(LogFormat::Json, "info".to_string(), false)
//!     .with_log_file("subcast.log")
//!     .init();
//! ```
//!
//! Binaries normally call [`from_env`], which reads `SUBCAST_LOG_FORMAT`,
//! `SUBCAST_LOG_LEVEL` and `SUBCAST_LOG_FILE`.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;

/// Dependencies that are chatty at debug level
const QUIET_TARGETS: &[&str] = &["hyper=warn", "hyper_util=warn", "reqwest=info", "rustls=warn"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Plain lines, no colors
    Text,
    /// One JSON object per line
    Json,
    /// Multi-line colored output
    Pretty,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
            LogFormat::Pretty => "pretty",
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [LogFormat::Text, LogFormat::Json, LogFormat::Pretty]
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown log format '{}' (expected text, json or pretty)", s))
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct LoggingConfig {
    pub format: LogFormat,
    /// Default filter directive, e.g. `info` or `libsubcast=debug`
    pub level: String,
    /// Forces `debug` unless `RUST_LOG` is set
    pub verbose: bool,
    pub log_file: Option<PathBuf>,
}

impl LoggingConfig {
    pub fn new(format: LogFormat, level: String, verbose: bool) -> Self {
        Self {
            format,
            level,
            verbose,
            log_file: None,
        }
    }

    /// Also append plain-text log lines to `path`
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Filter used when `RUST_LOG` is absent
    pub fn directive(&self) -> String {
        let base = if self.verbose { "debug" } else { self.level.as_str() };
        std::iter::once(base)
            .chain(QUIET_TARGETS.iter().copied())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Install the global subscriber
    ///
    /// A log file that cannot be opened is reported on stderr and skipped.
    ///
    /// # Panics
    ///
    /// Panics if a global subscriber is already installed.
    pub fn init(&self) {
        use tracing_subscriber::fmt;
        use tracing_subscriber::prelude::*;
        use tracing_subscriber::EnvFilter;

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.directive()));

        let file_layer = self.log_file.as_ref().and_then(|path| {
            match OpenOptions::new().create(true).append(true).open(path) {
                Ok(file) => Some(
                    fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                ),
                Err(e) => {
                    eprintln!("Warning: cannot open log file {}: {}", path.display(), e);
                    None
                }
            }
        });

        let registry = tracing_subscriber::registry().with(filter).with(file_layer);

        match self.format {
            LogFormat::Json => registry
                .with(
                    fmt::layer()
                        .json()
                        .flatten_event(true)
                        .with_current_span(false)
                        .with_writer(std::io::stderr),
                )
                .init(),
            LogFormat::Pretty => registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_file(true)
                        .with_line_number(true)
                        .with_writer(std::io::stderr),
                )
                .init(),
            LogFormat::Text => registry
                .with(
                    fmt::layer()
                        .with_ansi(false)
                        .with_target(false)
                        .with_writer(std::io::stderr),
                )
                .init(),
        }
    }
}

/// [`from_env`] without verbose, installed immediately
pub fn init_default() {
    from_env(false).init();
}

/// Build a configuration from the `SUBCAST_LOG_*` environment variables
///
/// Unset or unparseable values fall back to text format at `info`.
pub fn from_env(verbose: bool) -> LoggingConfig {
    let format = std::env::var("SUBCAST_LOG_FORMAT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(LogFormat::Text);
    let level = std::env::var("SUBCAST_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let config = LoggingConfig::new(format, level, verbose);
    match std::env::var_os("SUBCAST_LOG_FILE") {
        Some(path) if !path.is_empty() => config.with_log_file(path),
        _ => config,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in ["SUBCAST_LOG_FORMAT", "SUBCAST_LOG_LEVEL", "SUBCAST_LOG_FILE"] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_format_parsing_ignores_case() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("Pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert_eq!("text".parse::<LogFormat>(), Ok(LogFormat::Text));
        assert!("yaml".parse::<LogFormat>().unwrap_err().contains("'yaml'"));
    }

    #[test]
    fn test_format_display_round_trips() {
        for format in [LogFormat::Text, LogFormat::Json, LogFormat::Pretty] {
            assert_eq!(format.to_string().parse::<LogFormat>(), Ok(format));
        }
    }

    #[test]
    fn test_directive_quiets_http_stack() {
        let config = LoggingConfig::new(LogFormat::Text, "warn".to_string(), false);
        let directive = config.directive();
        assert!(directive.starts_with("warn,"));
        assert!(directive.contains("hyper=warn"));
    }

    #[test]
    fn test_verbose_overrides_level() {
        let config = LoggingConfig::new(LogFormat::Text, "error".to_string(), true);
        assert!(config.directive().starts_with("debug,"));
    }

    #[test]
    #[serial]
    fn test_from_env_reads_variables() {
        clear_env();
        std::env::set_var("SUBCAST_LOG_FORMAT", "json");
        std::env::set_var("SUBCAST_LOG_LEVEL", "trace");
        std::env::set_var("SUBCAST_LOG_FILE", "/tmp/subcast-test.log");

        let config = from_env(false);
        clear_env();

        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, "trace");
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/subcast-test.log")));
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        std::env::set_var("SUBCAST_LOG_FORMAT", "xml");

        let config = from_env(true);
        clear_env();

        assert_eq!(config.format, LogFormat::Text);
        assert_eq!(config.level, "info");
        assert!(config.verbose);
        assert!(config.log_file.is_none());
    }
}
