//! # Logger
//!
//! Installs the process-wide `tracing` subscriber for relay binaries: a
//! compact console layer, an optional non-blocking rolling file layer (plain
//! or JSON), and an [`EnvFilter`] whose defaults come from [`LoggerConfig`]
//! and can still be overridden with `RUST_LOG`.
//!
//! The configuration is `serde`-deserializable, so it usually lives in the
//! `[logger]` table of the application config file.
//!
//! ## Example
//!
//! ```rust
//! use relay_logger::{Logger, LoggerConfig};
//!
//! let config = LoggerConfig::default().with_level("debug").with_env_filter("relay_events=trace");
//! let _logger = Logger::init("my-app", &config).unwrap();
//! ```

mod error;

pub use crate::error::{LoggerError, LoggerErrorExt};
pub use tracing::level_filters::LevelFilter;

use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const DEFAULT_MAX_FILES: usize = 10;
const DEFAULT_LEVEL: &str = "info";
const LOG_FILE_SUFFIX: &str = "log";

/// How often the file layer starts a new log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Minutely => Self::MINUTELY,
            LogRotation::Hourly => Self::HOURLY,
            LogRotation::Daily => Self::DAILY,
            LogRotation::Never => Self::NEVER,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggerConfig {
    /// Write compact, colored lines to stdout.
    pub console: bool,
    /// Default level directive (`error`, `warn`, `info`, `debug`, `trace`, `off`).
    pub level: String,
    /// Extra directives such as `relay_events=trace`. `RUST_LOG` is ignored when set.
    pub env_filter: Option<String>,
    /// Directory for rolling log files. No file output when absent.
    pub path: Option<PathBuf>,
    pub rotation: LogRotation,
    pub max_files: usize,
    /// Write file output as JSON lines.
    pub json: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            console: true,
            level: DEFAULT_LEVEL.to_owned(),
            env_filter: None,
            path: None,
            rotation: LogRotation::default(),
            max_files: DEFAULT_MAX_FILES,
            json: false,
        }
    }
}

impl LoggerConfig {
    #[must_use = "The config must be passed to Logger::init"]
    pub const fn with_console(mut self, enabled: bool) -> Self {
        self.console = enabled;
        self
    }

    #[must_use = "The config must be passed to Logger::init"]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    #[must_use = "The config must be passed to Logger::init"]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    #[must_use = "The config must be passed to Logger::init"]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use = "The config must be passed to Logger::init"]
    pub const fn with_rotation(mut self, rotation: LogRotation) -> Self {
        self.rotation = rotation;
        self
    }

    #[must_use = "The config must be passed to Logger::init"]
    pub const fn with_max_files(mut self, max: usize) -> Self {
        self.max_files = max;
        self
    }

    #[must_use = "The config must be passed to Logger::init"]
    pub const fn with_json(mut self, enabled: bool) -> Self {
        self.json = enabled;
        self
    }
}

/// A handle to the initialized logging system.
///
/// Holds the background worker guard of the file layer; keep it alive until
/// shutdown so buffered lines are flushed.
#[must_use = "Dropping this handle will stop background logging threads."]
#[derive(Debug)]
pub struct Logger {
    guard: Option<WorkerGuard>,
}

impl Logger {
    /// Validates `config` and installs the global tracing subscriber.
    ///
    /// `name` prefixes rolling log files (e.g., `relay.2026-10-18.log`).
    ///
    /// # Errors
    /// Returns [`LoggerError::InvalidConfiguration`] for an empty name, an
    /// unknown level, a malformed filter, zero `max_files`, or when neither
    /// console nor file output is enabled.
    /// Returns [`LoggerError::Subscriber`] if a global subscriber is already set.
    pub fn init(name: &str, config: &LoggerConfig) -> Result<Self, LoggerError> {
        validate_config(name, config)?;
        let env_filter = build_env_filter(config)?;

        let mut layers = Vec::new();
        if config.console {
            layers.push(layer().compact().with_ansi(true).boxed());
        }

        let guard = if let Some(path) = &config.path {
            fs::create_dir_all(path).map_err(|e| LoggerError::Internal {
                message: e.to_string().into(),
                context: Some(format!("Failed to create path: {}", path.display()).into()),
            })?;

            let appender = RollingFileAppender::builder()
                .rotation(config.rotation.into())
                .filename_prefix(name)
                .filename_suffix(LOG_FILE_SUFFIX)
                .max_log_files(config.max_files)
                .build(path)
                .context("Building rolling file appender")?;

            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = layer().with_writer(writer).with_ansi(false);
            layers.push(if config.json { file_layer.json().boxed() } else { file_layer.boxed() });
            Some(guard)
        } else {
            None
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(layers)
            .try_init()
            .context("Installing global subscriber")?;

        Ok(Self { guard })
    }

    /// Returns a reference to the file layer's worker guard, if present.
    #[must_use]
    pub const fn guard(&self) -> Option<&WorkerGuard> {
        self.guard.as_ref()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if self.guard.is_some() {
            tracing::info!("Logging system shutting down, flushing buffers...");
        }
    }
}

fn invalid(message: impl Into<std::borrow::Cow<'static, str>>) -> LoggerError {
    LoggerError::InvalidConfiguration { message: message.into(), context: None }
}

fn validate_config(name: &str, config: &LoggerConfig) -> Result<(), LoggerError> {
    if name.trim().is_empty() {
        return Err(invalid("Logger name cannot be empty"));
    }
    if !config.console && config.path.is_none() {
        return Err(invalid("No logging layers enabled. Enable console or file output."));
    }
    if config.path.is_some() && config.max_files == 0 {
        return Err(invalid("max_files must be greater than zero"));
    }
    Ok(())
}

fn build_env_filter(config: &LoggerConfig) -> Result<EnvFilter, LoggerError> {
    let level: LevelFilter = config
        .level
        .parse()
        .map_err(|e| invalid(format!("Invalid level '{}': {e}", config.level)))?;

    let builder = EnvFilter::builder().with_default_directive(level.into());
    config.env_filter.as_ref().map_or_else(
        || Ok(builder.from_env_lossy()),
        |filter| {
            builder
                .parse(filter)
                .map_err(|e| invalid(format!("Invalid env filter '{filter}': {e}")))
        },
    )
}
