//! Logging setup for the fabric server
//!
//! Console output always goes to stdout. When a log directory is configured,
//! everything is also written to `fabric.log` in it, rotated daily unless
//! `logging.rotation` says otherwise.
//! `RUST_LOG` overrides the configured level for every layer.

use std::path::PathBuf;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use fabric_common::Configuration;

/// Log rotation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRotation {
    /// Rotate daily (default)
    Daily,
    /// Rotate hourly
    Hourly,
    /// Never rotate (single file)
    Never,
}

impl std::str::FromStr for LogRotation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" => Ok(LogRotation::Daily),
            "hourly" => Ok(LogRotation::Hourly),
            "never" => Ok(LogRotation::Never),
            other => Err(format!("Invalid log rotation: {}", other)),
        }
    }
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Daily => Rotation::DAILY,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Never => Rotation::NEVER,
        }
    }
}

/// Logging configuration for the server process
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory for `fabric.log`; file logging is off when unset
    pub log_dir: Option<PathBuf>,
    /// Enable console output
    pub console_output: bool,
    /// Level used when `RUST_LOG` is not set
    pub level: Level,
    /// Log rotation policy
    pub rotation: LogRotation,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            console_output: true,
            level: Level::INFO,
            rotation: LogRotation::Daily,
        }
    }
}

impl LoggingConfig {
    /// Create from application configuration.
    pub fn from_configuration(configuration: &Configuration) -> Self {
        Self {
            log_dir: configuration.log_dir().map(PathBuf::from),
            level: configuration.log_level().parse().unwrap_or(Level::INFO),
            rotation: configuration
                .log_rotation()
                .parse()
                .unwrap_or(LogRotation::Daily),
            ..Default::default()
        }
    }
}

/// Guard that keeps the non-blocking file writer alive.
///
/// Must be held for the life of the process; dropping it flushes buffered
/// output.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()))
}

/// Initialize the global tracing subscriber
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard, Box<dyn std::error::Error>> {
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    let mut file_guard = None;

    if config.console_output {
        let console_layer = fmt::layer()
            .with_target(true)
            .with_thread_names(true)
            .with_filter(env_filter(config.level));
        layers.push(Box::new(console_layer));
    }

    if let Some(log_dir) = &config.log_dir {
        std::fs::create_dir_all(log_dir)?;
        let appender = RollingFileAppender::new(config.rotation.into(), log_dir, "fabric.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        file_guard = Some(guard);

        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_filter(env_filter(config.level));
        layers.push(Box::new(file_layer));
    }

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|e| format!("Failed to initialize logging: {}", e))?;

    if let Some(log_dir) = &config.log_dir {
        tracing::info!(log_dir = %log_dir.display(), "File logging initialized");
    }

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_common::config::{LOGGING_DIR, LOGGING_LEVEL, LOGGING_ROTATION};

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert!(config.console_output);
        assert!(config.log_dir.is_none());
        assert_eq!(config.level, Level::INFO);
    }

    #[test]
    fn test_logging_config_from_configuration() {
        let configuration = Configuration::default()
            .with_override(LOGGING_DIR, "/tmp/fabric-logs")
            .and_then(|c| c.with_override(LOGGING_LEVEL, "debug"))
            .unwrap();
        let config = LoggingConfig::from_configuration(&configuration);
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/fabric-logs")));
        assert_eq!(config.level, Level::DEBUG);
    }

    #[test]
    fn test_invalid_level_falls_back_to_info() {
        let configuration = Configuration::default()
            .with_override(LOGGING_LEVEL, "chatty")
            .unwrap();
        assert_eq!(LoggingConfig::from_configuration(&configuration).level, Level::INFO);
    }

    #[test]
    fn test_rotation_from_configuration() {
        let config = LoggingConfig::from_configuration(&Configuration::default());
        assert_eq!(config.rotation, LogRotation::Daily);

        for (value, expected) in [
            ("hourly", LogRotation::Hourly),
            ("NEVER", LogRotation::Never),
            ("weekly", LogRotation::Daily),
        ] {
            let configuration = Configuration::default()
                .with_override(LOGGING_ROTATION, value)
                .unwrap();
            assert_eq!(
                LoggingConfig::from_configuration(&configuration).rotation,
                expected,
                "rotation {}",
                value
            );
        }
    }

    #[test]
    fn test_log_rotation_conversion() {
        assert!(matches!(Rotation::from(LogRotation::Daily), Rotation::DAILY));
        assert!(matches!(Rotation::from(LogRotation::Hourly), Rotation::HOURLY));
        assert!(matches!(Rotation::from(LogRotation::Never), Rotation::NEVER));
    }
}
