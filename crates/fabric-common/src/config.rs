//! Configuration consumed by fabric components
//!
//! The data fabric never loads configuration files itself. An embedding process
//! builds a `config::Config` from whatever sources it likes and hands it over
//! wrapped in a [`Configuration`]; every component reads its settings through
//! the typed getters below, which fall back to defaults for missing keys.

use std::time::Duration;

use config::{Config, Value};

use crate::error::FabricError;
use crate::utils::local_ip;

pub const DATASET_EXECUTOR_ADDRESS: &str = "dataset.executor.address";
pub const DATASET_EXECUTOR_ANNOUNCE_ADDRESS: &str = "dataset.executor.announce.address";
pub const DATASET_EXECUTOR_PORT: &str = "dataset.executor.port";
pub const DATASET_EXECUTOR_THREADS: &str = "dataset.executor.threads";
pub const DISCOVERY_RESOLVE_TIMEOUT_MS: &str = "discovery.resolve.timeout.ms";
pub const DATASET_NAMESPACE: &str = "dataset.namespace";
pub const STATS_INTERVAL_MS: &str = "stats.interval.ms";
pub const LOGGING_DIR: &str = "logging.dir";
pub const LOGGING_LEVEL: &str = "logging.level";
pub const LOGGING_ROTATION: &str = "logging.rotation";

pub const DEFAULT_EXECUTOR_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_EXECUTOR_PORT: u16 = 15165;
pub const DEFAULT_EXECUTOR_THREADS: usize = 20;
pub const DEFAULT_RESOLVE_TIMEOUT_MS: u64 = 1000;
pub const DEFAULT_STATS_INTERVAL_MS: u64 = 30_000;
pub const DEFAULT_LOGGING_LEVEL: &str = "info";
pub const DEFAULT_LOGGING_ROTATION: &str = "daily";

/// Typed view over a `config::Config`
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub config: Config,
}

impl Configuration {
    pub fn new(config: Config) -> Self {
        Configuration { config }
    }

    /// Returns a copy of this configuration with one key overridden
    pub fn with_override<V>(self, key: &str, value: V) -> Result<Self, FabricError>
    where
        V: Into<Value>,
    {
        let config = Config::builder()
            .add_source(self.config)
            .set_override(key, value)?
            .build()?;
        Ok(Configuration { config })
    }

    // ========================================================================
    // Dataset Executor Service
    // ========================================================================

    pub fn executor_address(&self) -> String {
        self.config
            .get_string(DATASET_EXECUTOR_ADDRESS)
            .unwrap_or(DEFAULT_EXECUTOR_ADDRESS.to_string())
    }

    /// Host announced through discovery.
    ///
    /// A wildcard bind address is not reachable by clients, so it is replaced
    /// with the first non-loopback interface address.
    pub fn executor_announce_address(&self) -> String {
        if let Ok(address) = self.config.get_string(DATASET_EXECUTOR_ANNOUNCE_ADDRESS) {
            return address;
        }
        let address = self.executor_address();
        if address == "0.0.0.0" || address == "::" {
            local_ip()
        } else {
            address
        }
    }

    pub fn executor_port(&self) -> u16 {
        self.config
            .get_int(DATASET_EXECUTOR_PORT)
            .ok()
            .and_then(|v| u16::try_from(v).ok())
            .unwrap_or(DEFAULT_EXECUTOR_PORT)
    }

    pub fn executor_threads(&self) -> usize {
        self.config
            .get_int(DATASET_EXECUTOR_THREADS)
            .ok()
            .and_then(|v| usize::try_from(v).ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_EXECUTOR_THREADS)
    }

    // ========================================================================
    // Discovery & Clients
    // ========================================================================

    pub fn resolve_timeout(&self) -> Duration {
        let millis = self
            .config
            .get_int(DISCOVERY_RESOLVE_TIMEOUT_MS)
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .unwrap_or(DEFAULT_RESOLVE_TIMEOUT_MS);
        Duration::from_millis(millis)
    }

    pub fn dataset_namespace(&self) -> String {
        self.config
            .get_string(DATASET_NAMESPACE)
            .unwrap_or(crate::DEFAULT_NAMESPACE.to_string())
    }

    // ========================================================================
    // Background Workers
    // ========================================================================

    pub fn stats_interval(&self) -> Duration {
        let millis = self
            .config
            .get_int(STATS_INTERVAL_MS)
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_STATS_INTERVAL_MS);
        Duration::from_millis(millis)
    }

    // ========================================================================
    // Logging
    // ========================================================================

    pub fn log_dir(&self) -> Option<String> {
        self.config.get_string(LOGGING_DIR).ok()
    }

    pub fn log_level(&self) -> String {
        self.config
            .get_string(LOGGING_LEVEL)
            .unwrap_or(DEFAULT_LOGGING_LEVEL.to_string())
    }

    /// Rotation of the log file: `daily`, `hourly` or `never`
    pub fn log_rotation(&self) -> String {
        self.config
            .get_string(LOGGING_ROTATION)
            .unwrap_or(DEFAULT_LOGGING_ROTATION.to_string())
    }
}
