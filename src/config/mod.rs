//! Configuration management for rollcall
//!
//! This module handles loading and validating configuration from environment variables
//! and TOML files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::storage::queue::DEFAULT_QUEUE_KEY;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote sink configuration
    pub sink: SinkConfig,

    /// Local queue persistence
    pub storage: StorageConfig,

    /// Connectivity probing
    pub connectivity: ConnectivityConfig,

    /// Sync behavior
    pub sync: SyncConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Remote sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Base URL of the REST endpoint (e.g. `https://xyz.supabase.co`)
    pub url: String,

    /// Collection (table) the records are inserted into
    pub collection: String,

    /// API key, sent as `apikey` and bearer token
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// In-call retries for transient failures
    pub max_retries: u32,

    /// Base delay for in-call retry backoff, in milliseconds
    pub retry_base_delay_ms: u64,

    /// Ask the remote to ignore rows whose `id` already exists
    pub idempotent: bool,
}

impl SinkConfig {
    /// Request timeout as Duration
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// First in-call retry delay
    #[must_use]
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            url: String::from("http://localhost:54321"),
            collection: String::from("attendance"),
            api_key: None,
            timeout_secs: 10,
            max_retries: 2,
            retry_base_delay_ms: 500,
            idempotent: true,
        }
    }
}

/// Which persistence backend holds the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sqlite,
    File,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown storage backend: {other}")),
        }
    }
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::File => write!(f, "file"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Local persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend kind
    pub backend: StorageBackend,

    /// SQLite database file, or directory for the file backend
    pub path: PathBuf,

    /// Key under which the queue blob is stored
    pub queue_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            path: PathBuf::from("data/rollcall.db"),
            queue_key: String::from(DEFAULT_QUEUE_KEY),
        }
    }
}

/// Connectivity probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    /// URL probed for reachability; defaults to the sink URL
    pub probe_url: Option<String>,

    /// Seconds between probes
    pub probe_interval_secs: u64,

    /// Probe request timeout in seconds
    pub probe_timeout_secs: u64,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_url: None,
            probe_interval_secs: 15,
            probe_timeout_secs: 5,
        }
    }
}

/// Sync behavior
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Periodic drain attempt while online, in seconds (0 disables)
    pub retry_interval_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse::<T>().ok())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let url = std::env::var("ROLLCALL_SINK_URL").unwrap_or(defaults.sink.url);
        let collection =
            std::env::var("ROLLCALL_SINK_COLLECTION").unwrap_or(defaults.sink.collection);
        let api_key = std::env::var("ROLLCALL_SINK_API_KEY").ok();

        let timeout_secs =
            env_parse("ROLLCALL_SINK_TIMEOUT").unwrap_or(defaults.sink.timeout_secs);
        let max_retries =
            env_parse("ROLLCALL_SINK_MAX_RETRIES").unwrap_or(defaults.sink.max_retries);
        let idempotent = env_parse("ROLLCALL_SINK_IDEMPOTENT").unwrap_or(defaults.sink.idempotent);

        let backend = match std::env::var("ROLLCALL_STORAGE_BACKEND") {
            Ok(raw) => raw.parse().map_err(Error::Config)?,
            Err(_) => defaults.storage.backend,
        };
        let path = std::env::var("ROLLCALL_STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.storage.path);
        let queue_key = std::env::var("ROLLCALL_QUEUE_KEY").unwrap_or(defaults.storage.queue_key);

        let probe_url = std::env::var("ROLLCALL_PROBE_URL").ok();
        let probe_interval_secs = env_parse("ROLLCALL_PROBE_INTERVAL")
            .unwrap_or(defaults.connectivity.probe_interval_secs);

        let retry_interval_secs =
            env_parse("ROLLCALL_RETRY_INTERVAL").unwrap_or(defaults.sync.retry_interval_secs);

        let level = std::env::var("ROLLCALL_LOG_LEVEL").unwrap_or(defaults.logging.level);
        let format = std::env::var("ROLLCALL_LOG_FORMAT").unwrap_or(defaults.logging.format);

        Ok(Self {
            sink: SinkConfig {
                url,
                collection,
                api_key,
                timeout_secs,
                max_retries,
                idempotent,
                ..defaults.sink
            },
            storage: StorageConfig {
                backend,
                path,
                queue_key,
            },
            connectivity: ConnectivityConfig {
                probe_url,
                probe_interval_secs,
                ..defaults.connectivity
            },
            sync: SyncConfig {
                retry_interval_secs,
            },
            logging: LoggingConfig { level, format },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file {}: {e}", path.display()))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            Error::config(format!("Failed to parse TOML config file {}: {e}", path.display()))
        })?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.sink.url.starts_with("http://") && !self.sink.url.starts_with("https://") {
            return Err(Error::config("sink.url must start with http:// or https://"));
        }

        if self.sink.collection.trim().is_empty() {
            return Err(Error::config("sink.collection must not be empty"));
        }

        if self.sink.timeout_secs == 0 {
            return Err(Error::config("sink.timeout_secs must be greater than 0"));
        }

        if self.storage.queue_key.trim().is_empty() {
            return Err(Error::config("storage.queue_key must not be empty"));
        }

        if self.connectivity.probe_interval_secs == 0 {
            return Err(Error::config("connectivity.probe_interval_secs must be greater than 0"));
        }

        Ok(())
    }

    /// URL probed for connectivity
    #[must_use]
    pub fn probe_url(&self) -> &str {
        self.connectivity
            .probe_url
            .as_deref()
            .unwrap_or(&self.sink.url)
    }

    #[must_use]
    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.connectivity.probe_interval_secs)
    }

    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.connectivity.probe_timeout_secs)
    }

    /// Periodic retry interval, if enabled
    #[must_use]
    pub fn retry_interval(&self) -> Option<Duration> {
        match self.sync.retry_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
