//! Configuration types shared across crates.

use crate::plan::PlanLimits;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// HTTP server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
    /// Maximum body size for create-session requests.
    /// Bounds the declared `chunk_hashes` list (~70 bytes per entry as JSON).
    #[serde(default = "default_max_create_body_bytes")]
    pub max_create_body_bytes: usize,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_max_create_body_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            metrics_enabled: default_metrics_enabled(),
            max_create_body_bytes: default_max_create_body_bytes(),
        }
    }
}

/// Chunk storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage.
    Filesystem {
        /// Root directory for storage.
        path: PathBuf,
    },
    /// Process memory. Contents are lost on restart.
    Memory,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/chunks"),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            StorageConfig::Filesystem { path } if path.as_os_str().is_empty() => {
                Err("storage.path cannot be empty".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// Upload session configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Chunk size suggested to clients.
    #[serde(default = "default_chunk_size")]
    pub default_chunk_size: u32,
    /// Minimum accepted chunk size in bytes.
    #[serde(default = "default_min_chunk_size")]
    pub min_chunk_size: u32,
    /// Maximum accepted chunk size in bytes.
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: u32,
    /// Maximum accepted file size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Sessions without activity for this long expire.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Interval between expiry sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// How long terminal sessions stay queryable before removal.
    #[serde(default = "default_terminal_retention_secs")]
    pub terminal_retention_secs: u64,
    /// Maximum parallel chunk uploads per session, advertised to clients.
    #[serde(default = "default_max_parallel_chunks")]
    pub max_parallel_chunks: u32,
    /// Buffer size of the committed-file event channel.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

fn default_chunk_size() -> u32 {
    crate::DEFAULT_CHUNK_SIZE
}

fn default_min_chunk_size() -> u32 {
    crate::MIN_CHUNK_SIZE
}

fn default_max_chunk_size() -> u32 {
    crate::MAX_CHUNK_SIZE
}

fn default_max_file_size() -> u64 {
    crate::MAX_FILE_SIZE
}

fn default_idle_timeout_secs() -> u64 {
    86400 // 24 hours
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_terminal_retention_secs() -> u64 {
    3600
}

fn default_max_parallel_chunks() -> u32 {
    4
}

fn default_event_channel_capacity() -> usize {
    1024
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            default_chunk_size: default_chunk_size(),
            min_chunk_size: default_min_chunk_size(),
            max_chunk_size: default_max_chunk_size(),
            max_file_size: default_max_file_size(),
            idle_timeout_secs: default_idle_timeout_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            terminal_retention_secs: default_terminal_retention_secs(),
            max_parallel_chunks: default_max_parallel_chunks(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

impl UploadConfig {
    /// Get the idle timeout as a Duration.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Get the sweep interval as a Duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Get the terminal retention as a Duration.
    pub fn terminal_retention(&self) -> Duration {
        Duration::from_secs(self.terminal_retention_secs)
    }

    /// Plan bounds derived from this configuration.
    pub fn plan_limits(&self) -> PlanLimits {
        PlanLimits {
            min_chunk_size: self.min_chunk_size,
            max_chunk_size: self.max_chunk_size,
            max_file_size: self.max_file_size,
        }
    }

    /// Validate upload configuration for settings that would break at runtime.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_chunk_size == 0 {
            return Err("upload.min_chunk_size cannot be 0".to_string());
        }
        if self.min_chunk_size > self.max_chunk_size {
            return Err(format!(
                "upload.min_chunk_size {} exceeds upload.max_chunk_size {}",
                self.min_chunk_size, self.max_chunk_size
            ));
        }
        if !(self.min_chunk_size..=self.max_chunk_size).contains(&self.default_chunk_size) {
            return Err(format!(
                "upload.default_chunk_size {} must be between {} and {}",
                self.default_chunk_size, self.min_chunk_size, self.max_chunk_size
            ));
        }
        // tokio::time::interval panics on a zero period
        if self.sweep_interval_secs == 0 {
            return Err("upload.sweep_interval_secs cannot be 0".to_string());
        }
        if self.idle_timeout_secs == 0 {
            return Err("upload.idle_timeout_secs cannot be 0".to_string());
        }
        // tokio::sync::broadcast::channel panics on zero capacity
        if self.event_channel_capacity == 0 {
            return Err("upload.event_channel_capacity cannot be 0".to_string());
        }
        Ok(())
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Chunk storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Upload session configuration.
    #[serde(default)]
    pub upload: UploadConfig,
}

impl AppConfig {
    /// Create a test configuration: in-memory storage and small chunks.
    ///
    /// **For testing only.**
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::Memory,
            upload: UploadConfig {
                default_chunk_size: 4,
                min_chunk_size: 1,
                ..UploadConfig::default()
            },
        }
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), String> {
        self.storage.validate()?;
        self.upload.validate()
    }
}
