//! Configuration Module
//!
//! This module defines all configuration structures for the batching engine.
//! Configuration is loaded from TOML files and parsed using serde; every
//! section falls back to built-in defaults when absent.
//!
//! # Example TOML
//! ```toml
//! [batch]
//! capacity = 50
//! timeout_secs = 30.0
//! heartbeat_secs = 1.0
//!
//! [storage]
//! url = "sqlite://batcher.db"
//! key = "telemetry.batch"
//! ```

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub batch: BatchSettings,
    pub storage: StorageSettings,
}

/// Batch policy settings
///
/// # Fields
/// - `capacity`: item count at which the heartbeat expires a batch
/// - `timeout_secs`: age at which the heartbeat expires a non-empty batch
/// - `heartbeat_secs`: evaluation cadence; fractional values give sub-second
///   heartbeats
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    pub capacity: usize,
    pub timeout_secs: f64,
    pub heartbeat_secs: f64,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            capacity: 50,
            timeout_secs: 30.0,
            heartbeat_secs: 1.0,
        }
    }
}

impl BatchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs)
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs_f64(self.heartbeat_secs)
    }
}

/// Durable storage settings
///
/// # Fields
/// - `url`: database connection URL for the SQLite-backed store
/// - `key`: store key under which this engine instance keeps its snapshot
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub url: String,
    pub key: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://batcher.db".to_string(),
            key: "telemetry.batch".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the TOML configuration file
    ///
    /// # Returns
    /// * `Ok(Config)` if the file was successfully loaded and validated
    /// * `Err` if the file couldn't be read or the TOML is invalid
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`, falling back to the defaults when the
    /// file does not exist.
    pub fn load_or_default(path: &str) -> anyhow::Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.batch.capacity > 0, "batch.capacity must be positive");
        anyhow::ensure!(
            self.batch.timeout_secs > 0.0 && self.batch.timeout_secs.is_finite(),
            "batch.timeout_secs must be a positive number"
        );
        anyhow::ensure!(
            self.batch.heartbeat_secs > 0.0 && self.batch.heartbeat_secs.is_finite(),
            "batch.heartbeat_secs must be a positive number"
        );
        anyhow::ensure!(!self.storage.key.is_empty(), "storage.key must not be empty");
        Ok(())
    }
}
