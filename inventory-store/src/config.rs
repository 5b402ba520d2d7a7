// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Store configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, StoreError};

/// Environment variable naming the store directory
pub const ENV_STORE_DIR: &str = "INVENTORY_STORE_DIR";
/// Environment variable overriding the compaction interval, in seconds
pub const ENV_COMPACTION_INTERVAL_SECS: &str = "INVENTORY_COMPACTION_INTERVAL_SECS";
/// Environment variable overriding the shared lock timeout, in seconds
pub const ENV_LOCK_TIMEOUT_SECS: &str = "INVENTORY_LOCK_TIMEOUT_SECS";

/// Configuration of a transaction-locking store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the base snapshot and commit log segments
    pub directory: Option<PathBuf>,

    /// How often the background task folds segments into the snapshot
    #[serde(with = "duration_secs")]
    pub compaction_interval: Duration,

    /// Maximum wait for the shared lock when opening a transaction
    #[serde(with = "duration_secs")]
    pub lock_timeout: Duration,

    /// Maximum wait for the background task to stop at shutdown
    #[serde(with = "duration_secs")]
    pub shutdown_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            directory: None,
            compaction_interval: Duration::from_secs(60 * 60), // 1 hour
            lock_timeout: Duration::from_secs(10),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl StoreConfig {
    /// Default configuration for a store in `directory`
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: Some(directory.into()),
            ..Self::default()
        }
    }

    /// Build a configuration from the `INVENTORY_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var(ENV_STORE_DIR) {
            if !dir.trim().is_empty() {
                config.directory = Some(PathBuf::from(dir));
            }
        }
        if let Some(secs) = read_secs(ENV_COMPACTION_INTERVAL_SECS)? {
            config.compaction_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = read_secs(ENV_LOCK_TIMEOUT_SECS)? {
            config.lock_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    pub fn with_compaction_interval(mut self, interval: Duration) -> Self {
        self.compaction_interval = interval;
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// The configured directory, or a configuration error when it is missing
    pub fn require_directory(&self) -> Result<&Path> {
        self.directory.as_deref().ok_or_else(|| {
            StoreError::Config(format!(
                "no store directory configured (set {} or StoreConfig::directory)",
                ENV_STORE_DIR
            ))
        })
    }

    /// Validate the configuration before opening a store
    pub fn validate(&self) -> Result<()> {
        self.require_directory()?;
        if self.compaction_interval.is_zero() {
            return Err(StoreError::Config(
                "compaction interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn read_secs(name: &str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| StoreError::Config(format!("{} must be a whole number of seconds, got '{}'", name, raw))),
        Err(_) => Ok(None),
    }
}

/// Serialize durations as whole seconds
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
