//! Storage Configuration Management
//!
//! Reads and writes `storage-config.json`. The file lives in the app data
//! directory, never inside the movable base path, so a relocated or broken
//! data tree can always be found again on the next launch.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::warn;

use crate::models::config::StorageConfig;
use crate::utils::error::StorageResult;
use crate::utils::fs::write_atomic;
use crate::utils::paths::default_base_path;

/// Configuration service for the storage engine
#[derive(Debug)]
pub struct StorageConfigService {
    config_path: PathBuf,
    config: StorageConfig,
}

impl StorageConfigService {
    /// Load the config at `config_path`, falling back to defaults when the
    /// file is missing or unreadable. A broken config must never prevent
    /// startup; the engine falls back to the default location and logs.
    pub async fn load(config_path: PathBuf) -> Self {
        let config = match fs::read_to_string(&config_path).await {
            Ok(raw) => match serde_json::from_str::<StorageConfig>(&raw) {
                Ok(config) => config,
                Err(e) => {
                    warn!("Storage config at {:?} is malformed, using defaults: {}", config_path, e);
                    StorageConfig::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StorageConfig::default(),
            Err(e) => {
                warn!("Failed to read storage config at {:?}, using defaults: {}", config_path, e);
                StorageConfig::default()
            }
        };

        Self {
            config_path,
            config,
        }
    }

    /// Get the current configuration
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Get a clone of the current configuration
    pub fn config_clone(&self) -> StorageConfig {
        self.config.clone()
    }

    /// The base path all storage lives under, resolving the configured
    /// value against the platform default
    pub fn effective_base(&self) -> StorageResult<PathBuf> {
        let fallback = default_base_path()?;
        Ok(self.config.effective_base(&fallback))
    }

    /// Point the config at a new base path and persist it
    pub async fn set_base(&mut self, base: &Path) -> StorageResult<()> {
        self.config.set_base(base);
        self.save().await
    }

    /// Apply an in-place update and persist it
    pub async fn update<F>(&mut self, apply: F) -> StorageResult<()>
    where
        F: FnOnce(&mut StorageConfig),
    {
        apply(&mut self.config);
        self.save().await
    }

    /// Save the current configuration to disk
    pub async fn save(&self) -> StorageResult<()> {
        let content = serde_json::to_string_pretty(&self.config)?;
        write_atomic(&self.config_path, &content).await
    }
}
