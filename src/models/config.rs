//! Storage Configuration Model
//!
//! The shape of `storage-config.json`. The file lives in the immutable
//! app-data root, never inside the movable base path. `projectPath` and
//! `mediaPath` are legacy fields older builds still read; they are kept in
//! sync with `basePath` on every save.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

fn default_auto_clean_days() -> u32 {
    30
}

/// Persisted storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    /// Root of the movable data tree (`projects/`, `media/`, `cache/`)
    #[serde(default)]
    pub base_path: Option<PathBuf>,
    /// Legacy: direct path of the projects directory
    #[serde(default)]
    pub project_path: Option<PathBuf>,
    /// Legacy: direct path of the media directory
    #[serde(default)]
    pub media_path: Option<PathBuf>,
    /// Clear stale cache files automatically at startup
    #[serde(default)]
    pub auto_clean_enabled: bool,
    /// Age threshold in days for automatic cache cleaning
    #[serde(default = "default_auto_clean_days")]
    pub auto_clean_days: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: None,
            project_path: None,
            media_path: None,
            auto_clean_enabled: false,
            auto_clean_days: default_auto_clean_days(),
        }
    }
}

impl StorageConfig {
    /// Resolve the effective base path: an explicit `basePath` wins, then the
    /// parent of a legacy `projectPath`, then the supplied default.
    pub fn effective_base(&self, fallback: &Path) -> PathBuf {
        if let Some(ref base) = self.base_path {
            return base.clone();
        }
        if let Some(parent) = self
            .project_path
            .as_deref()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
        {
            return parent.to_path_buf();
        }
        fallback.to_path_buf()
    }

    /// Point the configuration at a new base path, keeping the legacy
    /// fields in sync for older builds reading the same file.
    pub fn set_base(&mut self, base: &Path) {
        self.base_path = Some(base.to_path_buf());
        self.project_path = Some(base.join("projects"));
        self.media_path = Some(base.join("media"));
    }
}
