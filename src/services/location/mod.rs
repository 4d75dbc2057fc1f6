//! Storage Location Manager
//!
//! User-facing operations on the base directory and its fixed subtrees:
//! inspect paths and usage, validate and link an existing data directory,
//! move or export the tree, import a tree with backup-and-rollback, and
//! clear the cache. Everything returns a structured report; expected
//! failures never cross the manager boundary as errors.
//!
//! These operations work at the filesystem level, independent of the router
//! abstraction over the same tree.

mod cache;
mod transfer;

use std::path::Path;
use std::sync::Arc;

use tokio::fs;
use tokio::sync::RwLock;
use tracing::info;

use crate::models::report::{
    ClearCacheReport, ExportReport, OperationReport, StorageLocations, StorageUsage,
    ValidationReport,
};
use crate::storage::config::StorageConfigService;
use crate::utils::error::{StorageError, StorageResult};
use crate::utils::fs::dir_size;
use crate::utils::paths::app_data_root;

/// Manager of the storage base directory
pub struct StorageLocationManager {
    config: Arc<RwLock<StorageConfigService>>,
}

impl StorageLocationManager {
    pub fn new(config: Arc<RwLock<StorageConfigService>>) -> Self {
        Self { config }
    }

    /// The current base path and its derived `projects/`, `media/`, `cache/`
    /// locations
    pub async fn locations(&self) -> StorageResult<StorageLocations> {
        let base = self.config.read().await.effective_base()?;
        Ok(StorageLocations::from_base(&base))
    }

    /// Byte sizes of the data subtrees, for the storage settings panel
    pub async fn usage(&self) -> StorageResult<StorageUsage> {
        let locations = self.locations().await?;
        Ok(StorageUsage {
            projects_bytes: dir_size(&locations.projects_path).await?,
            media_bytes: dir_size(&locations.media_path).await?,
            cache_bytes: dir_size(&locations.cache_path).await?,
        })
    }

    /// Whether `dir` holds a linkable data tree
    pub async fn validate(&self, dir: &Path) -> ValidationReport {
        match validate_data_dir(dir).await {
            Ok(()) => ValidationReport::valid(),
            Err(e) => ValidationReport::invalid(e),
        }
    }

    /// Point configuration at an existing data directory without moving any
    /// bytes. The directory must pass validation.
    pub async fn link(&self, dir: &Path) -> OperationReport {
        self.try_link(dir).await.into()
    }

    async fn try_link(&self, dir: &Path) -> StorageResult<()> {
        validate_data_dir(dir).await?;
        self.config.write().await.set_base(dir).await?;
        info!("Storage linked to {}", dir.display());
        Ok(())
    }

    /// Move the data tree to `new_base`: conflict check, copy, re-point
    /// configuration, then delete the old subtrees unless they sit inside
    /// the immutable user-data root. A conflicting target is rejected with
    /// zero filesystem mutation.
    pub async fn move_to(&self, new_base: &Path) -> OperationReport {
        self.try_move(new_base).await.into()
    }

    async fn try_move(&self, new_base: &Path) -> StorageResult<()> {
        let old = self.locations().await?;
        transfer::check_move_conflict(&old.base_path, new_base)?;

        transfer::copy_data_tree(&old, new_base).await?;
        self.config.write().await.set_base(new_base).await?;
        transfer::remove_old_data_tree(&old, &app_data_root()?).await?;

        info!(
            "Storage moved from {} to {}",
            old.base_path.display(),
            new_base.display()
        );
        Ok(())
    }

    /// Copy the data tree into a timestamp-named archive under `target`.
    /// Live data is never touched.
    pub async fn export_to(&self, target: &Path) -> ExportReport {
        let result = async {
            let locations = self.locations().await?;
            transfer::export_data_tree(&locations, target).await
        }
        .await;

        match result {
            Ok(archive) => ExportReport::ok(archive),
            Err(e) => ExportReport::err(e),
        }
    }

    /// Replace the live data tree with the contents of `source`, rolling
    /// back to a pre-operation backup if the replacement fails partway.
    pub async fn import_from(&self, source: &Path) -> OperationReport {
        let result = async {
            let locations = self.locations().await?;
            transfer::import_data_tree(&locations, source).await
        }
        .await;
        result.into()
    }

    /// Clear the cache. With `None` the whole cache directory is dropped and
    /// recreated empty; with `Some(days)` only files older than the cutoff
    /// are deleted and emptied subdirectories pruned.
    pub async fn clear_cache(&self, older_than_days: Option<u32>) -> ClearCacheReport {
        let result = async {
            let locations = self.locations().await?;
            match older_than_days {
                None => cache::clear_all(&locations.cache_path).await,
                Some(days) => cache::clear_older_than(&locations.cache_path, days).await,
            }
        }
        .await;

        match result {
            Ok(freed) => ClearCacheReport::ok(freed),
            Err(e) => ClearCacheReport::err(e),
        }
    }

    /// Age-based cache clean driven by the `autoCleanEnabled` and
    /// `autoCleanDays` configuration fields, run at startup by the engine.
    /// Returns the bytes freed, 0 when disabled.
    pub async fn run_auto_clean(&self) -> StorageResult<u64> {
        let (enabled, days) = {
            let config = self.config.read().await;
            (config.config().auto_clean_enabled, config.config().auto_clean_days)
        };
        if !enabled {
            return Ok(0);
        }

        let locations = self.locations().await?;
        let freed = cache::clear_older_than(&locations.cache_path, days).await?;
        if freed > 0 {
            info!("Auto-clean freed {} cache bytes older than {} days", freed, days);
        }
        Ok(freed)
    }
}

/// A directory is linkable when its `projects/` subfolder holds at least one
/// JSON store file or per-project subfolder, or its `media/` subfolder is
/// non-empty.
async fn validate_data_dir(dir: &Path) -> StorageResult<()> {
    if dir.as_os_str().is_empty() {
        return Err(StorageError::validation("storage path is empty"));
    }
    if !fs::try_exists(dir).await? {
        return Err(StorageError::validation(format!(
            "directory does not exist: {}",
            dir.display()
        )));
    }

    let projects = dir.join("projects");
    if fs::try_exists(&projects).await? {
        let mut entries = fs::read_dir(&projects).await?;
        while let Some(entry) = entries.next_entry().await? {
            let is_dir = entry.file_type().await?.is_dir();
            let name = entry.file_name().to_string_lossy().to_string();
            if is_dir || name.ends_with(".json") {
                return Ok(());
            }
        }
    }

    let media = dir.join("media");
    if fs::try_exists(&media).await? {
        let mut entries = fs::read_dir(&media).await?;
        if entries.next_entry().await?.is_some() {
            return Ok(());
        }
    }

    Err(StorageError::validation(format!(
        "{} does not contain recognizable storage data (no projects/ stores or media/ files)",
        dir.display()
    )))
}
