//! Project Data Service
//!
//! Explicit cleanup of per-project files. Deleting a project from the index
//! does not prune its data automatically; the application calls in here when
//! the user confirms the data should go too, and can list orphaned project
//! directories left behind by earlier deletions.

use std::sync::Arc;

use crate::context::StorageContext;
use crate::models::stores::{project_dir_key, PER_PROJECT_DIR};
use crate::storage::kv::KvStore;
use crate::utils::error::StorageResult;

/// Service for per-project data lifecycle
pub struct ProjectDataService {
    kv: Arc<dyn KvStore>,
    context: Arc<StorageContext>,
}

impl ProjectDataService {
    pub fn new(kv: Arc<dyn KvStore>, context: Arc<StorageContext>) -> Self {
        Self { kv, context }
    }

    /// Delete every per-project file of `project_id`. Shared partitions and
    /// legacy files are untouched. Returns whether anything existed.
    pub async fn delete_project_data(&self, project_id: &str) -> StorageResult<bool> {
        self.kv.remove_prefix(&project_dir_key(project_id)).await
    }

    /// Project ids that have at least one per-project file on disk,
    /// whether or not the index still lists them
    pub async fn data_project_ids(&self) -> StorageResult<Vec<String>> {
        let keys = self.kv.list_keys(PER_PROJECT_DIR).await?;
        let mut ids: Vec<String> = keys
            .iter()
            .filter_map(|key| {
                // "_p/{pid}/{store}"; entries directly under _p/, such as
                // the migration sentinel, have no project directory.
                let rest = key.strip_prefix(PER_PROJECT_DIR)?.strip_prefix('/')?;
                let (project_id, _store) = rest.split_once('/')?;
                Some(project_id.to_string())
            })
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    /// Per-project directories whose project is no longer in the index
    pub async fn orphaned_project_ids(&self) -> StorageResult<Vec<String>> {
        let known = self.context.known_project_ids().await;
        let ids = self.data_project_ids().await?;
        Ok(ids.into_iter().filter(|id| !known.contains(id)).collect())
    }
}
