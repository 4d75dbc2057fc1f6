//! Project Router
//!
//! Routes whole-file stores (script, breakdown, director, timeline) to
//! `_p/{projectId}/{store}`, falling back to the legacy monolithic key for
//! data written before the per-project layout existed.

use std::sync::Arc;

use tracing::warn;

use crate::context::StorageContext;
use crate::models::envelope::{StoreSnapshot, WriteRequest};
use crate::models::stores::per_project_key;
use crate::storage::kv::KvStore;
use crate::utils::error::StorageResult;

use super::{read_snapshot, resolve_write_project, write_snapshot};

/// Router for stores persisted as one file per project
pub struct ProjectRouter {
    kv: Arc<dyn KvStore>,
    context: Arc<StorageContext>,
}

impl ProjectRouter {
    pub fn new(kv: Arc<dyn KvStore>, context: Arc<StorageContext>) -> Self {
        Self { kv, context }
    }

    /// Read the active project's snapshot of `store`, falling back to the
    /// legacy monolithic file. Returns None when neither exists.
    pub async fn get(&self, store: &str) -> StorageResult<Option<StoreSnapshot>> {
        self.context.wait_hydrated().await;

        let Some(project_id) = self.context.active_project_id().await else {
            warn!("No active project while reading '{}', using the legacy key", store);
            return read_snapshot(self.kv.as_ref(), store).await;
        };

        let key = per_project_key(&project_id, store);
        if let Some(snapshot) = read_snapshot(self.kv.as_ref(), &key).await? {
            return Ok(Some(snapshot));
        }
        read_snapshot(self.kv.as_ref(), store).await
    }

    /// Write a snapshot of `store` for the project the request resolves to.
    /// With no resolvable project the write lands on the legacy key, a
    /// degraded mode rather than an error.
    pub async fn set(&self, store: &str, request: WriteRequest) -> StorageResult<()> {
        self.context.wait_hydrated().await;

        match resolve_write_project(&self.context, store, &request).await {
            Some(project_id) => {
                let key = per_project_key(&project_id, store);
                write_snapshot(self.kv.as_ref(), &key, &request.payload).await
            }
            None => {
                warn!("No project resolvable for '{}' write, using the legacy key", store);
                write_snapshot(self.kv.as_ref(), store, &request.payload).await
            }
        }
    }

    /// Delete the active project's snapshot of `store`. The legacy file is
    /// never touched. Returns whether a file was deleted.
    pub async fn remove(&self, store: &str) -> StorageResult<bool> {
        self.context.wait_hydrated().await;

        match self.context.active_project_id().await {
            Some(project_id) => {
                self.kv.remove_item(&per_project_key(&project_id, store)).await
            }
            None => Ok(false),
        }
    }
}
