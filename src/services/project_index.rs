//! Project Index Service
//!
//! Loads the global `projects` store, publishes the known project set and
//! active project id into the routing context, and opens the hydration gate
//! the routers wait on. Writes to the index flow back through here so the
//! context never goes stale.

use std::sync::Arc;

use tracing::warn;

use crate::context::StorageContext;
use crate::models::envelope::StoreSnapshot;
use crate::models::project::ProjectIndexState;
use crate::models::stores::STORE_PROJECTS;
use crate::storage::kv::KvStore;
use crate::utils::error::{StorageError, StorageResult};

/// Service owning the global project index store
pub struct ProjectIndexService {
    kv: Arc<dyn KvStore>,
    context: Arc<StorageContext>,
}

impl ProjectIndexService {
    pub fn new(kv: Arc<dyn KvStore>, context: Arc<StorageContext>) -> Self {
        Self { kv, context }
    }

    /// Load the index, publish it, and open the hydration gate.
    ///
    /// The gate opens even when the load fails: a fresh install has no
    /// index file, and a malformed one must not deadlock every router call
    /// behind a gate that will never open. Failures are logged and an empty
    /// index is published instead.
    pub async fn hydrate(&self) -> ProjectIndexState {
        let state = match self.load().await {
            Ok((state, _version)) => state,
            Err(e) => {
                warn!("Project index failed to load, starting with an empty index: {}", e);
                ProjectIndexState::default()
            }
        };

        self.publish(&state).await;
        self.context.mark_hydrated();
        state
    }

    /// Read the index store. A missing file yields the default empty index.
    pub async fn load(&self) -> StorageResult<(ProjectIndexState, u64)> {
        match self.kv.get_item(STORE_PROJECTS).await? {
            Some(raw) => {
                let snapshot = StoreSnapshot::from_json(&raw)?;
                let state: ProjectIndexState = serde_json::from_value(snapshot.state)?;
                Ok((state, snapshot.version))
            }
            None => Ok((ProjectIndexState::default(), 0)),
        }
    }

    /// Persist the index and republish it to the routing context
    pub async fn save(&self, state: &ProjectIndexState, version: u64) -> StorageResult<()> {
        let snapshot = StoreSnapshot::new(serde_json::to_value(state)?, version);
        self.kv
            .set_item(STORE_PROJECTS, &snapshot.to_json()?)
            .await?;
        self.publish(state).await;
        Ok(())
    }

    /// Switch the active project, which must be listed in the index
    pub async fn set_active(&self, project_id: Option<String>) -> StorageResult<()> {
        let (mut state, version) = self.load().await?;
        if let Some(id) = &project_id {
            if !state.contains(id) {
                return Err(StorageError::validation(format!(
                    "unknown project id: {id}"
                )));
            }
        }
        state.active_project_id = project_id;
        self.save(&state, version).await
    }

    async fn publish(&self, state: &ProjectIndexState) {
        self.context
            .publish_index(state.project_ids(), state.active_project_id.clone())
            .await;
    }
}
