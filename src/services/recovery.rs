//! Recovery Engine
//!
//! Startup consistency pass over the per-project layout. A known race in
//! older builds could flush a nearly-empty default state over a project's
//! file right after a project switch; the legacy monolithic files, which
//! migration never deletes, still hold the last good copy. This pass
//! compares the two and restores the legacy snapshot wherever the current
//! file lost data.
//!
//! The comparison is a per-store richness predicate ("has a screenplay",
//! "has split scenes", "has shots"), not a diff: only record-keyed stores
//! define one, so flat-collection stores have no recovery path here.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::models::envelope::StoreSnapshot;
use crate::models::stores::{per_project_key, record_keyed_stores, SHARED_CONFIG_KEY};
use crate::services::migration::{project_state_with_config, read_sentinel, MigrationStatus};
use crate::storage::kv::KvStore;
use crate::utils::error::StorageResult;

/// One per-project file the pass restored from its legacy snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restoration {
    pub store: String,
    pub project_id: String,
}

/// What a recovery run did
#[derive(Debug, Clone, Default)]
pub struct RecoverySummary {
    /// False when the pass did not run (migration has not completed)
    pub performed: bool,
    /// Per-project files restored from their legacy snapshots
    pub restored: Vec<Restoration>,
    /// Stores whose legacy file would not parse
    pub skipped_stores: Vec<String>,
}

/// Best-effort repair of silently-lost per-project data
pub struct RecoveryEngine {
    kv: Arc<dyn KvStore>,
}

impl RecoveryEngine {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Run the repair pass.
    ///
    /// Only meaningful after migration: before the sentinel says completed,
    /// the per-project layout is not authoritative and there is nothing to
    /// compare against, so the pass is skipped. A legacy file that will not
    /// parse aborts recovery for that store only.
    pub async fn recover(&self) -> StorageResult<RecoverySummary> {
        if read_sentinel(self.kv.as_ref()).await? != MigrationStatus::Completed {
            return Ok(RecoverySummary::default());
        }

        let mut summary = RecoverySummary {
            performed: true,
            ..RecoverySummary::default()
        };

        for def in record_keyed_stores() {
            let Some(richness) = def.richness else {
                continue;
            };
            if let Err(e) = self.recover_store(def.name, richness, &mut summary).await {
                // An I/O failure mid-store is logged like a parse failure;
                // startup must go on and the next run retries.
                warn!("Recovery of '{}' failed: {}", def.name, e);
                summary.skipped_stores.push(def.name.to_string());
            }
        }

        if !summary.restored.is_empty() {
            info!(
                "Recovery restored {} per-project file(s) from legacy snapshots",
                summary.restored.len()
            );
        }
        Ok(summary)
    }

    /// Compare every project's legacy sub-state against its current
    /// per-project file and restore where the legacy copy is the rich one.
    async fn recover_store(
        &self,
        store: &str,
        richness: fn(&Value) -> bool,
        summary: &mut RecoverySummary,
    ) -> StorageResult<()> {
        // The legacy monolithic file is read directly; routing it through the
        // Project Router would resolve to the very files under suspicion.
        let Some(raw) = self.kv.get_item(store).await? else {
            return Ok(());
        };
        let legacy = match StoreSnapshot::from_json(&raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Legacy '{}' file is malformed, skipping its recovery: {}", store, e);
                summary.skipped_stores.push(store.to_string());
                return Ok(());
            }
        };

        let Some(object) = legacy.state.as_object() else {
            warn!("Legacy '{}' state is not an object, skipping its recovery", store);
            summary.skipped_stores.push(store.to_string());
            return Ok(());
        };

        let config = object
            .get(SHARED_CONFIG_KEY)
            .filter(|v| v.is_object())
            .cloned();

        for (project_id, sub_state) in object {
            if project_id == SHARED_CONFIG_KEY || !sub_state.is_object() {
                continue;
            }
            if !richness(sub_state) {
                continue;
            }
            if self.current_is_rich(store, project_id, richness).await? {
                continue;
            }

            warn!(
                "Per-project '{}' of project {} lost data, restoring the legacy snapshot",
                store, project_id
            );
            let state = project_state_with_config(sub_state.clone(), config.as_ref());
            let restored = StoreSnapshot::new(state, legacy.version);
            self.kv
                .set_item(&per_project_key(project_id, store), &restored.to_json()?)
                .await?;
            summary.restored.push(Restoration {
                store: store.to_string(),
                project_id: project_id.clone(),
            });
        }
        Ok(())
    }

    /// Whether the current per-project file exists, parses, and satisfies
    /// the predicate. Absent and malformed both count as not rich: either
    /// way the legacy snapshot is the better copy.
    async fn current_is_rich(
        &self,
        store: &str,
        project_id: &str,
        richness: fn(&Value) -> bool,
    ) -> StorageResult<bool> {
        let key = per_project_key(project_id, store);
        let Some(raw) = self.kv.get_item(&key).await? else {
            return Ok(false);
        };
        match StoreSnapshot::from_json(&raw) {
            Ok(snapshot) => Ok(richness(&snapshot.state)),
            Err(_) => Ok(false),
        }
    }
}
