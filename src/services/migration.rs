//! Migration Engine
//!
//! One-shot transform of the legacy one-file-per-store layout into the
//! per-project/shared layout, gated by a persisted sentinel. Safe to call on
//! every startup: it short-circuits once the sentinel says completed.
//!
//! Legacy files are never deleted or mutated. The per-project layout is
//! strictly additive, so an interrupted run can simply start over; re-running
//! is a full overwrite of the emitted files, not an incremental merge.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::models::envelope::StoreSnapshot;
use crate::models::project::ProjectIndexState;
use crate::models::stores::{
    flat_stores, per_project_key, record_keyed_stores, shared_key, SENTINEL_KEY,
    SHARED_CONFIG_KEY, STORE_PROJECTS, STORE_TIMELINE,
};
use crate::services::router::split::{item_is_shared, item_project_id};
use crate::storage::kv::KvStore;
use crate::utils::error::StorageResult;

/// Sentinel schema version
const SENTINEL_VERSION: u32 = 1;

/// Progress state persisted in the sentinel file. `NotStarted` is the
/// absence of the file and is never written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStatus {
    NotStarted,
    InProgress,
    Completed,
}

/// The persisted sentinel. Sentinels written before the status field existed
/// mark completed migrations, so a missing status parses as completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationSentinel {
    #[serde(default = "MigrationSentinel::default_status")]
    pub status: MigrationStatus,
    pub migrated_at: String,
    pub version: u32,
}

impl MigrationSentinel {
    fn default_status() -> MigrationStatus {
        MigrationStatus::Completed
    }

    fn with_status(status: MigrationStatus) -> Self {
        Self {
            status,
            migrated_at: Utc::now().to_rfc3339(),
            version: SENTINEL_VERSION,
        }
    }
}

/// Read the sentinel's status. A missing file means not started; an
/// unreadable one is treated the same, so migration re-runs rather than
/// trusting a half-written marker.
pub async fn read_sentinel(kv: &dyn KvStore) -> StorageResult<MigrationStatus> {
    match kv.get_item(SENTINEL_KEY).await? {
        Some(raw) => match serde_json::from_str::<MigrationSentinel>(&raw) {
            Ok(sentinel) => Ok(sentinel.status),
            Err(e) => {
                warn!("Migration sentinel is malformed, treating as not started: {}", e);
                Ok(MigrationStatus::NotStarted)
            }
        },
        None => Ok(MigrationStatus::NotStarted),
    }
}

/// Persist the sentinel with the given status
pub async fn write_sentinel(kv: &dyn KvStore, status: MigrationStatus) -> StorageResult<()> {
    let sentinel = MigrationSentinel::with_status(status);
    kv.set_item(SENTINEL_KEY, &serde_json::to_string(&sentinel)?)
        .await
}

/// Remove the sentinel so the next startup re-evaluates migration, used
/// after an import replaces the data tree
pub async fn clear_sentinel(kv: &dyn KvStore) -> StorageResult<bool> {
    kv.remove_item(SENTINEL_KEY).await
}

/// What a migration run did
#[derive(Debug, Clone, Default)]
pub struct MigrationSummary {
    /// False when the sentinel short-circuited the run
    pub performed: bool,
    /// Per-project and shared files written
    pub files_written: usize,
    /// Stores skipped because their legacy file would not parse
    pub skipped_stores: Vec<String>,
}

/// One-shot legacy layout migration
pub struct MigrationEngine {
    kv: Arc<dyn KvStore>,
}

impl MigrationEngine {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Run the migration if it has not completed yet.
    ///
    /// The sentinel moves through in-progress to completed; completion is
    /// only recorded after every store was processed. An I/O failure aborts
    /// the run and leaves the in-progress marker, so the next startup
    /// retries from scratch. A legacy file that will not parse is logged and
    /// skipped; retrying could never fix it and must not block startup.
    pub async fn migrate(&self) -> StorageResult<MigrationSummary> {
        match read_sentinel(self.kv.as_ref()).await? {
            MigrationStatus::Completed => return Ok(MigrationSummary::default()),
            MigrationStatus::InProgress => {
                warn!("Previous migration was interrupted, re-running from scratch");
            }
            MigrationStatus::NotStarted => {}
        }

        let index = match self.read_legacy_index().await? {
            Some(index) => index,
            None => {
                // Fresh install: nothing legacy to migrate.
                write_sentinel(self.kv.as_ref(), MigrationStatus::Completed).await?;
                return Ok(MigrationSummary {
                    performed: true,
                    ..MigrationSummary::default()
                });
            }
        };

        write_sentinel(self.kv.as_ref(), MigrationStatus::InProgress).await?;

        let mut summary = MigrationSummary {
            performed: true,
            ..MigrationSummary::default()
        };

        for def in record_keyed_stores() {
            self.migrate_record_keyed(def.name, &mut summary).await?;
        }
        for def in flat_stores() {
            self.migrate_flat(def.name, &mut summary).await?;
        }
        self.migrate_timeline(&index, &mut summary).await?;

        write_sentinel(self.kv.as_ref(), MigrationStatus::Completed).await?;
        info!(
            "Migration complete: {} files written, {} stores skipped",
            summary.files_written,
            summary.skipped_stores.len()
        );
        Ok(summary)
    }

    /// Read the legacy project index. Returns None when no index exists; a
    /// malformed index is logged and treated as empty so the data stores,
    /// which carry their own project ids, still migrate.
    async fn read_legacy_index(&self) -> StorageResult<Option<ProjectIndexState>> {
        let Some(raw) = self.kv.get_item(STORE_PROJECTS).await? else {
            return Ok(None);
        };

        let index = StoreSnapshot::from_json(&raw)
            .and_then(|snapshot| serde_json::from_value::<ProjectIndexState>(snapshot.state));
        match index {
            Ok(index) => Ok(Some(index)),
            Err(e) => {
                warn!("Legacy project index is malformed, migrating stores by embedded ids: {}", e);
                Ok(Some(ProjectIndexState::default()))
            }
        }
    }

    /// Record-keyed store: the legacy state maps project id to sub-state,
    /// with an optional `config` sibling shared by all projects. One file
    /// per project key; the config object rides along into each.
    async fn migrate_record_keyed(
        &self,
        store: &str,
        summary: &mut MigrationSummary,
    ) -> StorageResult<()> {
        let Some(snapshot) = self.read_legacy_store(store, summary).await? else {
            return Ok(());
        };

        let Some(object) = snapshot.state.as_object() else {
            self.skip_store(store, "state is not an object", summary);
            return Ok(());
        };

        let config = object
            .get(SHARED_CONFIG_KEY)
            .filter(|v| v.is_object())
            .cloned();

        for (key, value) in object {
            if key == SHARED_CONFIG_KEY {
                continue;
            }
            // Non-object siblings (counters, cursors) are not project states.
            let Some(sub_state) = value.as_object() else {
                continue;
            };

            let state = project_state_with_config(Value::Object(sub_state.clone()), config.as_ref());
            let emitted = StoreSnapshot::new(state, snapshot.version);
            self.kv
                .set_item(&per_project_key(key, store), &emitted.to_json()?)
                .await?;
            summary.files_written += 1;
        }
        Ok(())
    }

    /// Flat-collection store: array items route on their own project id,
    /// with id-less and system items going to the shared partition. Scalar
    /// fields also land in the shared file, where every project's merge
    /// picks them up.
    async fn migrate_flat(&self, store: &str, summary: &mut MigrationSummary) -> StorageResult<()> {
        let Some(snapshot) = self.read_legacy_store(store, summary).await? else {
            return Ok(());
        };

        let Some(object) = snapshot.state.as_object() else {
            self.skip_store(store, "state is not an object", summary);
            return Ok(());
        };

        let mut shared = Map::new();
        let mut buckets: BTreeMap<String, Map<String, Value>> = BTreeMap::new();

        for (field, value) in object {
            let Some(items) = value.as_array() else {
                shared.insert(field.clone(), value.clone());
                continue;
            };

            let shared_items = shared
                .entry(field.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            for item in items {
                if item_is_shared(item) {
                    if let Value::Array(list) = shared_items {
                        list.push(item.clone());
                    }
                    continue;
                }
                if let Some(project_id) = item_project_id(item) {
                    let bucket = buckets.entry(project_id.to_string()).or_default();
                    match bucket
                        .entry(field.clone())
                        .or_insert_with(|| Value::Array(Vec::new()))
                    {
                        Value::Array(list) => list.push(item.clone()),
                        _ => unreachable!("bucket fields are always arrays"),
                    }
                }
            }
        }

        let shared_snapshot = StoreSnapshot::new(Value::Object(shared), snapshot.version);
        self.kv
            .set_item(&shared_key(store), &shared_snapshot.to_json()?)
            .await?;
        summary.files_written += 1;

        for (project_id, bucket) in buckets {
            let emitted = StoreSnapshot::new(Value::Object(bucket), snapshot.version);
            self.kv
                .set_item(&per_project_key(&project_id, store), &emitted.to_json()?)
                .await?;
            summary.files_written += 1;
        }
        Ok(())
    }

    /// The timeline has no project-id concept. Its whole legacy content is
    /// assigned to the project active at migration time, a heuristic rather
    /// than a correctness guarantee.
    async fn migrate_timeline(
        &self,
        index: &ProjectIndexState,
        summary: &mut MigrationSummary,
    ) -> StorageResult<()> {
        let Some(snapshot) = self.read_legacy_store(STORE_TIMELINE, summary).await? else {
            return Ok(());
        };

        let Some(owner) = index.active_or_first() else {
            // Legacy fallback in the router still serves the old file.
            warn!("No project to own the legacy timeline, leaving it in place");
            return Ok(());
        };

        self.kv
            .set_item(&per_project_key(&owner, STORE_TIMELINE), &snapshot.to_json()?)
            .await?;
        summary.files_written += 1;
        Ok(())
    }

    /// Read and parse one legacy store file. An absent file yields None; a
    /// file that will not parse is recorded as skipped and yields None.
    async fn read_legacy_store(
        &self,
        store: &str,
        summary: &mut MigrationSummary,
    ) -> StorageResult<Option<StoreSnapshot>> {
        let Some(raw) = self.kv.get_item(store).await? else {
            return Ok(None);
        };
        match StoreSnapshot::from_json(&raw) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                self.skip_store(store, &e.to_string(), summary);
                Ok(None)
            }
        }
    }

    fn skip_store(&self, store: &str, reason: &str, summary: &mut MigrationSummary) {
        error!("Skipping migration of '{}': {}", store, reason);
        summary.skipped_stores.push(store.to_string());
    }
}

/// Attach the legacy store-level `config` object to a per-project state.
/// A config key already present in the sub-state wins.
pub(crate) fn project_state_with_config(state: Value, config: Option<&Value>) -> Value {
    let Some(config) = config else {
        return state;
    };
    match state {
        Value::Object(mut object) => {
            if !object.contains_key(SHARED_CONFIG_KEY) {
                object.insert(SHARED_CONFIG_KEY.to_string(), config.clone());
            }
            Value::Object(object)
        }
        other => other,
    }
}
