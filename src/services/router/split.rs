//! Split Router
//!
//! Routes flat-collection stores (characters, scenes, media index) whose
//! arrays mix items from several projects. Each write is split into a
//! per-project half and a shared half; each read merges the halves back
//! according to the store's sharing toggle.
//!
//! Merge precedence is fixed and deterministic: shared partition first,
//! then every other known project in sorted id order, then the current
//! project. Later sources win for scalar fields; array fields concatenate.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::context::StorageContext;
use crate::models::envelope::{StoreSnapshot, WriteRequest};
use crate::models::stores::{per_project_key, shared_key, PROJECT_ID_FIELD, SYSTEM_FLAG_FIELD};
use crate::storage::kv::KvStore;
use crate::utils::error::{StorageError, StorageResult};

use super::{read_snapshot, resolve_write_project, write_snapshot};

/// The two halves a flat-collection state splits into
#[derive(Debug, Clone, PartialEq)]
pub struct SplitState {
    pub project: Value,
    pub shared: Value,
}

/// Splits a full store state into per-project and shared halves, and merges
/// halves back into a full state
pub trait Partitioner: Send + Sync {
    /// Partition `state` for `project_id`. Items belonging to other
    /// projects appear in neither half; they live in their own partitions
    /// and this write must not touch them.
    fn split(&self, state: &Value, project_id: &str) -> SplitState;

    /// Merge two halves. `project` takes precedence for scalar fields;
    /// array fields concatenate with `shared` items first.
    fn merge(&self, project: Option<&Value>, shared: Option<&Value>) -> Value;

    /// The state a store presents before anything was written
    fn empty_state(&self) -> Value {
        self.merge(None, None)
    }
}

/// Default partitioner: array items route on their `projectId` field, with
/// missing ids or an `isSystem` flag marking the shared partition. Scalar
/// fields (folder cursors, view settings) ride the project half.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlatPartitioner;

impl Partitioner for FlatPartitioner {
    fn split(&self, state: &Value, project_id: &str) -> SplitState {
        let Some(object) = state.as_object() else {
            return SplitState {
                project: state.clone(),
                shared: Value::Object(Map::new()),
            };
        };

        let mut project = Map::new();
        let mut shared = Map::new();
        for (field, value) in object {
            match value.as_array() {
                Some(items) => {
                    let mut own = Vec::new();
                    let mut common = Vec::new();
                    for item in items {
                        if item_is_shared(item) {
                            common.push(item.clone());
                        } else if item_project_id(item) == Some(project_id) {
                            own.push(item.clone());
                        }
                        // Items of other projects stay in their own partitions.
                    }
                    project.insert(field.clone(), Value::Array(own));
                    shared.insert(field.clone(), Value::Array(common));
                }
                None => {
                    project.insert(field.clone(), value.clone());
                }
            }
        }

        SplitState {
            project: Value::Object(project),
            shared: Value::Object(shared),
        }
    }

    fn merge(&self, project: Option<&Value>, shared: Option<&Value>) -> Value {
        // split kept a non-object state whole in the project half; it must
        // come back out whole, not collapse to an empty object.
        if let Some(state) = project.filter(|v| !v.is_object()) {
            return state.clone();
        }

        let mut merged = Map::new();
        for source in [shared, project].into_iter().flatten() {
            let Some(object) = source.as_object() else {
                continue;
            };
            for (field, value) in object {
                match (merged.get_mut(field), value.as_array()) {
                    (Some(Value::Array(existing)), Some(items)) => {
                        existing.extend(items.iter().cloned());
                    }
                    _ => {
                        merged.insert(field.clone(), value.clone());
                    }
                }
            }
        }
        Value::Object(merged)
    }
}

/// An item with no usable project id or an explicit system flag belongs to
/// the shared partition. Treating a malformed project id as shared keeps the
/// item visible instead of dropping it from every partition on write.
pub(crate) fn item_is_shared(item: &Value) -> bool {
    if item
        .get(SYSTEM_FLAG_FIELD)
        .and_then(Value::as_bool)
        .unwrap_or(false)
    {
        return true;
    }
    match item.get(PROJECT_ID_FIELD) {
        Some(Value::String(_)) => false,
        _ => true,
    }
}

pub(crate) fn item_project_id(item: &Value) -> Option<&str> {
    item.get(PROJECT_ID_FIELD).and_then(Value::as_str)
}

/// Router for flat-collection stores
pub struct SplitRouter {
    kv: Arc<dyn KvStore>,
    context: Arc<StorageContext>,
    partitioner: Arc<dyn Partitioner>,
}

impl SplitRouter {
    /// Create a router with the default flat partitioner
    pub fn new(kv: Arc<dyn KvStore>, context: Arc<StorageContext>) -> Self {
        Self::with_partitioner(kv, context, Arc::new(FlatPartitioner))
    }

    /// Create a router with a custom partitioning scheme
    pub fn with_partitioner(
        kv: Arc<dyn KvStore>,
        context: Arc<StorageContext>,
        partitioner: Arc<dyn Partitioner>,
    ) -> Self {
        Self {
            kv,
            context,
            partitioner,
        }
    }

    /// Read the merged state of `store` for the active project.
    ///
    /// With sharing disabled only the current project's partition is
    /// consulted, even when shared or other-project data exists on disk.
    /// With sharing enabled the shared partition and every other known
    /// project's partition fold in underneath the current project's.
    /// The returned version is the maximum across the sources consulted.
    /// A store with no data yet yields the partitioner's empty state,
    /// never a legacy-file fallback.
    pub async fn get(&self, store: &str) -> StorageResult<StoreSnapshot> {
        self.context.wait_hydrated().await;

        let active = self.context.active_project_id().await;
        let mut version = 0u64;

        let mut current: Option<Value> = None;
        if let Some(project_id) = &active {
            let key = per_project_key(project_id, store);
            if let Some(snapshot) = read_snapshot(self.kv.as_ref(), &key).await? {
                version = version.max(snapshot.version);
                current = Some(snapshot.state);
            }
        }

        if !self.context.sharing_enabled(store).await {
            let state = self.partitioner.merge(current.as_ref(), None);
            return Ok(StoreSnapshot::new(state, version));
        }

        let mut acc: Option<Value> = None;
        if let Some(snapshot) = read_snapshot(self.kv.as_ref(), &shared_key(store)).await? {
            version = version.max(snapshot.version);
            acc = Some(snapshot.state);
        }

        let others = match &active {
            Some(project_id) => self.context.other_project_ids(project_id).await,
            None => {
                let mut ids = self.context.known_project_ids().await;
                ids.sort();
                ids
            }
        };
        for other in &others {
            let key = per_project_key(other, store);
            if let Some(snapshot) = read_snapshot(self.kv.as_ref(), &key).await? {
                version = version.max(snapshot.version);
                acc = Some(self.partitioner.merge(Some(&snapshot.state), acc.as_ref()));
            }
        }

        let state = self.partitioner.merge(current.as_ref(), acc.as_ref());
        Ok(StoreSnapshot::new(state, version))
    }

    /// Split the incoming state and write both halves. The shared half is
    /// written even when sharing is disabled, so enabling sharing later
    /// surfaces pre-existing shared data without a migration step.
    pub async fn set(&self, store: &str, request: WriteRequest) -> StorageResult<()> {
        self.context.wait_hydrated().await;

        let Some(project_id) = resolve_write_project(&self.context, store, &request).await else {
            return Err(StorageError::validation(format!(
                "no project id resolvable for '{store}' write"
            )));
        };

        let halves = self.partitioner.split(&request.payload.state, &project_id);
        let version = request.payload.version;

        let project_snapshot = StoreSnapshot::new(halves.project, version);
        write_snapshot(
            self.kv.as_ref(),
            &per_project_key(&project_id, store),
            &project_snapshot,
        )
        .await?;

        let shared_snapshot = StoreSnapshot::new(halves.shared, version);
        write_snapshot(self.kv.as_ref(), &shared_key(store), &shared_snapshot).await
    }

    /// Delete the active project's partition of `store`. The shared
    /// partition and other projects' partitions are never touched.
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
