//! Store Routers
//!
//! Rewrite logical store names into per-project file keys. UI-facing state
//! layers call a router; the router calls the key-value store.
//!
//! ## Components
//! - **ProjectRouter**: whole-file-per-project stores, with legacy fallback
//! - **SplitRouter**: flat-collection stores partitioned into per-project
//!   and shared halves by a `Partitioner`

pub mod project;
pub mod split;

pub use project::ProjectRouter;
pub use split::{FlatPartitioner, Partitioner, SplitRouter, SplitState};

use tracing::warn;

use crate::context::StorageContext;
use crate::models::envelope::{StoreSnapshot, WriteRequest};
use crate::storage::kv::KvStore;
use crate::utils::error::StorageResult;

/// Resolve the project a write belongs to. The id embedded in the request
/// wins over the context's active project: the active pointer may have moved
/// on while this write was still pending, and honoring it would file the
/// payload under the wrong project.
pub(crate) async fn resolve_write_project(
    context: &StorageContext,
    store: &str,
    request: &WriteRequest,
) -> Option<String> {
    let active = context.active_project_id().await;
    match (&request.project_id, active) {
        (Some(embedded), Some(active)) => {
            if *embedded != active {
                warn!(
                    "Write to '{}' targets project {} while {} is active; honoring the payload",
                    store, embedded, active
                );
            }
            Some(embedded.clone())
        }
        (Some(embedded), None) => Some(embedded.clone()),
        (None, active) => active,
    }
}

/// Read and parse the snapshot at `key`, or None when the key is unset
pub(crate) async fn read_snapshot(
    kv: &dyn KvStore,
    key: &str,
) -> StorageResult<Option<StoreSnapshot>> {
    match kv.get_item(key).await? {
        Some(raw) => Ok(Some(StoreSnapshot::from_json(&raw)?)),
        None => Ok(None),
    }
}

/// Serialize and write a snapshot to `key`
pub(crate) async fn write_snapshot(
    kv: &dyn KvStore,
    key: &str,
    snapshot: &StoreSnapshot,
) -> StorageResult<()> {
    kv.set_item(key, &snapshot.to_json()?).await
}
