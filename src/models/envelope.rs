//! Store Envelopes
//!
//! Every persisted store value is a `{state, version}` snapshot, where
//! `version` is the schema version maintained by the calling state layer.
//! Writes arrive wrapped in a `WriteRequest` that carries the owning project
//! id explicitly, so the routers never guess it from the payload shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One persisted snapshot of a logical store: the serialized state plus the
/// schema version the calling layer persists alongside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub state: Value,
    #[serde(default)]
    pub version: u64,
}

impl StoreSnapshot {
    /// Create a snapshot from a state value and schema version
    pub fn new(state: Value, version: u64) -> Self {
        Self { state, version }
    }

    /// Parse a snapshot from its JSON-encoded string form
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Encode the snapshot to its JSON string form
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// A write handed to a router by the layer above.
///
/// The embedded `project_id` identifies the project the payload belongs to at
/// the moment the write was issued. It takes precedence over the context's
/// current active project, which may already have moved on by the time a
/// pending write flushes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteRequest {
    #[serde(default)]
    pub project_id: Option<String>,
    pub payload: StoreSnapshot,
}

impl WriteRequest {
    /// A write bound to an explicit project id
    pub fn for_project(project_id: impl Into<String>, payload: StoreSnapshot) -> Self {
        Self {
            project_id: Some(project_id.into()),
            payload,
        }
    }

    /// A write with no project binding: the router resolves the active
    /// project, falling back to the legacy key in degraded mode
    pub fn unscoped(payload: StoreSnapshot) -> Self {
        Self {
            project_id: None,
            payload,
        }
    }
}
