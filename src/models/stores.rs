//! Store Catalog
//!
//! Names and layouts of every logical store the engine persists, the key
//! scheme of the per-project tree, and the richness predicates the recovery
//! pass uses to judge whether a snapshot is meaningfully populated.
//!
//! Layouts:
//! - the global project index is a single file, never project-scoped;
//! - record-keyed stores hold a map of project id → sub-state in their legacy
//!   form and become one whole file per project after migration;
//! - flat-collection stores hold arrays whose items carry a `projectId`
//!   field and get partitioned into per-project and shared files;
//! - the edit timeline predates project scoping entirely and is assigned to
//!   the active project during migration.

use serde_json::Value;

/// Global project index store (list of projects + active id)
pub const STORE_PROJECTS: &str = "projects";
/// Per-project screenplay store
pub const STORE_SCRIPT: &str = "script";
/// Per-project scene breakdown (screenplay split into scenes)
pub const STORE_BREAKDOWN: &str = "breakdown";
/// Per-project director timeline (planned shots)
pub const STORE_DIRECTOR: &str = "director";
/// Single-track edit timeline; no project-id concept in its legacy form
pub const STORE_TIMELINE: &str = "timeline";
/// Character library (flat collection)
pub const STORE_CHARACTERS: &str = "characters";
/// Scene library (flat collection)
pub const STORE_SCENES: &str = "scenes";
/// Media index (flat collection referencing files under `media/`)
pub const STORE_MEDIA: &str = "media";

/// Reserved key inside a record-keyed legacy state: project-level shared
/// configuration that rides along into every per-project snapshot
pub const SHARED_CONFIG_KEY: &str = "config";

/// Item field naming the owning project in flat collections
pub const PROJECT_ID_FIELD: &str = "projectId";
/// Item flag marking folder-like entries that belong to every project
pub const SYSTEM_FLAG_FIELD: &str = "isSystem";

/// Directory (under the projects root) holding per-project partitions
pub const PER_PROJECT_DIR: &str = "_p";
/// Directory holding shared partitions
pub const SHARED_DIR: &str = "_shared";
/// KV key of the migration sentinel
pub const SENTINEL_KEY: &str = "_p/_migrated";

/// KV key of a project's partition of a store
pub fn per_project_key(project_id: &str, store: &str) -> String {
    format!("{}/{}/{}", PER_PROJECT_DIR, project_id, store)
}

/// KV key of a store's shared partition
pub fn shared_key(store: &str) -> String {
    format!("{}/{}", SHARED_DIR, store)
}

/// KV prefix of everything belonging to one project
pub fn project_dir_key(project_id: &str) -> String {
    format!("{}/{}", PER_PROJECT_DIR, project_id)
}

/// How a store's data is laid out across projects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreLayout {
    /// One global file; never routed per project
    Global,
    /// Legacy state maps project id → sub-state; whole file per project
    /// after migration
    RecordKeyed,
    /// Arrays of items carrying a `projectId` field; split into per-project
    /// and shared partitions
    FlatCollection,
    /// No project-id concept; the whole store is handed to the project
    /// active at migration time
    ActiveProjectOwned,
}

/// One entry of the store catalog
#[derive(Debug, Clone, Copy)]
pub struct StoreDef {
    pub name: &'static str,
    pub layout: StoreLayout,
    /// Judges whether a per-project snapshot is meaningfully populated.
    /// Only defined for the record-keyed stores the recovery pass covers.
    pub richness: Option<fn(&Value) -> bool>,
}

/// A screenplay exists and is non-empty
fn script_is_rich(state: &Value) -> bool {
    state
        .get("screenplay")
        .and_then(Value::as_str)
        .map(|s| !s.trim().is_empty())
        .unwrap_or(false)
}

/// At least one split scene
fn breakdown_is_rich(state: &Value) -> bool {
    state
        .get("scenes")
        .and_then(Value::as_array)
        .map(|a| !a.is_empty())
        .unwrap_or(false)
}

/// At least one planned shot
fn director_is_rich(state: &Value) -> bool {
    state
        .get("shots")
        .and_then(Value::as_array)
        .map(|a| !a.is_empty())
        .unwrap_or(false)
}

const CATALOG: &[StoreDef] = &[
    StoreDef {
        name: STORE_PROJECTS,
        layout: StoreLayout::Global,
        richness: None,
    },
    StoreDef {
        name: STORE_SCRIPT,
        layout: StoreLayout::RecordKeyed,
        richness: Some(script_is_rich),
    },
    StoreDef {
        name: STORE_BREAKDOWN,
        layout: StoreLayout::RecordKeyed,
        richness: Some(breakdown_is_rich),
    },
    StoreDef {
        name: STORE_DIRECTOR,
        layout: StoreLayout::RecordKeyed,
        richness: Some(director_is_rich),
    },
    StoreDef {
        name: STORE_TIMELINE,
        layout: StoreLayout::ActiveProjectOwned,
        richness: None,
    },
    StoreDef {
        name: STORE_CHARACTERS,
        layout: StoreLayout::FlatCollection,
        richness: None,
    },
    StoreDef {
        name: STORE_SCENES,
        layout: StoreLayout::FlatCollection,
        richness: None,
    },
    StoreDef {
        name: STORE_MEDIA,
        layout: StoreLayout::FlatCollection,
        richness: None,
    },
];

/// The full store catalog
pub fn catalog() -> &'static [StoreDef] {
    CATALOG
}

/// Look up a store definition by name
pub fn find_store(name: &str) -> Option<&'static StoreDef> {
    CATALOG.iter().find(|def| def.name == name)
}

/// All record-keyed stores (the migration and recovery passes iterate these)
pub fn record_keyed_stores() -> impl Iterator<Item = &'static StoreDef> {
    CATALOG
        .iter()
        .filter(|def| def.layout == StoreLayout::RecordKeyed)
}

/// All flat-collection stores
pub fn flat_stores() -> impl Iterator<Item = &'static StoreDef> {
    CATALOG
        .iter()
        .filter(|def| def.layout == StoreLayout::FlatCollection)
}
