//! Sceneweave Storage Engine
//!
//! Project-scoped persistent storage for Sceneweave Studio. The UI and the
//! AI-orchestration worker call in through a narrow key/value surface; this
//! crate owns everything below it:
//! - Routers that partition named JSON stores across projects, with opt-in
//!   cross-project sharing of flat collections
//! - A one-shot migration of the legacy single-file-per-store layout into
//!   the per-project layout, gated by a persisted sentinel
//! - A startup recovery pass that detects silently-lost per-project data
//!   and restores it from the legacy snapshots
//! - A storage location manager for validate/link/move/export/import of the
//!   whole data tree with backup-and-rollback, plus cache maintenance

pub mod context;
pub mod engine;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use context::StorageContext;
pub use engine::{StartupSummary, StorageEngine};
pub use models::config::StorageConfig;
pub use models::envelope::{StoreSnapshot, WriteRequest};
pub use models::project::{ProjectIndexState, ProjectMeta};
pub use models::report::{
    ClearCacheReport, ExportReport, OperationReport, StorageLocations, StorageUsage,
    ValidationReport,
};
pub use models::stores::{StoreDef, StoreLayout};
pub use services::location::StorageLocationManager;
pub use services::migration::{MigrationEngine, MigrationStatus, MigrationSummary};
pub use services::project_data::ProjectDataService;
pub use services::project_index::ProjectIndexService;
pub use services::recovery::{RecoveryEngine, RecoverySummary};
pub use services::router::{FlatPartitioner, Partitioner, ProjectRouter, SplitRouter};
pub use storage::config::StorageConfigService;
pub use storage::kv::{FileKvStore, KvStore};
pub use utils::error::{StorageError, StorageResult};
