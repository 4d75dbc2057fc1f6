//! Engine Services
//!
//! The logic layers over the key-value primitive: routers that scope stores
//! to projects, the one-shot legacy migration, the startup recovery pass,
//! project index hydration, per-project data cleanup, and the filesystem
//! level storage location operations.

pub mod location;
pub mod migration;
pub mod project_data;
pub mod project_index;
pub mod recovery;
pub mod router;

pub use location::StorageLocationManager;
pub use migration::{MigrationEngine, MigrationStatus, MigrationSummary};
pub use project_data::ProjectDataService;
pub use project_index::ProjectIndexService;
pub use recovery::{RecoveryEngine, RecoverySummary};
pub use router::{FlatPartitioner, Partitioner, ProjectRouter, SplitRouter};
