//! Data models for the storage engine

pub mod config;
pub mod envelope;
pub mod project;
pub mod report;
pub mod stores;

pub use config::StorageConfig;
pub use envelope::{StoreSnapshot, WriteRequest};
pub use project::{ProjectIndexState, ProjectMeta};
pub use report::{
    ClearCacheReport, ExportReport, OperationReport, StorageLocations, StorageUsage,
    ValidationReport,
};
pub use stores::{StoreDef, StoreLayout};
