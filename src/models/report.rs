//! Operation Reports
//!
//! Structured results the Storage Location Manager returns to UI code.
//! Expected failures (validation, missing sources) surface as
//! `{success: false, error}` values, never as errors thrown across the
//! manager boundary.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::utils::error::StorageResult;

/// Result of a mutating location operation (link, move, import)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationReport {
    pub success: bool,
    pub error: Option<String>,
}

impl OperationReport {
    /// Successful operation
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    /// Failed operation with message
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
        }
    }
}

impl From<StorageResult<()>> for OperationReport {
    fn from(result: StorageResult<()>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(e) => Self::err(e.to_string()),
        }
    }
}

/// Result of validating a candidate storage directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub error: Option<String>,
}

impl ValidationReport {
    /// Directory is linkable
    pub fn valid() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    /// Directory is not linkable, with the reason
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(message.into()),
        }
    }
}

/// Result of an export, carrying the created archive directory
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportReport {
    pub success: bool,
    pub export_path: Option<PathBuf>,
    pub error: Option<String>,
}

impl ExportReport {
    pub fn ok(path: PathBuf) -> Self {
        Self {
            success: true,
            export_path: Some(path),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            export_path: None,
            error: Some(message.into()),
        }
    }
}

/// Result of a cache clear, carrying the bytes freed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearCacheReport {
    pub success: bool,
    pub freed_bytes: u64,
    pub error: Option<String>,
}

impl ClearCacheReport {
    pub fn ok(freed_bytes: u64) -> Self {
        Self {
            success: true,
            freed_bytes,
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            freed_bytes: 0,
            error: Some(message.into()),
        }
    }
}

/// The base path and its derived locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageLocations {
    pub base_path: PathBuf,
    pub projects_path: PathBuf,
    pub media_path: PathBuf,
    pub cache_path: PathBuf,
}

impl StorageLocations {
    /// Derive the fixed subtrees from a base path
    pub fn from_base(base: &std::path::Path) -> Self {
        Self {
            base_path: base.to_path_buf(),
            projects_path: base.join("projects"),
            media_path: base.join("media"),
            cache_path: base.join("cache"),
        }
    }
}

/// Disk usage of the data tree, for the storage settings panel
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageUsage {
    pub projects_bytes: u64,
    pub media_bytes: u64,
    pub cache_bytes: u64,
}

impl StorageUsage {
    pub fn total(&self) -> u64 {
        self.projects_bytes + self.media_bytes + self.cache_bytes
    }
}
