//! Error Handling
//!
//! Unified error types for the storage engine.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Engine-wide error type
#[derive(Error, Debug)]
pub enum StorageError {
    /// Validation errors (empty path, unrecognized directory contents,
    /// ancestor/descendant path conflicts)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors (missing source directory, unknown store)
    #[error("Not found: {0}")]
    NotFound(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// An import failed and the subsequent rollback also failed; the live
    /// data tree may be inconsistent until the user re-imports
    #[error("Rollback error: {0}")]
    Rollback(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for storage engine errors
pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a rollback error
    pub fn rollback(msg: impl Into<String>) -> Self {
        Self::Rollback(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error is an expected user-facing condition (validation
    /// or not-found) rather than an unexpected failure
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound(_))
    }
}

/// Convert StorageError to a plain string for structured operation reports
impl From<StorageError> for String {
    fn from(err: StorageError) -> String {
        err.to_string()
    }
}
