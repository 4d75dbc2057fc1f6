//! Utilities
//!
//! Common utilities used throughout the storage engine.

pub mod error;
pub mod fs;
pub mod paths;

pub use error::*;
pub use paths::*;
