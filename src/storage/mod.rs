//! Storage Layer
//!
//! The key-value persistence primitive and the JSON config that locates it.

pub mod config;
pub mod kv;

pub use config::StorageConfigService;
pub use kv::{FileKvStore, KvStore};
