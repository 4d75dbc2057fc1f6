//! Key-Value Store
//!
//! The persistence primitive every higher layer sits on. Keys are
//! slash-separated paths ("script", "_p/p1/script", "_shared/scenes"),
//! values are raw JSON strings. The file-backed implementation maps each
//! key to `{root}/{key}.json` and performs every write atomically, so a
//! crash mid-write never leaves a truncated store behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::utils::error::{StorageError, StorageResult};
use crate::utils::fs::{remove_dir_if_exists, write_atomic};

/// Store file extension, stripped again when listing keys
const VALUE_EXT: &str = "json";

/// Asynchronous key-value interface over string-keyed JSON documents
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read the raw value for `key`, or None when the key has never been set
    async fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write the raw value for `key`, replacing any previous value
    async fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete `key`. Returns whether a value existed
    async fn remove_item(&self, key: &str) -> StorageResult<bool>;

    /// Whether `key` currently holds a value
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// All keys under `prefix` (every segment level), sorted. An empty
    /// prefix lists the whole store
    async fn list_keys(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Delete every key under `prefix`. Returns whether anything existed
    async fn remove_prefix(&self, prefix: &str) -> StorageResult<bool>;
}

/// File-backed store rooted at a directory
#[derive(Debug, Clone)]
pub struct FileKvStore {
    root: PathBuf,
}

impl FileKvStore {
    /// Create a store over `root`. The directory is created lazily on the
    /// first write
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory this store reads and writes under
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key to its backing file, rejecting keys that would escape
    /// the root directory
    fn value_path(&self, key: &str) -> StorageResult<PathBuf> {
        let dir = self.prefix_path(key)?;
        Ok(dir.with_extension(VALUE_EXT))
    }

    /// Map a key prefix to its directory under the root
    fn prefix_path(&self, prefix: &str) -> StorageResult<PathBuf> {
        validate_key(prefix)?;
        Ok(self.root.join(prefix))
    }

    /// Collect `{dir}/**/*.json` as keys, prefixed with `base`
    async fn collect_keys(&self, dir: PathBuf, base: String) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut stack = vec![(dir, base)];

        while let Some((current, prefix)) = stack.pop() {
            let mut entries = fs::read_dir(&current).await?;
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().to_string();
                if entry.file_type().await?.is_dir() {
                    stack.push((entry.path(), join_key(&prefix, &name)));
                } else if let Some(stem) = name.strip_suffix(".json") {
                    keys.push(join_key(&prefix, stem));
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl KvStore for FileKvStore {
    async fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.value_path(key)?;
        match fs::read_to_string(&path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.value_path(key)?;
        write_atomic(&path, value).await
    }

    async fn remove_item(&self, key: &str) -> StorageResult<bool> {
        let path = self.value_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.value_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn list_keys(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let dir = if prefix.is_empty() {
            self.root.clone()
        } else {
            self.prefix_path(prefix)?
        };

        if !fs::try_exists(&dir).await? {
            return Ok(Vec::new());
        }
        self.collect_keys(dir, prefix.to_string()).await
    }

    async fn remove_prefix(&self, prefix: &str) -> StorageResult<bool> {
        let dir = self.prefix_path(prefix)?;
        remove_dir_if_exists(&dir).await
    }
}

/// Reject keys that are empty, absolute, or contain traversal segments
fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::validation("storage key is empty"));
    }
    if key.starts_with('/') || key.contains('\\') {
        return Err(StorageError::validation(format!(
            "storage key is not a relative path: {key}"
        )));
    }
    for segment in key.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(StorageError::validation(format!(
                "storage key contains an invalid segment: {key}"
            )));
        }
    }
    Ok(())
}

fn join_key(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}/{segment}")
    }
}
