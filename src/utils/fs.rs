//! Filesystem Helpers
//!
//! Async directory walking (copy, measure, prune) and the atomic write
//! primitive used for every JSON value the engine persists.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::SystemTime;

use tokio::fs;

use crate::utils::error::StorageResult;

/// Recursively copy a directory, creating destination directories on demand.
/// Symlinked directories are copied as files are encountered; the walk does
/// not follow directory symlinks.
pub async fn copy_dir_recursive(src: &Path, dst: &Path) -> StorageResult<()> {
    let mut stack = vec![(src.to_path_buf(), dst.to_path_buf())];

    while let Some((from, to)) = stack.pop() {
        fs::create_dir_all(&to).await?;

        let mut entries = fs::read_dir(&from).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let dest = to.join(entry.file_name());

            if entry.file_type().await?.is_dir() {
                stack.push((path, dest));
            } else {
                fs::copy(&path, &dest).await?;
            }
        }
    }

    Ok(())
}

/// Total size in bytes of all files under `path`. Returns 0 when the
/// directory does not exist.
pub async fn dir_size(path: &Path) -> StorageResult<u64> {
    if !fs::try_exists(path).await? {
        return Ok(0);
    }

    let mut total = 0u64;
    let mut stack = vec![path.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                stack.push(entry.path());
            } else {
                total += entry.metadata().await?.len();
            }
        }
    }

    Ok(total)
}

/// Remove a directory tree if it exists. Returns whether anything was removed.
pub async fn remove_dir_if_exists(path: &Path) -> StorageResult<bool> {
    if fs::try_exists(path).await? {
        fs::remove_dir_all(path).await?;
        Ok(true)
    } else {
        Ok(false)
    }
}

/// Write `contents` to `path` via a sibling temp file and atomic rename,
/// creating parent directories on demand. Readers never observe a partial
/// file: they see either the old value or the new one.
pub async fn write_atomic(path: &Path, contents: &str) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "value".to_string());
    let tmp = path.with_file_name(format!("{}.tmp", file_name));

    fs::write(&tmp, contents).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

/// Recursively delete files last modified before `cutoff`, pruning any
/// directory left empty. The root directory itself is always kept.
/// Returns the number of bytes freed.
pub async fn prune_files_older_than(root: &Path, cutoff: SystemTime) -> StorageResult<u64> {
    if !fs::try_exists(root).await? {
        return Ok(0);
    }
    let (freed, _removed) = prune_dir(root.to_path_buf(), cutoff, true).await?;
    Ok(freed)
}

/// Prune one directory level. Returns (bytes freed, directory was removed).
/// Async recursion requires the boxed future.
fn prune_dir(
    dir: PathBuf,
    cutoff: SystemTime,
    keep_dir: bool,
) -> Pin<Box<dyn Future<Output = StorageResult<(u64, bool)>> + Send>> {
    Box::pin(async move {
        let mut freed = 0u64;
        let mut remaining = 0usize;

        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let meta = entry.metadata().await?;

            if meta.is_dir() {
                let (sub_freed, removed) = prune_dir(path, cutoff, false).await?;
                freed += sub_freed;
                if !removed {
                    remaining += 1;
                }
            } else {
                // Unreadable mtimes count as fresh so nothing is deleted by accident.
                let modified = meta.modified().unwrap_or_else(|_| SystemTime::now());
                if modified < cutoff {
                    freed += meta.len();
                    fs::remove_file(&path).await?;
                } else {
                    remaining += 1;
                }
            }
        }

        if remaining == 0 && !keep_dir {
            fs::remove_dir(&dir).await?;
            return Ok((freed, true));
        }
        Ok((freed, false))
    })
}
