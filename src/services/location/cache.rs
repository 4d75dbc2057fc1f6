//! Cache Maintenance
//!
//! The cache directory holds regenerable derivatives (thumbnails, preview
//! renders). Clearing it is always safe; the two modes differ in scope: a
//! full clear drops and recreates the whole directory, an age-based clear
//! deletes only files older than a cutoff and prunes emptied subdirectories.

use std::path::Path;
use std::time::{Duration, SystemTime};

use tokio::fs;

use crate::utils::error::StorageResult;
use crate::utils::fs::{dir_size, prune_files_older_than, remove_dir_if_exists};

/// Category subdirectories recreated after a full clear
pub(crate) const CACHE_CATEGORIES: [&str; 2] = ["thumbnails", "previews"];

/// Delete the whole cache directory and recreate it empty with its category
/// subdirectories. Returns the bytes freed.
pub(crate) async fn clear_all(cache_path: &Path) -> StorageResult<u64> {
    let freed = dir_size(cache_path).await?;
    remove_dir_if_exists(cache_path).await?;
    for category in CACHE_CATEGORIES {
        fs::create_dir_all(cache_path.join(category)).await?;
    }
    Ok(freed)
}

/// Delete cache files last modified more than `days` days ago, pruning any
/// directory left empty. The cache root itself is kept. Returns the bytes
/// freed.
pub(crate) async fn clear_older_than(cache_path: &Path, days: u32) -> StorageResult<u64> {
    let cutoff = SystemTime::now() - Duration::from_secs(u64::from(days) * 86_400);
    prune_files_older_than(cache_path, cutoff).await
}
