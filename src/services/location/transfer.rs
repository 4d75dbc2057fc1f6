//! Data Tree Transfer
//!
//! The copy-heavy halves of move, export, and import. These operate on the
//! `projects/` and `media/` subtrees at the filesystem level, below the
//! router abstraction. Import is the one risky operation: the live subtrees
//! are replaced in place, so a transient backup is taken first and restored
//! if anything fails mid-replacement.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{error, info, warn};

use crate::models::report::StorageLocations;
use crate::services::migration::clear_sentinel;
use crate::storage::kv::FileKvStore;
use crate::utils::error::{StorageError, StorageResult};
use crate::utils::fs::{copy_dir_recursive, remove_dir_if_exists};
use crate::utils::paths::{path_contains, timestamp_slug};

/// Directory name prefix of export archives
const EXPORT_PREFIX: &str = "sceneweave-data";
/// Directory name prefix of the transient import backup
const BACKUP_PREFIX: &str = ".import-backup";

/// The subtrees a move, export, or import carries
const DATA_SUBTREES: [&str; 2] = ["projects", "media"];

/// Reject a move whose target is the current base, an ancestor of it, or a
/// descendant of it. Copying a tree into itself (or over its own parent)
/// would recurse; the check runs before any filesystem mutation.
pub(crate) fn check_move_conflict(current: &Path, new_base: &Path) -> StorageResult<()> {
    if new_base.as_os_str().is_empty() {
        return Err(StorageError::validation("new storage path is empty"));
    }
    if path_contains(current, new_base) {
        return Err(StorageError::validation(format!(
            "{} is inside the current storage directory {}",
            new_base.display(),
            current.display()
        )));
    }
    if path_contains(new_base, current) {
        return Err(StorageError::validation(format!(
            "{} contains the current storage directory {}",
            new_base.display(),
            current.display()
        )));
    }
    Ok(())
}

/// Copy the data subtrees of `old` under `new_base`, creating it on demand.
/// Subtrees that do not exist yet are skipped.
pub(crate) async fn copy_data_tree(old: &StorageLocations, new_base: &Path) -> StorageResult<()> {
    fs::create_dir_all(new_base).await?;
    for subtree in DATA_SUBTREES {
        let from = old.base_path.join(subtree);
        if fs::try_exists(&from).await? {
            copy_dir_recursive(&from, &new_base.join(subtree)).await?;
        }
    }
    Ok(())
}

/// Delete the old data subtrees after a move, unless they sit inside the
/// immutable per-platform user-data root. That directory is the safety
/// floor: the default storage location lives there, and deleting under it
/// could take unrelated application data with it.
pub(crate) async fn remove_old_data_tree(
    old: &StorageLocations,
    safety_floor: &Path,
) -> StorageResult<()> {
    for subtree in DATA_SUBTREES {
        let path = old.base_path.join(subtree);
        if path_contains(safety_floor, &path) {
            info!("Keeping {} inside the user-data root after move", path.display());
            continue;
        }
        remove_dir_if_exists(&path).await?;
    }
    Ok(())
}

/// Copy both data subtrees into a freshly created, timestamp-named archive
/// directory under `target`. Live data is never touched. Returns the
/// archive path.
pub(crate) async fn export_data_tree(
    locations: &StorageLocations,
    target: &Path,
) -> StorageResult<PathBuf> {
    if target.as_os_str().is_empty() {
        return Err(StorageError::validation("export target path is empty"));
    }

    let archive = target.join(format!("{}-{}", EXPORT_PREFIX, timestamp_slug()));
    fs::create_dir_all(&archive).await?;

    for subtree in DATA_SUBTREES {
        let from = locations.base_path.join(subtree);
        if fs::try_exists(&from).await? {
            copy_dir_recursive(&from, &archive.join(subtree)).await?;
        }
    }

    info!("Exported storage to {}", archive.display());
    Ok(archive)
}

/// Replace the live data subtrees with copies from `source`.
///
/// A backup of the live subtrees is taken first; any error during the
/// replacement restores them from the backup before the error is reported.
/// When the rollback itself fails the live tree is left inconsistent and a
/// `Rollback` error says so; re-importing is the only repair. On success the
/// backup is deleted and the migration sentinel is cleared so the imported
/// tree is re-evaluated by the Migration Engine on the next startup.
pub(crate) async fn import_data_tree(
    locations: &StorageLocations,
    source: &Path,
) -> StorageResult<()> {
    if source.as_os_str().is_empty() {
        return Err(StorageError::validation("import source path is empty"));
    }
    if !fs::try_exists(source).await? {
        return Err(StorageError::not_found(format!(
            "import source does not exist: {}",
            source.display()
        )));
    }

    let has_projects = fs::try_exists(&source.join("projects")).await?;
    let has_media = fs::try_exists(&source.join("media")).await?;
    if !has_projects && !has_media {
        return Err(StorageError::validation(format!(
            "{} has neither a projects/ nor a media/ subfolder",
            source.display()
        )));
    }

    let backup = locations
        .base_path
        .join(format!("{}-{}", BACKUP_PREFIX, timestamp_slug()));
    fs::create_dir_all(&backup).await?;
    for subtree in DATA_SUBTREES {
        let live = locations.base_path.join(subtree);
        if fs::try_exists(&live).await? {
            copy_dir_recursive(&live, &backup.join(subtree)).await?;
        }
    }

    match replace_live(locations, source).await {
        Ok(()) => {
            // A sentinel clear that fails leaves the imported tree served
            // as-is until the user re-imports; it must not roll back a
            // replacement that already succeeded.
            let kv = FileKvStore::new(&locations.projects_path);
            if let Err(e) = clear_sentinel(&kv).await {
                warn!("Imported data will not be re-migrated, sentinel clear failed: {}", e);
            }
            if let Err(e) = remove_dir_if_exists(&backup).await {
                warn!("Import backup left behind at {}: {}", backup.display(), e);
            }
            info!("Imported storage from {}", source.display());
            Ok(())
        }
        Err(e) => {
            warn!("Import failed, restoring the previous data tree: {}", e);
            match restore_from_backup(locations, &backup).await {
                Ok(()) => {
                    let _ = remove_dir_if_exists(&backup).await;
                    Err(e)
                }
                Err(rollback_err) => {
                    error!(
                        "Rollback failed, storage is inconsistent until re-imported (backup at {})",
                        backup.display()
                    );
                    Err(StorageError::rollback(format!(
                        "import failed ({e}) and restoring the backup also failed: {rollback_err}"
                    )))
                }
            }
        }
    }
}

/// Drop the live subtrees and copy the source's in. A subtree the source
/// lacks ends up absent, matching what a fresh link to the source would see.
async fn replace_live(locations: &StorageLocations, source: &Path) -> StorageResult<()> {
    for subtree in DATA_SUBTREES {
        remove_dir_if_exists(&locations.base_path.join(subtree)).await?;
        let from = source.join(subtree);
        if fs::try_exists(&from).await? {
            copy_dir_recursive(&from, &locations.base_path.join(subtree)).await?;
        }
    }
    Ok(())
}

/// Put the pre-import subtrees back from the backup copy
async fn restore_from_backup(locations: &StorageLocations, backup: &Path) -> StorageResult<()> {
    for subtree in DATA_SUBTREES {
        remove_dir_if_exists(&locations.base_path.join(subtree)).await?;
        let from = backup.join(subtree);
        if fs::try_exists(&from).await? {
            copy_dir_recursive(&from, &locations.base_path.join(subtree)).await?;
        }
    }
    Ok(())
}
