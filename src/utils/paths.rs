//! Cross-Platform Path Utilities
//!
//! Resolves the per-platform application data root (the safety floor that
//! move operations never delete from), the storage configuration file path,
//! and provides the path math used by conflict detection.

use std::path::{Component, Path, PathBuf};

use chrono::{SecondsFormat, Utc};

use crate::utils::error::{StorageError, StorageResult};

/// Directory name of the application inside the platform data dir
pub const APP_DIR_NAME: &str = "sceneweave";

/// File name of the storage configuration file
pub const STORAGE_CONFIG_FILE: &str = "storage-config.json";

/// Get the immutable per-platform user-data root for the application
/// (e.g. `~/.local/share/sceneweave`, `%APPDATA%\sceneweave`).
///
/// This directory is the safety floor: data nested inside it is never
/// deleted by a storage move.
pub fn app_data_root() -> StorageResult<PathBuf> {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .ok_or_else(|| StorageError::config("Could not determine platform data directory"))
}

/// Default base path for project and media data when none is configured.
/// The default lives inside the user-data root, so its subtrees survive
/// a later move to a custom location.
pub fn default_base_path() -> StorageResult<PathBuf> {
    app_data_root()
}

/// Path of the storage configuration file. Deliberately outside the movable
/// base path, so relocating the data tree cannot orphan the configuration.
pub fn storage_config_path() -> StorageResult<PathBuf> {
    Ok(app_data_root()?.join(STORAGE_CONFIG_FILE))
}

/// Lexically normalize a path: resolve `.` and `..` segments without
/// touching the filesystem (the target of a move may not exist yet).
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut parts: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                match parts.last() {
                    Some(Component::Normal(_)) => {
                        parts.pop();
                    }
                    Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                    _ => parts.push(component),
                }
            }
            other => parts.push(other),
        }
    }
    parts.iter().map(|c| c.as_os_str()).collect()
}

/// Whether `child` is the same path as `ancestor` or nested anywhere
/// beneath it, compared lexically after normalization.
pub fn path_contains(ancestor: &Path, child: &Path) -> bool {
    let ancestor = normalize_path(ancestor);
    let child = normalize_path(child);
    child.starts_with(&ancestor)
}

/// Whether two paths conflict for a move: either one containing the other
/// (including equality) makes an item-by-item copy self-referential.
pub fn paths_conflict(a: &Path, b: &Path) -> bool {
    path_contains(a, b) || path_contains(b, a)
}

/// Filesystem-safe UTC timestamp slug for export and backup directory
/// names: RFC 3339 with `:` and `.` replaced by `-`
/// (e.g. `2026-08-23T10-42-07-512Z`).
pub fn timestamp_slug() -> String {
    Utc::now()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}
