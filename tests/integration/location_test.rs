//! Storage location operations against real directory trees: move conflict
//! symmetry, export archives, import with rollback, and the sentinel clear
//! that re-arms migration after an import.

use std::path::Path;
use std::sync::Arc;

use sceneweave_storage::{
    StorageConfigService, StorageEngine, StorageLocationManager, StoreSnapshot,
};
use serde_json::json;
use tempfile::TempDir;
use tokio::fs;
use tokio::sync::RwLock;

async fn manager_at(base: &Path, config_dir: &Path) -> StorageLocationManager {
    let mut config = StorageConfigService::load(config_dir.join("storage-config.json")).await;
    config.set_base(base).await.unwrap();
    StorageLocationManager::new(Arc::new(RwLock::new(config)))
}

async fn seed_tree(base: &Path) {
    fs::create_dir_all(base.join("projects/_p/p1")).await.unwrap();
    fs::write(
        base.join("projects/_p/p1/script.json"),
        r#"{"state":{"screenplay":"INT."},"version":1}"#,
    )
    .await
    .unwrap();
    fs::write(base.join("projects/script.json"), r#"{"state":{},"version":1}"#)
        .await
        .unwrap();
    fs::create_dir_all(base.join("media/images")).await.unwrap();
    fs::write(base.join("media/images/frame.png"), vec![1u8; 16])
        .await
        .unwrap();
}

/// Flattened (path, contents) listing for byte-level comparisons
fn snapshot_tree(root: &Path) -> Vec<(String, Vec<u8>)> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let entry = entry.unwrap();
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let rel = path.strip_prefix(root).unwrap().to_string_lossy().to_string();
                files.push((rel, std::fs::read(&path).unwrap()));
            }
        }
    }
    files.sort();
    files
}

#[tokio::test]
async fn test_move_conflicts_are_symmetric_and_mutation_free() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("data");
    seed_tree(&base).await;
    let before = snapshot_tree(&base);

    // Descendant target.
    let manager = manager_at(&base, dir.path()).await;
    let down = manager.move_to(&base.join("archive")).await;
    assert!(!down.success);
    assert!(down.error.unwrap().contains("inside"));

    // Ancestor target, from a nested base.
    let nested = base.join("projects");
    let manager_nested = manager_at(&nested, dir.path()).await;
    let up = manager_nested.move_to(&base).await;
    assert!(!up.success);

    assert_eq!(snapshot_tree(&base), before);
}

#[tokio::test]
async fn test_export_never_touches_live_data() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("data");
    seed_tree(&base).await;
    let before = snapshot_tree(&base);

    let manager = manager_at(&base, dir.path()).await;
    let report = manager.export_to(&dir.path().join("exports")).await;

    assert!(report.success);
    let archive = report.export_path.unwrap();
    assert!(archive.join("projects/_p/p1/script.json").exists());
    assert!(archive.join("media/images/frame.png").exists());
    assert_eq!(snapshot_tree(&base), before);
}

#[tokio::test]
async fn test_import_of_invalid_source_is_atomic() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("data");
    seed_tree(&base).await;
    let before = snapshot_tree(&base);

    let stray = dir.path().join("stray");
    fs::create_dir_all(stray.join("documents")).await.unwrap();

    let manager = manager_at(&base, dir.path()).await;
    let report = manager.import_from(&stray).await;

    assert!(!report.success);
    assert_eq!(snapshot_tree(&base), before);
}

#[tokio::test]
async fn test_import_of_missing_source_reports_not_found() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("data");
    seed_tree(&base).await;

    let manager = manager_at(&base, dir.path()).await;
    let report = manager.import_from(&dir.path().join("nowhere")).await;

    assert!(!report.success);
    assert!(report.error.unwrap().contains("Not found"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_failed_import_restores_live_tree_from_backup() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("data");
    seed_tree(&base).await;
    let before = snapshot_tree(&base);

    // A source that passes validation but fails mid-replacement: the
    // dangling symlink makes the file copy error after the live subtree
    // was already removed.
    let source = dir.path().join("source");
    fs::create_dir_all(source.join("projects")).await.unwrap();
    fs::write(
        source.join("projects/projects.json"),
        r#"{"state":{},"version":1}"#,
    )
    .await
    .unwrap();
    std::os::unix::fs::symlink(
        dir.path().join("missing-target.json"),
        source.join("projects/broken.json"),
    )
    .unwrap();

    let manager = manager_at(&base, dir.path()).await;
    let report = manager.import_from(&source).await;

    // The error surfaces as a failed report and the pre-import tree is
    // back, byte for byte.
    assert!(!report.success);
    assert_eq!(snapshot_tree(&base), before);

    // A successful rollback also cleans up the transient backup.
    let leftovers: Vec<String> = std::fs::read_dir(&base)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|name| name.starts_with(".import-backup"))
        .collect();
    assert!(leftovers.is_empty(), "backup left behind: {leftovers:?}");
}

#[tokio::test]
async fn test_import_replaces_tree_and_rearms_migration() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("data");
    seed_tree(&base).await;

    // An exported archive from another machine, with its own sentinel.
    let source = dir.path().join("archive");
    fs::create_dir_all(source.join("projects/_p")).await.unwrap();
    fs::write(
        source.join("projects/_p/_migrated.json"),
        r#"{"status":"completed","migratedAt":"2026-01-01T00:00:00Z","version":1}"#,
    )
    .await
    .unwrap();
    let legacy = StoreSnapshot::new(
        json!({"projects": [{"id": "p9"}], "activeProjectId": "p9"}),
        1,
    );
    fs::write(source.join("projects/projects.json"), legacy.to_json().unwrap())
        .await
        .unwrap();

    let manager = manager_at(&base, dir.path()).await;
    let report = manager.import_from(&source).await;
    assert!(report.success, "{:?}", report.error);

    // Imported files replaced the live tree, the old media is gone, and the
    // sentinel is cleared for the next startup's migration pass.
    assert!(base.join("projects/projects.json").exists());
    assert!(!base.join("projects/_p/p1").exists());
    assert!(!base.join("media/images/frame.png").exists());
    assert!(!base.join("projects/_p/_migrated.json").exists());

    // Next startup re-evaluates migration over the imported tree.
    let mut config = StorageConfigService::load(dir.path().join("storage-config.json")).await;
    config.set_base(&base).await.unwrap();
    let engine = StorageEngine::new(config);
    let summary = engine.initialize().await;
    assert!(summary.migration.unwrap().performed);
    assert_eq!(
        engine.context().active_project_id().await.as_deref(),
        Some("p9")
    );
}

#[tokio::test]
async fn test_usage_reflects_tree_sizes() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("data");
    seed_tree(&base).await;
    fs::create_dir_all(base.join("cache")).await.unwrap();
    fs::write(base.join("cache/thumb.png"), vec![0u8; 4]).await.unwrap();

    let manager = manager_at(&base, dir.path()).await;
    let usage = manager.usage().await.unwrap();

    assert!(usage.projects_bytes > 0);
    assert_eq!(usage.media_bytes, 16);
    assert_eq!(usage.cache_bytes, 4);
    assert_eq!(usage.total(), usage.projects_bytes + 20);
}
