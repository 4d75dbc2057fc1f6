//! Engine startup end to end: a legacy tree goes through migrate, recover,
//! and index hydration in one `initialize`, and router calls issued before
//! startup finishes block on the hydration gate instead of reading defaults.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use sceneweave_storage::{StorageConfigService, StorageEngine, StoreSnapshot, WriteRequest};
use serde_json::json;
use tempfile::TempDir;
use tokio::fs;

async fn engine_at(dir: &Path) -> StorageEngine {
    let mut config = StorageConfigService::load(dir.join("storage-config.json")).await;
    config.set_base(&dir.join("data")).await.unwrap();
    StorageEngine::new(config)
}

async fn seed_legacy(dir: &Path, store: &str, state: serde_json::Value, version: u64) {
    let projects = dir.join("data/projects");
    fs::create_dir_all(&projects).await.unwrap();
    let snapshot = StoreSnapshot::new(state, version);
    fs::write(
        projects.join(format!("{store}.json")),
        snapshot.to_json().unwrap(),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_first_startup_over_a_legacy_tree() {
    let dir = TempDir::new().unwrap();
    seed_legacy(
        dir.path(),
        "projects",
        json!({"projects": [{"id": "p1"}, {"id": "p2"}], "activeProjectId": "p2"}),
        1,
    )
    .await;
    seed_legacy(
        dir.path(),
        "script",
        json!({"p1": {"screenplay": "INT. A"}, "p2": {"screenplay": "INT. B"}}),
        2,
    )
    .await;
    seed_legacy(
        dir.path(),
        "characters",
        json!({"characters": [
            {"id": "c1", "projectId": "p2"},
            {"id": "lib", "isSystem": true},
        ]}),
        1,
    )
    .await;

    let engine = engine_at(dir.path()).await;
    let summary = engine.initialize().await;

    assert!(summary.migration.unwrap().performed);
    assert!(summary.recovery.unwrap().performed);

    // The active project's data is served from the per-project layout.
    let script = engine
        .project_router()
        .await
        .unwrap()
        .get("script")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(script.state["screenplay"], "INT. B");

    let characters = engine
        .split_router()
        .await
        .unwrap()
        .get("characters")
        .await
        .unwrap();
    assert_eq!(characters.state["characters"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_second_startup_skips_migration() {
    let dir = TempDir::new().unwrap();
    seed_legacy(
        dir.path(),
        "projects",
        json!({"projects": [{"id": "p1"}], "activeProjectId": "p1"}),
        1,
    )
    .await;

    engine_at(dir.path()).await.initialize().await;
    let summary = engine_at(dir.path()).await.initialize().await;

    assert!(!summary.migration.unwrap().performed);
}

#[tokio::test]
async fn test_router_calls_wait_for_hydration() {
    let dir = TempDir::new().unwrap();
    seed_legacy(
        dir.path(),
        "projects",
        json!({"projects": [{"id": "p1"}], "activeProjectId": "p1"}),
        1,
    )
    .await;

    let engine = Arc::new(engine_at(dir.path()).await);
    let router = engine.project_router().await.unwrap();

    // A read issued before initialize must park on the gate, not resolve a
    // placeholder project id.
    let pending = tokio::spawn(async move { router.get("script").await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!pending.is_finished());

    engine.initialize().await;
    let result = tokio::time::timeout(Duration::from_secs(1), pending)
        .await
        .unwrap()
        .unwrap();
    assert!(result.unwrap().is_none());
}

#[tokio::test]
async fn test_writes_route_on_the_payload_project_across_a_switch() {
    let dir = TempDir::new().unwrap();
    seed_legacy(
        dir.path(),
        "projects",
        json!({"projects": [{"id": "p1"}, {"id": "p2"}], "activeProjectId": "p1"}),
        1,
    )
    .await;

    let engine = engine_at(dir.path()).await;
    engine.initialize().await;

    // A write for p1 was pending when the user switched to p2.
    engine.context().set_active_project(Some("p2".into())).await;
    let payload = StoreSnapshot::new(json!({"screenplay": "p1 draft"}), 4);
    engine
        .project_router()
        .await
        .unwrap()
        .set("script", WriteRequest::for_project("p1", payload))
        .await
        .unwrap();

    let data = dir.path().join("data");
    assert!(data.join("projects/_p/p1/script.json").exists());
    assert!(!data.join("projects/_p/p2/script.json").exists());
}

#[tokio::test]
async fn test_explicit_project_deletion_and_orphan_listing() {
    let dir = TempDir::new().unwrap();
    seed_legacy(
        dir.path(),
        "projects",
        json!({"projects": [{"id": "p1"}], "activeProjectId": "p1"}),
        1,
    )
    .await;
    seed_legacy(
        dir.path(),
        "script",
        json!({"p1": {"screenplay": "INT."}, "gone": {"screenplay": "OLD"}}),
        1,
    )
    .await;

    let engine = engine_at(dir.path()).await;
    engine.initialize().await;

    // "gone" was migrated from the legacy map but is not in the index.
    let project_data = engine.project_data().await.unwrap();
    assert_eq!(project_data.orphaned_project_ids().await.unwrap(), vec!["gone"]);

    assert!(project_data.delete_project_data("gone").await.unwrap());
    assert!(project_data.orphaned_project_ids().await.unwrap().is_empty());
    assert!(dir
        .path()
        .join("data/projects/_p/p1/script.json")
        .exists());
}
