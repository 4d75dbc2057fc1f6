//! Recovery after the flush-after-switch race: migrate a legacy tree, let a
//! stale write clobber a per-project file, and verify the startup pass puts
//! the legacy snapshot back.

use std::sync::Arc;

use sceneweave_storage::{
    FileKvStore, KvStore, MigrationEngine, RecoveryEngine, StoreSnapshot,
};
use serde_json::json;
use tempfile::TempDir;

fn fixture() -> (TempDir, Arc<dyn KvStore>) {
    let dir = TempDir::new().unwrap();
    let kv: Arc<dyn KvStore> = Arc::new(FileKvStore::new(dir.path().join("projects")));
    (dir, kv)
}

async fn seed(kv: &Arc<dyn KvStore>, key: &str, state: serde_json::Value, version: u64) {
    let snapshot = StoreSnapshot::new(state, version);
    kv.set_item(key, &snapshot.to_json().unwrap()).await.unwrap();
}

async fn read(kv: &Arc<dyn KvStore>, key: &str) -> StoreSnapshot {
    StoreSnapshot::from_json(&kv.get_item(key).await.unwrap().unwrap()).unwrap()
}

#[tokio::test]
async fn test_race_clobbered_file_is_restored_from_legacy() {
    let (_dir, kv) = fixture();
    seed(
        &kv,
        "projects",
        json!({"projects": [{"id": "p1"}, {"id": "p2"}], "activeProjectId": "p1"}),
        1,
    )
    .await;
    seed(
        &kv,
        "director",
        json!({
            "p1": {"shots": [{"id": "sh1"}, {"id": "sh2"}]},
            "p2": {"shots": [{"id": "sh9"}]},
        }),
        2,
    )
    .await;

    MigrationEngine::new(kv.clone()).migrate().await.unwrap();

    // The race: a default state flushed over p1's file after a project switch.
    seed(&kv, "_p/p1/director", json!({"shots": []}), 3).await;

    let summary = RecoveryEngine::new(kv.clone()).recover().await.unwrap();

    assert!(summary.performed);
    assert_eq!(summary.restored.len(), 1);
    let p1 = read(&kv, "_p/p1/director").await;
    assert_eq!(p1.state["shots"].as_array().unwrap().len(), 2);
    // The untouched project keeps its migrated file.
    let p2 = read(&kv, "_p/p2/director").await;
    assert_eq!(p2.state["shots"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_recovery_is_monotone_and_idempotent() {
    let (_dir, kv) = fixture();
    seed(&kv, "projects", json!({"projects": [{"id": "p1"}], "activeProjectId": "p1"}), 1).await;
    seed(&kv, "script", json!({"p1": {"screenplay": "INT. DINER"}}), 1).await;

    MigrationEngine::new(kv.clone()).migrate().await.unwrap();
    kv.remove_item("_p/p1/script").await.unwrap();

    let first = RecoveryEngine::new(kv.clone()).recover().await.unwrap();
    assert_eq!(first.restored.len(), 1);
    let restored = kv.get_item("_p/p1/script").await.unwrap().unwrap();

    // A second pass finds the file rich and changes nothing.
    let second = RecoveryEngine::new(kv.clone()).recover().await.unwrap();
    assert!(second.restored.is_empty());
    assert_eq!(kv.get_item("_p/p1/script").await.unwrap().unwrap(), restored);
}

#[tokio::test]
async fn test_newer_rich_data_is_never_rolled_back() {
    let (_dir, kv) = fixture();
    seed(&kv, "projects", json!({"projects": [{"id": "p1"}], "activeProjectId": "p1"}), 1).await;
    seed(&kv, "breakdown", json!({"p1": {"scenes": [{"id": "legacy"}]}}), 1).await;

    MigrationEngine::new(kv.clone()).migrate().await.unwrap();

    // The user kept working after migration; the current file is richer and
    // different from the legacy snapshot.
    seed(
        &kv,
        "_p/p1/breakdown",
        json!({"scenes": [{"id": "new-1"}, {"id": "new-2"}, {"id": "new-3"}]}),
        6,
    )
    .await;

    RecoveryEngine::new(kv.clone()).recover().await.unwrap();

    let current = read(&kv, "_p/p1/breakdown").await;
    assert_eq!(current.state["scenes"].as_array().unwrap().len(), 3);
    assert_eq!(current.version, 6);
}

#[tokio::test]
async fn test_flat_stores_have_no_recovery_path() {
    let (_dir, kv) = fixture();
    seed(&kv, "projects", json!({"projects": [{"id": "p1"}], "activeProjectId": "p1"}), 1).await;
    seed(
        &kv,
        "scenes",
        json!({"scenes": [{"id": "s1", "projectId": "p1"}]}),
        1,
    )
    .await;

    MigrationEngine::new(kv.clone()).migrate().await.unwrap();
    kv.remove_item("_p/p1/scenes").await.unwrap();

    let summary = RecoveryEngine::new(kv.clone()).recover().await.unwrap();

    assert!(summary.restored.is_empty());
    assert!(!kv.exists("_p/p1/scenes").await.unwrap());
}
