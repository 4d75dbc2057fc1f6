//! Storage Context
//!
//! Shared runtime state the routers consult on every call: which project is
//! active, which projects exist, which stores have cross-project sharing
//! switched on, and whether the project index has been loaded yet.
//!
//! Routing decisions made before the index loads would mis-partition data,
//! so reads and writes gate on the hydration flag instead of guessing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Notify, RwLock};

/// Runtime routing state, shared via `Arc` across services
#[derive(Debug, Default)]
pub struct StorageContext {
    active_project_id: RwLock<Option<String>>,
    known_project_ids: RwLock<Vec<String>>,
    sharing: RwLock<HashMap<String, bool>>,
    hydrated: AtomicBool,
    hydrated_notify: Notify,
}

impl StorageContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The project currently open in the UI, if any
    pub async fn active_project_id(&self) -> Option<String> {
        self.active_project_id.read().await.clone()
    }

    /// Change the active project
    pub async fn set_active_project(&self, id: Option<String>) {
        *self.active_project_id.write().await = id;
    }

    /// Every project id the index currently knows
    pub async fn known_project_ids(&self) -> Vec<String> {
        self.known_project_ids.read().await.clone()
    }

    /// Replace the known project set and active project in one step, as
    /// published by the project index service after each index load
    pub async fn publish_index(&self, ids: Vec<String>, active: Option<String>) {
        *self.known_project_ids.write().await = ids;
        *self.active_project_id.write().await = active;
    }

    /// Known projects other than `current`, sorted for a deterministic
    /// fold order
    pub async fn other_project_ids(&self, current: &str) -> Vec<String> {
        let mut others: Vec<String> = self
            .known_project_ids
            .read()
            .await
            .iter()
            .filter(|id| id.as_str() != current)
            .cloned()
            .collect();
        others.sort();
        others
    }

    /// Whether cross-project reads are enabled for `store`. Off unless
    /// explicitly switched on
    pub async fn sharing_enabled(&self, store: &str) -> bool {
        self.sharing
            .read()
            .await
            .get(store)
            .copied()
            .unwrap_or(false)
    }

    /// Toggle cross-project sharing for `store`
    pub async fn set_sharing(&self, store: &str, enabled: bool) {
        self.sharing.write().await.insert(store.to_string(), enabled);
    }

    /// Whether the project index has been loaded at least once
    pub fn is_hydrated(&self) -> bool {
        self.hydrated.load(Ordering::Acquire)
    }

    /// Open the hydration gate and wake every waiting router call
    pub fn mark_hydrated(&self) {
        self.hydrated.store(true, Ordering::Release);
        self.hydrated_notify.notify_waiters();
    }

    /// Wait until the project index has been loaded. Returns immediately
    /// once the gate is open; the flag is re-checked after registering for
    /// notification so a concurrent `mark_hydrated` is never missed
    pub async fn wait_hydrated(&self) {
        if self.is_hydrated() {
            return;
        }
        loop {
            let notified = self.hydrated_notify.notified();
            if self.is_hydrated() {
                return;
            }
            notified.await;
        }
    }
}
