//! Storage Engine
//!
//! The facade the application shell talks to. Composes the configuration,
//! the routing context, and the services over one base directory, and runs
//! the startup sequence: migrate the legacy layout, recover lost per-project
//! data, hydrate the project index, then auto-clean the cache. Every stage
//! is non-fatal; a failed startup still opens the hydration gate so router
//! calls cannot deadlock.
//!
//! Router accessors build against the base path the configuration points at
//! right now, so a link, move, or import is picked up by every router
//! created afterwards without restarting the engine.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, warn};

use crate::context::StorageContext;
use crate::services::location::StorageLocationManager;
use crate::services::migration::{MigrationEngine, MigrationSummary};
use crate::services::project_data::ProjectDataService;
use crate::services::project_index::ProjectIndexService;
use crate::services::recovery::{RecoveryEngine, RecoverySummary};
use crate::services::router::{ProjectRouter, SplitRouter};
use crate::storage::config::StorageConfigService;
use crate::storage::kv::{FileKvStore, KvStore};
use crate::utils::error::StorageResult;
use crate::utils::paths::storage_config_path;

/// What the startup sequence did
#[derive(Debug, Default)]
pub struct StartupSummary {
    /// None when migration failed outright
    pub migration: Option<MigrationSummary>,
    /// None when the recovery pass failed outright
    pub recovery: Option<RecoverySummary>,
    /// Cache bytes freed by auto-clean
    pub cache_freed_bytes: u64,
}

/// Storage engine facade over one configured base directory
pub struct StorageEngine {
    config: Arc<RwLock<StorageConfigService>>,
    context: Arc<StorageContext>,
}

impl StorageEngine {
    /// Engine over an already-loaded configuration
    pub fn new(config: StorageConfigService) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            context: Arc::new(StorageContext::new()),
        }
    }

    /// Engine over the configuration file at the default platform location
    pub async fn with_default_location() -> StorageResult<Self> {
        let path = storage_config_path()?;
        Ok(Self::new(StorageConfigService::load(path).await))
    }

    /// The shared routing context
    pub fn context(&self) -> Arc<StorageContext> {
        self.context.clone()
    }

    /// KV handle over the current projects root. Built fresh per call so it
    /// always reflects the base path the configuration points at now.
    pub async fn kv(&self) -> StorageResult<Arc<dyn KvStore>> {
        let base = self.config.read().await.effective_base()?;
        Ok(Arc::new(FileKvStore::new(base.join("projects"))))
    }

    /// Router for whole-file per-project stores
    pub async fn project_router(&self) -> StorageResult<ProjectRouter> {
        Ok(ProjectRouter::new(self.kv().await?, self.context.clone()))
    }

    /// Router for flat-collection stores
    pub async fn split_router(&self) -> StorageResult<SplitRouter> {
        Ok(SplitRouter::new(self.kv().await?, self.context.clone()))
    }

    /// Service over the global project index
    pub async fn project_index(&self) -> StorageResult<ProjectIndexService> {
        Ok(ProjectIndexService::new(self.kv().await?, self.context.clone()))
    }

    /// Service for explicit per-project data cleanup
    pub async fn project_data(&self) -> StorageResult<ProjectDataService> {
        Ok(ProjectDataService::new(self.kv().await?, self.context.clone()))
    }

    /// Manager for base-directory operations (validate, link, move, export,
    /// import, cache). Shares this engine's configuration, so a successful
    /// operation re-points every router created afterwards.
    pub fn location(&self) -> StorageLocationManager {
        StorageLocationManager::new(self.config.clone())
    }

    /// Toggle cross-project sharing for a flat-collection store
    pub async fn set_sharing(&self, store: &str, enabled: bool) {
        self.context.set_sharing(store, enabled).await;
    }

    /// Run the startup sequence. Routers must not be trusted before this
    /// completes: migration and recovery run first, then the project index
    /// load opens the hydration gate they wait on.
    pub async fn initialize(&self) -> StartupSummary {
        let mut summary = StartupSummary::default();

        let kv = match self.kv().await {
            Ok(kv) => kv,
            Err(e) => {
                error!("Storage root is unavailable, starting without persistence: {}", e);
                self.context.mark_hydrated();
                return summary;
            }
        };

        match MigrationEngine::new(kv.clone()).migrate().await {
            Ok(migration) => summary.migration = Some(migration),
            Err(e) => error!("Migration failed, continuing with the existing layout: {}", e),
        }

        match RecoveryEngine::new(kv.clone()).recover().await {
            Ok(recovery) => summary.recovery = Some(recovery),
            Err(e) => error!("Recovery pass failed: {}", e),
        }

        ProjectIndexService::new(kv, self.context.clone())
            .hydrate()
            .await;

        match self.location().run_auto_clean().await {
            Ok(freed) => summary.cache_freed_bytes = freed,
            Err(e) => warn!("Automatic cache clean failed: {}", e),
        }

        summary
    }
}
