//! Application context - dependency injection container

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use campusbridge_core::{RecordCache, SyncService, SyncSettings};
use campusbridge_domain::{CampusBridgeError, Config, EntityType, Result, SyncReport};
use campusbridge_infra::{
    DbManager, ErpClient, ErpQueries, SchedulerError, SqliteRecordCache, SyncScheduler,
    SyncSchedulerConfig,
};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

const START_TIMEOUT: Duration = Duration::from_secs(10);

/// Application context - owns every long-lived component.
///
/// Built once at startup. [`AppContext::shutdown`] stops the scheduler and
/// then closes the ERP client; it is safe to call more than once.
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub erp: Arc<ErpClient>,
    pub queries: ErpQueries,
    pub cache: Arc<dyn RecordCache>,
    pub sync_service: Arc<SyncService>,
    sync_scheduler: Mutex<SyncScheduler>,
}

impl AppContext {
    /// Create the application context from a validated configuration.
    ///
    /// Opens (and migrates) the cache database, builds the ERP client and
    /// starts the background scheduler when sync is enabled. An unreachable
    /// ERP is logged, not fatal.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration, an unusable database file, or a
    /// scheduler that does not start in time.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        ensure_parent_dir(Path::new(&config.database.path))?;
        let db = Arc::new(DbManager::new(&config.database.path, config.database.pool_size)?);
        db.run_migrations()?;

        let erp = Arc::new(ErpClient::new(&config.erp).map_err(CampusBridgeError::from)?);
        if erp.ping().await {
            info!(base_url = %erp.base_url(), "ERP reachable");
        } else {
            warn!(base_url = %erp.base_url(), "ERP not reachable at startup; sync will retry");
        }

        let queries = ErpQueries::new(Arc::clone(&erp));
        let cache: Arc<dyn RecordCache> = Arc::new(SqliteRecordCache::new(Arc::clone(&db)));
        let sync_service = Arc::new(SyncService::new(
            Arc::new(queries.clone()),
            Arc::clone(&cache),
            SyncSettings { page_size: config.sync.page_size, entities: EntityType::ALL.to_vec() },
        ));

        let scheduler_config = SyncSchedulerConfig {
            interval: Duration::from_secs(config.sync.interval_seconds.max(1)),
            ..Default::default()
        };
        let mut scheduler = SyncScheduler::new(Arc::clone(&sync_service), scheduler_config);

        if config.sync.enabled {
            start_scheduler(&mut scheduler).await?;
        } else {
            info!("background sync disabled by configuration");
        }

        Ok(Self {
            config,
            db,
            erp,
            queries,
            cache,
            sync_service,
            sync_scheduler: Mutex::new(scheduler),
        })
    }

    /// Run one sync cycle immediately, independent of the schedule.
    pub async fn sync_now(&self) -> SyncReport {
        self.sync_service.sync_all().await
    }

    /// Whether the background scheduler is currently running.
    pub async fn is_sync_running(&self) -> bool {
        self.sync_scheduler.lock().await.is_running()
    }

    /// Tear down in order: stop the scheduler, then close the ERP client.
    ///
    /// # Errors
    ///
    /// Returns the scheduler's error if it fails to stop in time. The client
    /// is closed either way.
    pub async fn shutdown(&self) -> Result<()> {
        info!("shutdown called on AppContext");

        let stopped = {
            let mut scheduler = self.sync_scheduler.lock().await;
            match scheduler.stop().await {
                Ok(()) | Err(SchedulerError::NotRunning) => Ok(()),
                Err(err) => {
                    error!(error = %err, "failed to stop SyncScheduler");
                    Err(CampusBridgeError::from(err))
                }
            }
        };

        self.erp.close();
        info!("ERP client closed");

        stopped
    }
}

async fn start_scheduler(scheduler: &mut SyncScheduler) -> Result<()> {
    tokio::time::timeout(START_TIMEOUT, scheduler.start())
        .await
        .map_err(|_| {
            error!(timeout_secs = START_TIMEOUT.as_secs(), "SyncScheduler start timed out");
            CampusBridgeError::Internal("SyncScheduler start timed out after 10s".into())
        })?
        .map_err(|err| {
            error!(error = %err, "failed to start SyncScheduler");
            CampusBridgeError::from(err)
        })
}

fn ensure_parent_dir(db_path: &Path) -> Result<()> {
    match db_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|err| {
                CampusBridgeError::Database(format!(
                    "failed to create database directory {}: {}",
                    parent.display(),
                    err
                ))
            })
        }
        _ => Ok(()),
    }
}
