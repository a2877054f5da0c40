//! Sync scheduler for periodic cache refresh.
//!
//! Runs a sync cycle once at start and then on every interval tick until
//! stopped. Each cycle runs in its own task so a panicking cycle is logged and
//! the loop carries on. Stopping cancels the cycle in progress at its next
//! remote call; entity types already merged keep their watermarks.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use campusbridge_core::SyncService;
//! use campusbridge_infra::scheduling::{SyncScheduler, SyncSchedulerConfig};
//!
//! # async fn example(service: Arc<SyncService>) -> Result<(), Box<dyn std::error::Error>> {
//! let mut scheduler = SyncScheduler::new(
//!     service,
//!     SyncSchedulerConfig { interval: Duration::from_secs(600), ..Default::default() },
//! );
//!
//! scheduler.start().await?;
//! // ... application runs ...
//! scheduler.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use campusbridge_core::SyncService;
use campusbridge_domain::constants::DEFAULT_SYNC_INTERVAL_SECS;
use campusbridge_domain::SyncReport;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Type alias for task handle to avoid complexity warnings
type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

/// Configuration for sync scheduler
#[derive(Debug, Clone)]
pub struct SyncSchedulerConfig {
    /// Pause between the end of one cycle and the start of the next
    pub interval: Duration,
    /// Run a cycle as soon as the scheduler starts
    pub run_on_start: bool,
    /// How long `stop` waits for the loop to wind down
    pub join_timeout: Duration,
}

impl Default for SyncSchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS),
            run_on_start: true,
            join_timeout: Duration::from_secs(30),
        }
    }
}

/// Sync scheduler with explicit start/stop lifecycle
pub struct SyncScheduler {
    service: Arc<SyncService>,
    config: SyncSchedulerConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl SyncScheduler {
    /// Create a new sync scheduler
    pub fn new(service: Arc<SyncService>, config: SyncSchedulerConfig) -> Self {
        Self {
            service,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the scheduler
    ///
    /// Spawns a background task that runs sync periodically.
    ///
    /// # Errors
    ///
    /// Returns error if scheduler is already running
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        info!(interval_secs = self.config.interval.as_secs(), "Starting sync scheduler");

        // Fresh token so the scheduler can be restarted after stop
        self.cancellation_token = CancellationToken::new();

        let service = Arc::clone(&self.service);
        let config = self.config.clone();
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::sync_loop(service, config, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);

        info!("Sync scheduler started");
        Ok(())
    }

    /// Stop the scheduler gracefully
    ///
    /// Cancels the background task and waits for the cycle in progress.
    ///
    /// # Errors
    ///
    /// Returns error if scheduler is not running, or the loop does not finish
    /// within the join timeout.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        info!("Stopping sync scheduler");

        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            let join_timeout = self.config.join_timeout;
            match tokio::time::timeout(join_timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => return Err(SchedulerError::TaskJoinFailed(err.to_string())),
                Err(_) => {
                    warn!(timeout_secs = join_timeout.as_secs(), "Sync loop did not stop in time");
                    return Err(SchedulerError::Timeout { seconds: join_timeout.as_secs() });
                }
            }
        }

        info!("Sync scheduler stopped");
        Ok(())
    }

    /// Check if scheduler is running
    ///
    /// A scheduler is considered running if it has an active task handle that
    /// hasn't finished.
    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Run one cycle now, outside the regular schedule.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::TaskJoinFailed`] if the cycle panicked.
    #[instrument(skip(self))]
    pub async fn trigger_now(&self) -> SchedulerResult<SyncReport> {
        let service = Arc::clone(&self.service);
        tokio::spawn(async move { service.sync_all().await })
            .await
            .map_err(|err| SchedulerError::TaskJoinFailed(err.to_string()))
    }

    /// Background sync loop
    async fn sync_loop(
        service: Arc<SyncService>,
        config: SyncSchedulerConfig,
        cancel: CancellationToken,
    ) {
        if config.run_on_start {
            Self::run_cycle(&service, &cancel).await;
        }

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("Sync loop cancelled");
                    break;
                }
                () = tokio::time::sleep(config.interval) => {
                    Self::run_cycle(&service, &cancel).await;
                }
            }
        }
    }

    async fn run_cycle(service: &Arc<SyncService>, cancel: &CancellationToken) {
        let service = Arc::clone(service);
        let cycle_token = cancel.child_token();
        let started = Instant::now();

        match tokio::spawn(async move { service.sync_all_until(&cycle_token).await }).await {
            Ok(report) if report.cancelled => {
                info!(
                    visited = report.outcomes.len(),
                    merged = report.total_merged(),
                    "Scheduled sync cycle cancelled"
                );
            }
            Ok(report) => {
                info!(
                    advanced = report.advanced_count(),
                    failed = report.failed_count(),
                    merged = report.total_merged(),
                    duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "Scheduled sync cycle completed"
                );
            }
            Err(err) => {
                error!(error = %err, "Scheduled sync cycle aborted");
            }
        }
    }
}

/// Ensure scheduler is stopped when dropped
impl Drop for SyncScheduler {
    fn drop(&mut self) {
        if self.is_running() && !self.cancellation_token.is_cancelled() {
            warn!("SyncScheduler dropped while running; cancelling");
            self.cancellation_token.cancel();
        }
    }
}
