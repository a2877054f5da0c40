//! Sync orchestrator - merges remote changes into the local cache

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use campusbridge_domain::constants::DEFAULT_SYNC_PAGE_SIZE;
use campusbridge_domain::{
    EntitySyncOutcome, EntityType, Record, SyncOutcomeStatus, SyncReport, SyncStats,
};
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::ports::{RecordCache, RemoteRecordSource};

/// Failure reason recorded for an entity interrupted by cancellation.
pub const CANCELLED_REASON: &str = "sync cancelled";

/// Tunables for the orchestrator.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Maximum records requested per entity type and cycle.
    pub page_size: usize,
    /// Entity types visited by `sync_all`, in order.
    pub entities: Vec<EntityType>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self { page_size: DEFAULT_SYNC_PAGE_SIZE, entities: EntityType::ALL.to_vec() }
    }
}

/// Sync orchestrator
///
/// Each entity type is synced independently: a failure for one type leaves
/// its watermark untouched and does not stop the others. Merges for the same
/// type are serialised; different types never block each other.
pub struct SyncService {
    source: Arc<dyn RemoteRecordSource>,
    cache: Arc<dyn RecordCache>,
    settings: SyncSettings,
    entity_locks: HashMap<EntityType, AsyncMutex<()>>,
    stats: Mutex<SyncStats>,
}

impl SyncService {
    /// Create a new sync service
    pub fn new(
        source: Arc<dyn RemoteRecordSource>,
        cache: Arc<dyn RecordCache>,
        settings: SyncSettings,
    ) -> Self {
        let entity_locks =
            EntityType::ALL.into_iter().map(|entity| (entity, AsyncMutex::new(()))).collect();

        Self { source, cache, settings, entity_locks, stats: Mutex::new(SyncStats::default()) }
    }

    /// Read access to the cache the service writes into.
    pub fn cache(&self) -> &Arc<dyn RecordCache> {
        &self.cache
    }

    /// Cumulative statistics since construction.
    pub fn stats(&self) -> SyncStats {
        self.stats.lock().clone()
    }

    /// Run one sync cycle over every configured entity type.
    #[instrument(skip(self))]
    pub async fn sync_all(&self) -> SyncReport {
        self.run_cycle(None).await
    }

    /// Run one sync cycle that stops early once `cancel` fires.
    ///
    /// The token is checked before each entity type and raced against the
    /// lock wait and the remote fetch. An interrupted entity is reported as
    /// failed with its watermark untouched; a merge already under way is
    /// committed. Entity types after it are left out of the report.
    #[instrument(skip(self, cancel))]
    pub async fn sync_all_until(&self, cancel: &CancellationToken) -> SyncReport {
        self.run_cycle(Some(cancel)).await
    }

    async fn run_cycle(&self, cancel: Option<&CancellationToken>) -> SyncReport {
        let started_at = Utc::now();
        let mut outcomes = Vec::with_capacity(self.settings.entities.len());
        let mut cancelled = false;

        for entity in &self.settings.entities {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                cancelled = true;
                break;
            }
            let outcome = self.sync_entity_with(*entity, cancel).await;
            let interrupted = matches!(
                &outcome.status,
                SyncOutcomeStatus::Failed(reason) if reason == CANCELLED_REASON
            );
            outcomes.push(outcome);
            if interrupted {
                cancelled = true;
                break;
            }
        }

        let report = SyncReport { started_at, finished_at: Utc::now(), outcomes, cancelled };
        self.stats.lock().record(&report);

        info!(
            advanced = report.advanced_count(),
            failed = report.failed_count(),
            merged = report.total_merged(),
            cancelled = report.cancelled,
            "sync cycle finished"
        );

        report
    }

    /// Sync a single entity type.
    ///
    /// 1. Read the watermark (absent means "from the beginning")
    /// 2. Fetch records modified at or after it
    /// 3. Upsert them and advance the watermark to their maximum timestamp
    pub async fn sync_entity(&self, entity: EntityType) -> EntitySyncOutcome {
        self.sync_entity_with(entity, None).await
    }

    #[instrument(skip(self, cancel), fields(entity = %entity))]
    async fn sync_entity_with(
        &self,
        entity: EntityType,
        cancel: Option<&CancellationToken>,
    ) -> EntitySyncOutcome {
        let _guard = match self.entity_locks.get(&entity) {
            Some(lock) => match until_cancelled(cancel, lock.lock()).await {
                Some(guard) => Some(guard),
                None => return EntitySyncOutcome::failed(entity, CANCELLED_REASON, None),
            },
            None => None,
        };

        let current = match self.cache.get_watermark(entity).await {
            Ok(watermark) => watermark.map(|w| w.last_modified),
            Err(err) => {
                warn!(error = %err, "failed to read watermark");
                return EntitySyncOutcome::failed(entity, err.to_string(), None);
            }
        };

        let fetch = self.source.fetch_modified_since(entity, current, self.settings.page_size);
        let records = match until_cancelled(cancel, fetch).await {
            Some(Ok(records)) => records,
            Some(Err(err)) => {
                warn!(error = %err, "remote query failed; watermark left unchanged");
                return EntitySyncOutcome::failed(entity, err.to_string(), current);
            }
            None => {
                info!("sync cancelled while waiting for the remote");
                return EntitySyncOutcome::failed(entity, CANCELLED_REASON, current);
            }
        };

        let fetched = records.len();
        let (valid, skipped) = split_mergeable(records);
        if skipped > 0 {
            warn!(skipped, "ignoring records without identifier or modified timestamp");
        }

        if valid.is_empty() {
            debug!(fetched, "no new records");
            return EntitySyncOutcome {
                entity,
                status: SyncOutcomeStatus::Unchanged,
                fetched,
                merged: 0,
                skipped,
                watermark: current,
            };
        }

        let newest = valid.iter().filter_map(Record::modified).max();

        match self.cache.merge(entity, valid, newest).await {
            Ok((merged, watermark)) => {
                let watermark = watermark.map(|w| w.last_modified);
                let status = if watermark > current {
                    SyncOutcomeStatus::Advanced
                } else {
                    SyncOutcomeStatus::Unchanged
                };
                debug!(fetched, merged, ?watermark, "entity merged");
                EntitySyncOutcome { entity, status, fetched, merged, skipped, watermark }
            }
            Err(err) => {
                warn!(error = %err, "merge failed; watermark left unchanged");
                EntitySyncOutcome {
                    fetched,
                    skipped,
                    ..EntitySyncOutcome::failed(entity, err.to_string(), current)
                }
            }
        }
    }
}

/// Drive `fut` to completion unless `cancel` fires first.
async fn until_cancelled<F: Future>(
    cancel: Option<&CancellationToken>,
    fut: F,
) -> Option<F::Output> {
    match cancel {
        Some(token) => tokio::select! {
            biased;
            () = token.cancelled() => None,
            output = fut => Some(output),
        },
        None => Some(fut.await),
    }
}

/// Keep only records the cache can key and order; count the rest.
fn split_mergeable(records: Vec<Record>) -> (Vec<Record>, usize) {
    let total = records.len();
    let valid: Vec<Record> =
        records.into_iter().filter(|r| r.id().is_some() && r.modified().is_some()).collect();
    let skipped = total - valid.len();
    (valid, skipped)
}
