//! Sync bookkeeping: watermarks, per-cycle reports and cumulative stats.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::EntityType;

/// Boundary of the most recent successfully merged record for one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncWatermark {
    pub entity: EntityType,
    /// Highest `modified` timestamp merged so far.
    pub last_modified: NaiveDateTime,
    /// Wall-clock time of the merge that last moved this watermark forward.
    pub synced_at: DateTime<Utc>,
}

/// What a sync cycle did for one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum SyncOutcomeStatus {
    /// Records were merged and the watermark moved to their maximum.
    Advanced,
    /// The remote confirmed there was nothing to merge.
    Unchanged,
    /// The remote query or the merge failed; retried next cycle.
    Failed(String),
}

/// Per-entity section of a [`SyncReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySyncOutcome {
    pub entity: EntityType,
    pub status: SyncOutcomeStatus,
    /// Records returned by the remote.
    pub fetched: usize,
    /// Records upserted into the cache.
    pub merged: usize,
    /// Records dropped because they lacked an identifier or timestamp.
    pub skipped: usize,
    /// Watermark after the cycle (unchanged on failure).
    pub watermark: Option<NaiveDateTime>,
}

impl EntitySyncOutcome {
    pub fn failed(
        entity: EntityType,
        reason: impl Into<String>,
        watermark: Option<NaiveDateTime>,
    ) -> Self {
        Self {
            entity,
            status: SyncOutcomeStatus::Failed(reason.into()),
            fetched: 0,
            merged: 0,
            skipped: 0,
            watermark,
        }
    }

    pub fn advanced(&self) -> bool {
        matches!(self.status, SyncOutcomeStatus::Advanced)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, SyncOutcomeStatus::Failed(_))
    }
}

/// Result of one `sync_all` cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Entity types visited before the cycle ended, in order.
    pub outcomes: Vec<EntitySyncOutcome>,
    /// The cycle was cut short by shutdown; later entity types were skipped.
    #[serde(default)]
    pub cancelled: bool,
}

impl SyncReport {
    pub fn outcome(&self, entity: EntityType) -> Option<&EntitySyncOutcome> {
        self.outcomes.iter().find(|outcome| outcome.entity == entity)
    }

    pub fn advanced_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.advanced()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    pub fn total_merged(&self) -> usize {
        self.outcomes.iter().map(|o| o.merged).sum()
    }

    pub fn is_fully_successful(&self) -> bool {
        !self.cancelled && self.failed_count() == 0
    }
}

/// Running totals across sync cycles since process start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    pub cycles: u64,
    pub successful_cycles: u64,
    pub failed_entities: u64,
    pub records_merged: u64,
    pub last_sync: Option<DateTime<Utc>>,
}

impl SyncStats {
    /// Fold one finished cycle into the totals.
    pub fn record(&mut self, report: &SyncReport) {
        self.cycles += 1;
        if report.is_fully_successful() {
            self.successful_cycles += 1;
        }
        self.failed_entities += report.failed_count() as u64;
        self.records_merged += report.total_merged() as u64;
        self.last_sync = Some(report.finished_at);
    }
}
