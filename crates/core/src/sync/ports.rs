//! Port interfaces for sync operations

use async_trait::async_trait;
use campusbridge_domain::{EntityType, Record, Result, SyncWatermark};
use chrono::NaiveDateTime;

/// Source of changed records (the ERP).
///
/// Unlike the fail-soft query methods used by request handlers, this port
/// reports failures so the orchestrator can tell "nothing new" from "query
/// failed".
#[async_trait]
pub trait RemoteRecordSource: Send + Sync {
    /// Fetch at most `limit` records of `entity` modified at or after `since`
    /// (everything when `since` is `None`), newest first.
    async fn fetch_modified_since(
        &self,
        entity: EntityType,
        since: Option<NaiveDateTime>,
        limit: usize,
    ) -> Result<Vec<Record>>;
}

/// Persistent snapshot of synced records plus one watermark per entity type.
#[async_trait]
pub trait RecordCache: Send + Sync {
    /// Current watermark for an entity type, if it was ever synced.
    async fn get_watermark(&self, entity: EntityType) -> Result<Option<SyncWatermark>>;

    /// All stored watermarks.
    async fn list_watermarks(&self) -> Result<Vec<SyncWatermark>>;

    /// Upsert `records` by identifier and, when `advance_to` is given, move the
    /// watermark to `max(current, advance_to)`.
    ///
    /// Both happen in one transaction. Every record must carry an identifier
    /// and a `modified` timestamp. Returns the number of rows inserted or
    /// changed and the watermark after the merge.
    async fn merge(
        &self,
        entity: EntityType,
        records: Vec<Record>,
        advance_to: Option<NaiveDateTime>,
    ) -> Result<(usize, Option<SyncWatermark>)>;

    async fn get_record(&self, entity: EntityType, id: &str) -> Result<Option<Record>>;

    /// Every cached record of an entity type, ordered by identifier.
    async fn list_records(&self, entity: EntityType) -> Result<Vec<Record>>;

    async fn count_records(&self, entity: EntityType) -> Result<usize>;

    /// Drop all records and the watermark of an entity type (full resync).
    async fn clear(&self, entity: EntityType) -> Result<()>;
}
