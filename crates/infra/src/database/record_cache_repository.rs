//! SQLite implementation of the record cache port
//!
//! Records are stored as JSON payloads keyed by `(entity_type, record_id)`.
//! Upserts and the watermark advance for one merge share a transaction.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use campusbridge_core::RecordCache;
use campusbridge_domain::{
    format_erp_timestamp, parse_erp_timestamp, CampusBridgeError, EntityType, Record,
    Result as DomainResult, SyncWatermark,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::task;
use tracing::debug;

use super::manager::{map_sql_error, DbManager};

const UPSERT_RECORD_SQL: &str = "
    INSERT INTO cached_records (entity_type, record_id, modified, payload, synced_at)
    VALUES (?1, ?2, ?3, ?4, ?5)
    ON CONFLICT(entity_type, record_id) DO UPDATE SET
        modified = excluded.modified,
        payload = excluded.payload,
        synced_at = excluded.synced_at
    WHERE excluded.modified > cached_records.modified
       OR (excluded.modified = cached_records.modified
           AND excluded.payload <> cached_records.payload)";

const ADVANCE_WATERMARK_SQL: &str = "
    INSERT INTO sync_watermarks (entity_type, last_modified, synced_at)
    VALUES (?1, ?2, ?3)
    ON CONFLICT(entity_type) DO UPDATE SET
        last_modified = excluded.last_modified,
        synced_at = excluded.synced_at
    WHERE excluded.last_modified > sync_watermarks.last_modified";

/// SQLite-backed record cache
pub struct SqliteRecordCache {
    db: Arc<DbManager>,
}

impl SqliteRecordCache {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecordCache for SqliteRecordCache {
    async fn get_watermark(&self, entity: EntityType) -> DomainResult<Option<SyncWatermark>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Option<SyncWatermark>> {
            let conn = db.get_connection()?;
            query_watermark(&conn, entity)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_watermarks(&self) -> DomainResult<Vec<SyncWatermark>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<SyncWatermark>> {
            let conn = db.get_connection()?;
            query_watermarks(&conn)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn merge(
        &self,
        entity: EntityType,
        records: Vec<Record>,
        advance_to: Option<NaiveDateTime>,
    ) -> DomainResult<(usize, Option<SyncWatermark>)> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<(usize, Option<SyncWatermark>)> {
            let mut conn = db.get_connection()?;
            merge_records(&mut conn, entity, &records, advance_to)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get_record(&self, entity: EntityType, id: &str) -> DomainResult<Option<Record>> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<Record>> {
            let conn = db.get_connection()?;
            let payload: Option<String> = conn
                .query_row(
                    "SELECT payload FROM cached_records WHERE entity_type = ?1 AND record_id = ?2",
                    params![entity.as_str(), id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(map_sql_error)?;
            payload.as_deref().map(decode_payload).transpose()
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_records(&self, entity: EntityType) -> DomainResult<Vec<Record>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<Record>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT payload FROM cached_records WHERE entity_type = ?1
                     ORDER BY record_id ASC",
                )
                .map_err(map_sql_error)?;
            let payloads = stmt
                .query_map(params![entity.as_str()], |row| row.get::<_, String>(0))
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            payloads.iter().map(|p| decode_payload(p)).collect()
        })
        .await
        .map_err(map_join_error)?
    }

    async fn count_records(&self, entity: EntityType) -> DomainResult<usize> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<usize> {
            let conn = db.get_connection()?;
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM cached_records WHERE entity_type = ?1",
                    params![entity.as_str()],
                    |row| row.get(0),
                )
                .map_err(map_sql_error)?;
            usize::try_from(count)
                .map_err(|_| CampusBridgeError::Database(format!("invalid row count {count}")))
        })
        .await
        .map_err(map_join_error)?
    }

    async fn clear(&self, entity: EntityType) -> DomainResult<()> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<()> {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(map_sql_error)?;
            let removed = tx
                .execute("DELETE FROM cached_records WHERE entity_type = ?1", params![entity.as_str()])
                .map_err(map_sql_error)?;
            tx.execute("DELETE FROM sync_watermarks WHERE entity_type = ?1", params![entity.as_str()])
                .map_err(map_sql_error)?;
            tx.commit().map_err(map_sql_error)?;
            debug!(entity = %entity, removed, "cache cleared");
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

// ============================================================================
// SQL Operations (synchronous)
// ============================================================================

fn merge_records(
    conn: &mut Connection,
    entity: EntityType,
    records: &[Record],
    advance_to: Option<NaiveDateTime>,
) -> DomainResult<(usize, Option<SyncWatermark>)> {
    let synced_at = Utc::now().timestamp();
    let tx = conn.transaction().map_err(map_sql_error)?;

    let mut changed = 0;
    {
        let mut upsert = tx.prepare_cached(UPSERT_RECORD_SQL).map_err(map_sql_error)?;
        for record in records {
            let (Some(id), Some(modified)) = (record.id(), record.modified()) else {
                return Err(CampusBridgeError::InvalidInput(format!(
                    "{entity} record without identifier or modified timestamp"
                )));
            };
            let payload = serde_json::to_string(record)
                .map_err(|e| CampusBridgeError::Internal(format!("failed to encode record: {e}")))?;
            changed += upsert
                .execute(params![
                    entity.as_str(),
                    id,
                    format_erp_timestamp(&modified),
                    payload,
                    synced_at
                ])
                .map_err(map_sql_error)?;
        }
    }

    if let Some(candidate) = advance_to {
        tx.execute(
            ADVANCE_WATERMARK_SQL,
            params![entity.as_str(), format_erp_timestamp(&candidate), synced_at],
        )
        .map_err(map_sql_error)?;
    }

    let watermark = query_watermark(&tx, entity)?;
    tx.commit().map_err(map_sql_error)?;

    Ok((changed, watermark))
}

fn query_watermark(conn: &Connection, entity: EntityType) -> DomainResult<Option<SyncWatermark>> {
    conn.query_row(
        "SELECT entity_type, last_modified, synced_at FROM sync_watermarks WHERE entity_type = ?1",
        params![entity.as_str()],
        map_watermark_row,
    )
    .optional()
    .map_err(map_sql_error)?
    .map(into_watermark)
    .transpose()
}

fn query_watermarks(conn: &Connection) -> DomainResult<Vec<SyncWatermark>> {
    let mut stmt = conn
        .prepare(
            "SELECT entity_type, last_modified, synced_at FROM sync_watermarks
             ORDER BY entity_type ASC",
        )
        .map_err(map_sql_error)?;
    let rows = stmt
        .query_map([], map_watermark_row)
        .map_err(map_sql_error)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(map_sql_error)?;
    rows.into_iter().map(into_watermark).collect()
}

type WatermarkRow = (String, String, i64);

fn map_watermark_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<WatermarkRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn into_watermark((entity, last_modified, synced_at): WatermarkRow) -> DomainResult<SyncWatermark> {
    let entity = EntityType::from_str(&entity)?;
    let last_modified = parse_erp_timestamp(&last_modified).ok_or_else(|| {
        CampusBridgeError::Database(format!("corrupt watermark for {entity}: {last_modified}"))
    })?;
    let synced_at = DateTime::<Utc>::from_timestamp(synced_at, 0).ok_or_else(|| {
        CampusBridgeError::Database(format!("corrupt sync time for {entity}: {synced_at}"))
    })?;
    Ok(SyncWatermark { entity, last_modified, synced_at })
}

fn decode_payload(payload: &str) -> DomainResult<Record> {
    serde_json::from_str(payload)
        .map_err(|e| CampusBridgeError::Database(format!("corrupt cached payload: {e}")))
}

fn map_join_error(err: task::JoinError) -> CampusBridgeError {
    CampusBridgeError::Internal(format!("database task failed: {err}"))
}
