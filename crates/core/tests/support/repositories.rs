//! Mock port implementations for testing
//!
//! Provides in-memory versions of `RemoteRecordSource` and `RecordCache`,
//! enabling deterministic sync tests without HTTP or database dependencies.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use campusbridge_core::{RecordCache, RemoteRecordSource};
use campusbridge_domain::{
    CampusBridgeError, EntityType, Record, Result as DomainResult, SyncWatermark,
};
use chrono::{NaiveDateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

/// Remote source that answers with whatever each entity was scripted to.
///
/// Unscripted entity types answer with an empty page. Fetches for a held
/// entity type wait until the returned gate hands out a permit.
#[derive(Default)]
pub struct ScriptedRemoteSource {
    responses: Mutex<HashMap<EntityType, DomainResult<Vec<Record>>>>,
    calls: Mutex<Vec<(EntityType, Option<NaiveDateTime>, usize)>>,
    gates: Mutex<HashMap<EntityType, Arc<Semaphore>>>,
}

impl ScriptedRemoteSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, entity: EntityType, records: Vec<Record>) {
        self.responses.lock().insert(entity, Ok(records));
    }

    pub fn fail(&self, entity: EntityType, error: CampusBridgeError) {
        self.responses.lock().insert(entity, Err(error));
    }

    pub fn reset(&self) {
        self.responses.lock().clear();
    }

    /// Hold every fetch for `entity` until a permit is added to the gate.
    pub fn hold(&self, entity: EntityType) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates.lock().insert(entity, Arc::clone(&gate));
        gate
    }

    pub fn calls_for(&self, entity: EntityType) -> usize {
        self.calls.lock().iter().filter(|(called, _, _)| *called == entity).count()
    }

    /// `(entity, since, limit)` for every call made so far.
    pub fn calls(&self) -> Vec<(EntityType, Option<NaiveDateTime>, usize)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl RemoteRecordSource for ScriptedRemoteSource {
    async fn fetch_modified_since(
        &self,
        entity: EntityType,
        since: Option<NaiveDateTime>,
        limit: usize,
    ) -> DomainResult<Vec<Record>> {
        self.calls.lock().push((entity, since, limit));

        let gate = self.gates.lock().get(&entity).cloned();
        if let Some(gate) = gate {
            gate.acquire()
                .await
                .map_err(|_| CampusBridgeError::Internal("gate closed".into()))?
                .forget();
        }

        self.responses.lock().get(&entity).cloned().unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[derive(Default)]
struct CacheState {
    records: HashMap<EntityType, BTreeMap<String, Record>>,
    watermarks: HashMap<EntityType, SyncWatermark>,
}

/// In-memory cache with the same upsert and watermark rules as the SQLite one.
#[derive(Default)]
pub struct InMemoryRecordCache {
    state: Mutex<CacheState>,
    failing_merges: Mutex<HashSet<EntityType>>,
}

impl InMemoryRecordCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent merge for `entity` fail.
    pub fn fail_merges_for(&self, entity: EntityType) {
        self.failing_merges.lock().insert(entity);
    }

    pub fn ids(&self, entity: EntityType) -> Vec<String> {
        self.state
            .lock()
            .records
            .get(&entity)
            .map(|records| records.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RecordCache for InMemoryRecordCache {
    async fn get_watermark(&self, entity: EntityType) -> DomainResult<Option<SyncWatermark>> {
        Ok(self.state.lock().watermarks.get(&entity).cloned())
    }

    async fn list_watermarks(&self) -> DomainResult<Vec<SyncWatermark>> {
        let mut watermarks: Vec<_> = self.state.lock().watermarks.values().cloned().collect();
        watermarks.sort_by_key(|w| w.entity);
        Ok(watermarks)
    }

    async fn merge(
        &self,
        entity: EntityType,
        records: Vec<Record>,
        advance_to: Option<NaiveDateTime>,
    ) -> DomainResult<(usize, Option<SyncWatermark>)> {
        if self.failing_merges.lock().contains(&entity) {
            return Err(CampusBridgeError::Database("disk I/O error".into()));
        }

        let mut state = self.state.lock();
        let mut changed = 0;
        {
            let table = state.records.entry(entity).or_default();
            for record in records {
                let (Some(id), Some(modified)) = (record.id(), record.modified()) else {
                    return Err(CampusBridgeError::InvalidInput("record without key".into()));
                };
                let replace = match table.get(id) {
                    None => true,
                    Some(existing) => {
                        let existing_modified = existing.modified();
                        Some(modified) > existing_modified
                            || (Some(modified) == existing_modified && existing != &record)
                    }
                };
                if replace {
                    table.insert(id.to_string(), record);
                    changed += 1;
                }
            }
        }

        if let Some(candidate) = advance_to {
            let current = state.watermarks.get(&entity).map(|w| w.last_modified);
            if current.map_or(true, |current| candidate > current) {
                state.watermarks.insert(
                    entity,
                    SyncWatermark { entity, last_modified: candidate, synced_at: Utc::now() },
                );
            }
        }

        Ok((changed, state.watermarks.get(&entity).cloned()))
    }

    async fn get_record(&self, entity: EntityType, id: &str) -> DomainResult<Option<Record>> {
        Ok(self.state.lock().records.get(&entity).and_then(|t| t.get(id)).cloned())
    }

    async fn list_records(&self, entity: EntityType) -> DomainResult<Vec<Record>> {
        Ok(self
            .state
            .lock()
            .records
            .get(&entity)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn count_records(&self, entity: EntityType) -> DomainResult<usize> {
        Ok(self.state.lock().records.get(&entity).map_or(0, BTreeMap::len))
    }

    async fn clear(&self, entity: EntityType) -> DomainResult<()> {
        let mut state = self.state.lock();
        state.records.remove(&entity);
        state.watermarks.remove(&entity);
        Ok(())
    }
}

/// Cache that records how many merges for one entity type overlap.
///
/// Each merge lingers for `hold` before delegating, so unserialised merges
/// would be caught overlapping.
pub struct OverlapTrackingCache {
    inner: InMemoryRecordCache,
    hold: Duration,
    merges: Mutex<HashMap<EntityType, (usize, usize)>>,
}

impl OverlapTrackingCache {
    pub fn new(hold: Duration) -> Self {
        Self { inner: InMemoryRecordCache::new(), hold, merges: Mutex::new(HashMap::new()) }
    }

    /// Highest number of simultaneous merges seen for `entity`.
    pub fn peak_merges(&self, entity: EntityType) -> usize {
        self.merges.lock().get(&entity).map_or(0, |(_, peak)| *peak)
    }
}

#[async_trait]
impl RecordCache for OverlapTrackingCache {
    async fn get_watermark(&self, entity: EntityType) -> DomainResult<Option<SyncWatermark>> {
        self.inner.get_watermark(entity).await
    }

    async fn list_watermarks(&self) -> DomainResult<Vec<SyncWatermark>> {
        self.inner.list_watermarks().await
    }

    async fn merge(
        &self,
        entity: EntityType,
        records: Vec<Record>,
        advance_to: Option<NaiveDateTime>,
    ) -> DomainResult<(usize, Option<SyncWatermark>)> {
        {
            let mut merges = self.merges.lock();
            let (active, peak) = merges.entry(entity).or_insert((0, 0));
            *active += 1;
            *peak = (*peak).max(*active);
        }

        tokio::time::sleep(self.hold).await;
        let result = self.inner.merge(entity, records, advance_to).await;

        if let Some((active, _)) = self.merges.lock().get_mut(&entity) {
            *active -= 1;
        }
        result
    }

    async fn get_record(&self, entity: EntityType, id: &str) -> DomainResult<Option<Record>> {
        self.inner.get_record(entity, id).await
    }

    async fn list_records(&self, entity: EntityType) -> DomainResult<Vec<Record>> {
        self.inner.list_records(entity).await
    }

    async fn count_records(&self, entity: EntityType) -> DomainResult<usize> {
        self.inner.count_records(entity).await
    }

    async fn clear(&self, entity: EntityType) -> DomainResult<()> {
        self.inner.clear(entity).await
    }
}
