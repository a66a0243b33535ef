//! 内存版事件存储（InMemoryEventStore）
//!
//! 满足 `EventStore` 与 `EventOutbox` 协议的线程安全实现，用于测试、示例与本地开发：
//! - 追加时校验 EventId 与 (聚合类型, 聚合标识, 版本) 的唯一性，整批原子写入；
//! - 位点从 1 开始单调递增；
//! - 每条记录附带发件箱状态（是否已发布、失败次数、最近一次错误）。
//!
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{DomainError, DomainResult};
use crate::eventing::EventOutbox;
use crate::persist::{EventQuery, EventRecord, EventStore};

type VersionKey = (String, String, i64);

struct Row {
    record: EventRecord,
    published: bool,
    attempts: u32,
    last_error: Option<String>,
}

#[derive(Default)]
struct State {
    rows: Vec<Row>,
    // EventId -> rows 下标
    by_event_id: HashMap<String, usize>,
    versions: HashSet<VersionKey>,
}

/// 发件箱中单条记录的投递状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryStatus {
    pub published: bool,
    pub attempts: u32,
    pub last_error: Option<String>,
}

#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> DomainResult<MutexGuard<'_, State>> {
        self.state.lock().map_err(|e| DomainError::EventStore {
            reason: format!("lock poisoned: {e}"),
        })
    }

    /// 已存储的记录数
    pub fn len(&self) -> DomainResult<usize> {
        Ok(self.lock()?.rows.len())
    }

    pub fn is_empty(&self) -> DomainResult<bool> {
        Ok(self.lock()?.rows.is_empty())
    }

    pub fn unpublished_count(&self) -> DomainResult<usize> {
        Ok(self.lock()?.rows.iter().filter(|r| !r.published).count())
    }

    pub fn delivery_status(&self, event_id: &str) -> DomainResult<Option<DeliveryStatus>> {
        let state = self.lock()?;
        Ok(state.by_event_id.get(event_id).map(|&i| {
            let row = &state.rows[i];
            DeliveryStatus {
                published: row.published,
                attempts: row.attempts,
                last_error: row.last_error.clone(),
            }
        }))
    }

    fn set_published(&self, records: &[&EventRecord]) -> DomainResult<()> {
        let mut state = self.lock()?;
        for record in records {
            if let Some(&i) = state.by_event_id.get(record.event_id()) {
                state.rows[i].published = true;
            }
        }
        Ok(())
    }
}

fn version_key(record: &EventRecord) -> VersionKey {
    (
        record.aggregate_type().to_string(),
        record.aggregate_id().to_string(),
        record.version(),
    )
}

fn conflict(record: &EventRecord) -> DomainError {
    DomainError::VersionConflict {
        aggregate_type: record.aggregate_type().to_string(),
        aggregate_id: record.aggregate_id().to_string(),
        version: record.version(),
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(
        &self,
        records: Vec<EventRecord>,
        cancel: &CancellationToken,
    ) -> DomainResult<Vec<EventRecord>> {
        if cancel.is_cancelled() {
            return Err(DomainError::Cancelled);
        }
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let mut state = self.lock()?;

        // 先整体校验（含批内重复），全部通过后再写入
        let mut batch_ids = HashSet::new();
        let mut batch_keys = HashSet::new();
        for record in &records {
            let key = version_key(record);
            let duplicate_id = state.by_event_id.contains_key(record.event_id())
                || !batch_ids.insert(record.event_id());
            let duplicate_version = state.versions.contains(&key) || !batch_keys.insert(key);
            if duplicate_id || duplicate_version {
                warn!(
                    aggregate_type = record.aggregate_type(),
                    aggregate_id = record.aggregate_id(),
                    version = record.version(),
                    "append rejected: version conflict"
                );
                return Err(conflict(record));
            }
        }

        let mut stored = Vec::with_capacity(records.len());
        for record in records {
            let sequence = state.rows.len() as i64 + 1;
            let record = record.with_sequence(sequence);
            let index = state.rows.len();
            state
                .by_event_id
                .insert(record.event_id().to_string(), index);
            state.versions.insert(version_key(&record));
            state.rows.push(Row {
                record: record.clone(),
                published: false,
                attempts: 0,
                last_error: None,
            });
            stored.push(record);
        }

        debug!(count = stored.len(), "events appended");
        Ok(stored)
    }

    async fn load(
        &self,
        query: &EventQuery,
        cancel: &CancellationToken,
    ) -> DomainResult<Vec<EventRecord>> {
        if cancel.is_cancelled() {
            return Err(DomainError::Cancelled);
        }
        let state = self.lock()?;
        Ok(state
            .rows
            .iter()
            .filter(|row| query.matches(&row.record))
            .map(|row| row.record.clone())
            .collect())
    }

    async fn mark_published(&self, records: &[&EventRecord]) -> DomainResult<()> {
        self.set_published(records)
    }
}

#[async_trait]
impl EventOutbox for InMemoryEventStore {
    async fn fetch_unpublished(&self, limit: usize) -> DomainResult<Vec<EventRecord>> {
        let state = self.lock()?;
        Ok(state
            .rows
            .iter()
            .filter(|row| !row.published)
            .take(limit)
            .map(|row| row.record.clone())
            .collect())
    }

    async fn mark_published(&self, records: &[&EventRecord]) -> DomainResult<()> {
        self.set_published(records)
    }

    async fn mark_failed(&self, records: &[&EventRecord], reason: &str) -> DomainResult<()> {
        let mut state = self.lock()?;
        for record in records {
            if let Some(&i) = state.by_event_id.get(record.event_id()) {
                let row = &mut state.rows[i];
                row.attempts += 1;
                row.last_error = Some(reason.to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(aggregate_id: &str, version: i64) -> EventRecord {
        EventRecord::builder()
            .event_id(uuid::Uuid::new_v4().to_string())
            .occurred_on(Utc::now())
            .version(version)
            .aggregate_type("Person".to_string())
            .aggregate_id(aggregate_id.to_string())
            .event_type("PersonCreated".to_string())
            .event_data("{}".to_string())
            .build()
    }

    #[tokio::test]
    async fn append_assigns_increasing_sequences() {
        let store = InMemoryEventStore::new();
        let cancel = CancellationToken::new();

        let stored = store
            .append(vec![record("a", 1), record("a", 2)], &cancel)
            .await
            .unwrap();
        let more = store.append(vec![record("b", 1)], &cancel).await.unwrap();

        let seqs: Vec<_> = stored.iter().chain(&more).map(|r| r.sequence()).collect();
        assert_eq!(seqs, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(store.len().unwrap(), 3);
    }

    #[tokio::test]
    async fn conflicting_batch_writes_nothing() {
        let store = InMemoryEventStore::new();
        let cancel = CancellationToken::new();
        store.append(vec![record("a", 1)], &cancel).await.unwrap();

        let err = store
            .append(vec![record("a", 2), record("a", 1)], &cancel)
            .await
            .unwrap_err();
        match err {
            DomainError::VersionConflict {
                aggregate_id,
                version,
                ..
            } => {
                assert_eq!(aggregate_id, "a");
                assert_eq!(version, 1);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(store.len().unwrap(), 1);

        // 批内重复同样冲突
        let err = store
            .append(vec![record("b", 1), record("b", 1)], &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::VersionConflict { .. }));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_event_id_is_rejected() {
        let store = InMemoryEventStore::new();
        let cancel = CancellationToken::new();
        let first = record("a", 1);
        let replayed = EventRecord::builder()
            .event_id(first.event_id().to_string())
            .occurred_on(first.occurred_on())
            .version(2)
            .aggregate_type("Person".to_string())
            .aggregate_id("a".to_string())
            .event_type("PersonRenamed".to_string())
            .event_data("{}".to_string())
            .build();

        store.append(vec![first], &cancel).await.unwrap();
        let err = store.append(vec![replayed], &cancel).await.unwrap_err();
        assert!(matches!(err, DomainError::VersionConflict { .. }));
    }

    #[tokio::test]
    async fn cancelled_calls_do_nothing() {
        let store = InMemoryEventStore::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = store
            .append(vec![record("a", 1)], &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Cancelled));
        assert!(store.is_empty().unwrap());

        let err = store
            .load(&EventQuery::default(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Cancelled));
    }

    #[tokio::test]
    async fn load_filters_in_sequence_order() {
        let store = InMemoryEventStore::new();
        let cancel = CancellationToken::new();
        store
            .append(
                vec![
                    record("a", 1),
                    record("b", 1),
                    record("a", 2),
                    record("a", 3),
                ],
                &cancel,
            )
            .await
            .unwrap();

        let query = EventQuery::builder()
            .aggregate_type("Person")
            .aggregate_ids(vec!["a".to_string()])
            .max_version(2)
            .build();
        let loaded = store.load(&query, &cancel).await.unwrap();
        let versions: Vec<_> = loaded.iter().map(|r| r.version()).collect();
        assert_eq!(versions, vec![1, 2]);
        assert!(loaded.iter().all(|r| r.aggregate_id() == "a"));
    }

    #[tokio::test]
    async fn outbox_tracks_delivery() {
        let store = InMemoryEventStore::new();
        let cancel = CancellationToken::new();
        let stored = store
            .append(vec![record("a", 1), record("a", 2)], &cancel)
            .await
            .unwrap();
        assert_eq!(store.unpublished_count().unwrap(), 2);

        EventStore::mark_published(&store, &[&stored[0]]).await.unwrap();
        store.mark_failed(&[&stored[1]], "bus down").await.unwrap();

        let pending = store.fetch_unpublished(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].event_id(), stored[1].event_id());

        let status = store.delivery_status(stored[1].event_id()).unwrap().unwrap();
        assert_eq!(
            status,
            DeliveryStatus {
                published: false,
                attempts: 1,
                last_error: Some("bus down".to_string()),
            }
        );

        EventOutbox::mark_published(&store, &[&stored[1]]).await.unwrap();
        assert_eq!(store.unpublished_count().unwrap(), 0);
        assert!(store.fetch_unpublished(10).await.unwrap().is_empty());
    }
}
