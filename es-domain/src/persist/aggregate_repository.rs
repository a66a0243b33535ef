//! 聚合仓储（AggregateRepository）
//!
//! 读路径：从事件存储取出一个或多个聚合的有序事件流，解码后按
//! (聚合类型, 聚合标识) 分组重建，重建完成后再按删除状态过滤。
//!
//! 写路径：把聚合的待提交事件编码后一次性原子追加，落盘后清空待提交列表，
//! 再按顺序逐条发布到总线并在发件箱中确认。发布失败时返回 `PublishFailed`，
//! 未发布的事件留在发件箱中由 `OutboxRelay` 补发。
//!
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bon::Builder;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::aggregate::Aggregate;
use crate::error::{DomainError, DomainResult};
use crate::event_codec::EventCodec;
use crate::eventing::EventBus;
use crate::identity::AggregateId;
use crate::persist::{EventQuery, EventRecord, EventStore};
use crate::value_object::Version;

/// 单个聚合的加载选项
#[derive(Builder, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// 只重建到该版本（含）
    version: Option<Version>,
    /// 是否返回已逻辑删除的聚合
    #[builder(default)]
    include_deleted: bool,
}

impl LoadOptions {
    pub fn version(&self) -> Option<Version> {
        self.version
    }

    pub fn include_deleted(&self) -> bool {
        self.include_deleted
    }
}

#[async_trait]
pub trait AggregateRepository: Send + Sync {
    /// 加载单个聚合；无事件或已删除（且未要求包含）时返回 `None`
    async fn load<A: Aggregate>(
        &self,
        id: &AggregateId,
        options: LoadOptions,
        cancel: &CancellationToken,
    ) -> DomainResult<Option<A>>;

    async fn load_many<A: Aggregate>(
        &self,
        ids: &[AggregateId],
        include_deleted: bool,
        cancel: &CancellationToken,
    ) -> DomainResult<Vec<A>>;

    /// 加载该类型的全部聚合
    async fn load_all<A: Aggregate>(
        &self,
        include_deleted: bool,
        cancel: &CancellationToken,
    ) -> DomainResult<Vec<A>>;

    /// 加载至少有一个事件满足 `query` 的聚合（重建时使用完整事件流）
    async fn load_where<A: Aggregate>(
        &self,
        query: &EventQuery,
        include_deleted: bool,
        cancel: &CancellationToken,
    ) -> DomainResult<Vec<A>>;

    /// 保存聚合的待提交事件；没有待提交事件时不做任何事
    async fn save<A: Aggregate>(
        &self,
        aggregate: &mut A,
        cancel: &CancellationToken,
    ) -> DomainResult<()>;

    /// 依次保存，遇到第一个错误即返回（此前已保存的聚合不回滚）
    async fn save_all<A: Aggregate>(
        &self,
        aggregates: &mut [A],
        cancel: &CancellationToken,
    ) -> DomainResult<()>;
}

#[async_trait]
impl<T> AggregateRepository for Arc<T>
where
    T: AggregateRepository + ?Sized,
{
    async fn load<A: Aggregate>(
        &self,
        id: &AggregateId,
        options: LoadOptions,
        cancel: &CancellationToken,
    ) -> DomainResult<Option<A>> {
        (**self).load::<A>(id, options, cancel).await
    }

    async fn load_many<A: Aggregate>(
        &self,
        ids: &[AggregateId],
        include_deleted: bool,
        cancel: &CancellationToken,
    ) -> DomainResult<Vec<A>> {
        (**self).load_many::<A>(ids, include_deleted, cancel).await
    }

    async fn load_all<A: Aggregate>(
        &self,
        include_deleted: bool,
        cancel: &CancellationToken,
    ) -> DomainResult<Vec<A>> {
        (**self).load_all::<A>(include_deleted, cancel).await
    }

    async fn load_where<A: Aggregate>(
        &self,
        query: &EventQuery,
        include_deleted: bool,
        cancel: &CancellationToken,
    ) -> DomainResult<Vec<A>> {
        (**self)
            .load_where::<A>(query, include_deleted, cancel)
            .await
    }

    async fn save<A: Aggregate>(
        &self,
        aggregate: &mut A,
        cancel: &CancellationToken,
    ) -> DomainResult<()> {
        (**self).save::<A>(aggregate, cancel).await
    }

    async fn save_all<A: Aggregate>(
        &self,
        aggregates: &mut [A],
        cancel: &CancellationToken,
    ) -> DomainResult<()> {
        (**self).save_all::<A>(aggregates, cancel).await
    }
}

/// 基于事件存储 + 事件总线的通用聚合仓储实现
pub struct EventSourcedRepository<S: ?Sized, B: ?Sized> {
    store: Arc<S>,
    bus: Arc<B>,
    codec: Arc<EventCodec>,
}

impl<S, B> EventSourcedRepository<S, B>
where
    S: EventStore + ?Sized,
    B: EventBus + ?Sized,
{
    pub fn new(store: Arc<S>, bus: Arc<B>, codec: Arc<EventCodec>) -> Self {
        Self { store, bus, codec }
    }

    pub fn codec(&self) -> &Arc<EventCodec> {
        &self.codec
    }

    /// 分组、解码、重建并过滤已删除的聚合
    ///
    /// 组的顺序为各聚合第一条记录出现的顺序，组内保持存储顺序。
    pub fn rebuild<A: Aggregate>(
        &self,
        records: Vec<EventRecord>,
        include_deleted: bool,
    ) -> DomainResult<Vec<A>> {
        let mut index: HashMap<(String, String), usize> = HashMap::new();
        let mut groups: Vec<Vec<EventRecord>> = Vec::new();

        for record in records {
            let key = (
                record.aggregate_type().to_string(),
                record.aggregate_id().to_string(),
            );
            let slot = *index.entry(key).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(record);
        }

        let mut aggregates = Vec::with_capacity(groups.len());
        for group in groups {
            let Some(first) = group.first() else { continue };
            let id = AggregateId::new(first.aggregate_id())?;
            let envelopes = self.codec.deserialize_all::<A::Event>(&group)?;
            let aggregate = A::load_from_changes(id, envelopes)?;
            if include_deleted || !aggregate.is_deleted() {
                aggregates.push(aggregate);
            }
        }

        Ok(aggregates)
    }

    async fn load_records(
        &self,
        query: EventQuery,
        cancel: &CancellationToken,
    ) -> DomainResult<Vec<EventRecord>> {
        self.store.load(&query, cancel).await
    }

    /// 按顺序发布已落盘的记录，逐条等待并在发件箱确认
    #[instrument(level = "debug", skip(self, stored, cancel), fields(count = stored.len()))]
    async fn publish_committed(
        &self,
        aggregate_type: &str,
        aggregate_id: &AggregateId,
        stored: &[EventRecord],
        cancel: &CancellationToken,
    ) -> DomainResult<()> {
        for (i, record) in stored.iter().enumerate() {
            if let Err(err) = self.bus.publish(record, cancel).await {
                let unpublished = stored.len() - i;
                warn!(
                    %aggregate_id,
                    event_id = record.event_id(),
                    unpublished,
                    error = %err,
                    "publish failed; events left in outbox"
                );
                return Err(DomainError::PublishFailed {
                    aggregate_type: aggregate_type.to_string(),
                    aggregate_id: aggregate_id.to_string(),
                    unpublished,
                    reason: err.to_string(),
                });
            }

            // 已发布但确认失败时，中继会重复发布（至少一次）
            if let Err(err) = self.store.mark_published(&[record]).await {
                warn!(
                    event_id = record.event_id(),
                    error = %err,
                    "outbox acknowledgement failed"
                );
            }
        }
        Ok(())
    }
}

impl<S: ?Sized, B: ?Sized> Clone for EventSourcedRepository<S, B> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            bus: Arc::clone(&self.bus),
            codec: Arc::clone(&self.codec),
        }
    }
}

#[async_trait]
impl<S, B> AggregateRepository for EventSourcedRepository<S, B>
where
    S: EventStore + ?Sized,
    B: EventBus + ?Sized,
{
    async fn load<A: Aggregate>(
        &self,
        id: &AggregateId,
        options: LoadOptions,
        cancel: &CancellationToken,
    ) -> DomainResult<Option<A>> {
        let query = EventQuery::builder()
            .aggregate_type(A::TYPE)
            .aggregate_ids(vec![id.to_string()])
            .maybe_max_version(options.version().map(|v| v.value()))
            .build();
        let records = self.load_records(query, cancel).await?;
        if records.is_empty() {
            return Ok(None);
        }

        let mut aggregates = self.rebuild::<A>(records, options.include_deleted())?;
        Ok(aggregates.pop())
    }

    async fn load_many<A: Aggregate>(
        &self,
        ids: &[AggregateId],
        include_deleted: bool,
        cancel: &CancellationToken,
    ) -> DomainResult<Vec<A>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = EventQuery::builder()
            .aggregate_type(A::TYPE)
            .aggregate_ids(ids.iter().map(|id| id.to_string()).collect())
            .build();
        let records = self.load_records(query, cancel).await?;
        self.rebuild::<A>(records, include_deleted)
    }

    async fn load_all<A: Aggregate>(
        &self,
        include_deleted: bool,
        cancel: &CancellationToken,
    ) -> DomainResult<Vec<A>> {
        let query = EventQuery::builder().aggregate_type(A::TYPE).build();
        let records = self.load_records(query, cancel).await?;
        self.rebuild::<A>(records, include_deleted)
    }

    async fn load_where<A: Aggregate>(
        &self,
        query: &EventQuery,
        include_deleted: bool,
        cancel: &CancellationToken,
    ) -> DomainResult<Vec<A>> {
        // 第一步：找出命中的聚合标识（保持首次出现顺序）
        let matched = self.store.load(query, cancel).await?;
        let mut ids: Vec<String> = Vec::new();
        for record in matched.iter().filter(|r| r.aggregate_type() == A::TYPE) {
            if !ids.iter().any(|id| id == record.aggregate_id()) {
                ids.push(record.aggregate_id().to_string());
            }
        }
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // 第二步：加载完整事件流
        let full = EventQuery::builder()
            .aggregate_type(A::TYPE)
            .aggregate_ids(ids)
            .build();
        let records = self.load_records(full, cancel).await?;
        self.rebuild::<A>(records, include_deleted)
    }

    async fn save<A: Aggregate>(
        &self,
        aggregate: &mut A,
        cancel: &CancellationToken,
    ) -> DomainResult<()> {
        if !aggregate.has_changes() {
            return Ok(());
        }
        if cancel.is_cancelled() {
            return Err(DomainError::Cancelled);
        }

        let records = aggregate
            .changes()
            .iter()
            .map(|envelope| self.codec.to_record::<A>(envelope))
            .collect::<DomainResult<Vec<_>>>()?;

        // 追加失败时待提交事件保持不变，调用方可重新加载后重试
        let stored = self.store.append(records, cancel).await?;
        aggregate.clear_changes();
        debug!(
            aggregate_type = A::TYPE,
            aggregate_id = %aggregate.id(),
            version = %aggregate.version(),
            count = stored.len(),
            "aggregate saved"
        );

        self.publish_committed(A::TYPE, aggregate.id(), &stored, cancel)
            .await
    }

    async fn save_all<A: Aggregate>(
        &self,
        aggregates: &mut [A],
        cancel: &CancellationToken,
    ) -> DomainResult<()> {
        for aggregate in aggregates.iter_mut() {
            self.save(aggregate, cancel).await?;
        }
        Ok(())
    }
}
