//! 事件存储协议（EventStore）
//!
//! 仅追加的事件记录集合，按聚合类型与标识分区。
//! 追加是原子的：任一记录冲突（重复 EventId 或重复的 (类型, 标识, 版本)）
//! 时整批拒绝并返回 `VersionConflict`，不写入任何内容。
//!
use async_trait::async_trait;
use bon::Builder;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::DomainResult;
use crate::persist::EventRecord;

#[async_trait]
pub trait EventStore: Send + Sync {
    /// 原子追加一批记录，返回带位点的已存储记录（顺序与输入一致）
    async fn append(
        &self,
        records: Vec<EventRecord>,
        cancel: &CancellationToken,
    ) -> DomainResult<Vec<EventRecord>>;

    /// 按位点顺序返回满足条件的记录
    async fn load(
        &self,
        query: &EventQuery,
        cancel: &CancellationToken,
    ) -> DomainResult<Vec<EventRecord>>;

    /// 发件箱确认：记录已成功发布到总线
    async fn mark_published(&self, records: &[&EventRecord]) -> DomainResult<()> {
        let _ = records;
        Ok(())
    }
}

#[async_trait]
impl<T> EventStore for Arc<T>
where
    T: EventStore + ?Sized,
{
    async fn append(
        &self,
        records: Vec<EventRecord>,
        cancel: &CancellationToken,
    ) -> DomainResult<Vec<EventRecord>> {
        (**self).append(records, cancel).await
    }

    async fn load(
        &self,
        query: &EventQuery,
        cancel: &CancellationToken,
    ) -> DomainResult<Vec<EventRecord>> {
        (**self).load(query, cancel).await
    }

    async fn mark_published(&self, records: &[&EventRecord]) -> DomainResult<()> {
        (**self).mark_published(records).await
    }
}

/// 事件查询条件，各条件之间为“与”关系，空条件匹配全部记录
///
/// 条件对应存储中的索引列：聚合类型、聚合标识、版本、操作者、事件类型、发生时间。
#[derive(Builder, Debug, Clone, Default, PartialEq)]
pub struct EventQuery {
    #[builder(into)]
    aggregate_type: Option<String>,
    /// 为空表示不限标识
    #[builder(default)]
    aggregate_ids: Vec<String>,
    /// 只返回版本不超过该值的记录（“截至某版本”）
    max_version: Option<i64>,
    #[builder(into)]
    actor_id: Option<String>,
    #[builder(default)]
    event_types: Vec<String>,
    occurred_from: Option<DateTime<Utc>>,
    /// 包含边界
    occurred_until: Option<DateTime<Utc>>,
}

impl EventQuery {
    pub fn aggregate_type(&self) -> Option<&str> {
        self.aggregate_type.as_deref()
    }

    pub fn aggregate_ids(&self) -> &[String] {
        &self.aggregate_ids
    }

    pub fn max_version(&self) -> Option<i64> {
        self.max_version
    }

    pub fn actor_id(&self) -> Option<&str> {
        self.actor_id.as_deref()
    }

    pub fn event_types(&self) -> &[String] {
        &self.event_types
    }

    pub fn occurred_from(&self) -> Option<DateTime<Utc>> {
        self.occurred_from
    }

    pub fn occurred_until(&self) -> Option<DateTime<Utc>> {
        self.occurred_until
    }

    /// 记录是否满足全部条件
    pub fn matches(&self, record: &EventRecord) -> bool {
        self.aggregate_type
            .as_deref()
            .is_none_or(|t| t == record.aggregate_type())
            && (self.aggregate_ids.is_empty()
                || self
                    .aggregate_ids
                    .iter()
                    .any(|id| id == record.aggregate_id()))
            && self.max_version.is_none_or(|v| record.version() <= v)
            && self
                .actor_id
                .as_deref()
                .is_none_or(|a| record.actor_id() == Some(a))
            && (self.event_types.is_empty()
                || self.event_types.iter().any(|t| t == record.event_type()))
            && self
                .occurred_from
                .is_none_or(|from| record.occurred_on() >= from)
            && self
                .occurred_until
                .is_none_or(|until| record.occurred_on() <= until)
    }
}
