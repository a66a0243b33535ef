//! 发件箱（EventOutbox）
//!
//! 事件先持久化再发布，发布失败的事件留在发件箱中，
//! 由 `OutboxRelay` 按位点顺序取出重新发布，并在成功或失败后回写状态。
//!
use crate::{error::DomainResult as Result, persist::EventRecord};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait EventOutbox: Send + Sync {
    /// 按位点顺序拉取尚未发布的记录，最多 `limit` 条
    async fn fetch_unpublished(&self, limit: usize) -> Result<Vec<EventRecord>>;

    /// 将记录标记为已发布
    async fn mark_published(&self, records: &[&EventRecord]) -> Result<()>;

    /// 记录一次发布失败（累计尝试次数与最近一次错误）
    async fn mark_failed(&self, records: &[&EventRecord], reason: &str) -> Result<()>;
}

#[async_trait]
impl<T> EventOutbox for Arc<T>
where
    T: EventOutbox + ?Sized,
{
    async fn fetch_unpublished(&self, limit: usize) -> Result<Vec<EventRecord>> {
        (**self).fetch_unpublished(limit).await
    }

    async fn mark_published(&self, records: &[&EventRecord]) -> Result<()> {
        (**self).mark_published(records).await
    }

    async fn mark_failed(&self, records: &[&EventRecord], reason: &str) -> Result<()> {
        (**self).mark_failed(records, reason).await
    }
}
