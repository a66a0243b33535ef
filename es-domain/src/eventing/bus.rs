//! 事件总线（EventBus）协议
//!
//! 已持久化的事件记录按顺序逐条发布，供下游投影订阅。
//! 投递语义为“至少一次”，订阅方需按 EventId 幂等处理。
//!
use crate::{error::DomainResult as Result, persist::EventRecord};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// 事件总线：负责分发已提交的事件
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, event: &EventRecord, cancel: &CancellationToken) -> Result<()>;
}

#[async_trait]
impl<T> EventBus for Arc<T>
where
    T: EventBus + ?Sized,
{
    async fn publish(&self, event: &EventRecord, cancel: &CancellationToken) -> Result<()> {
        (**self).publish(event, cancel).await
    }
}
