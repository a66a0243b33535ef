//! 聚合（Aggregate）抽象
//!
//! 聚合状态只能通过事件改变：
//! - 领域方法调用 `raise` / `apply_change` 生成事件信封，先自我应用再加入待提交列表；
//! - 重建时 `load_from_changes` 按给定顺序逐个 `dispatch` 历史事件；
//! - 两条路径共用同一个校验门（标识一致、版本递增），失败时状态不变。
//!
use std::borrow::Borrow;

use bon::Builder;
use chrono::{DateTime, Utc};

use crate::domain_event::{EventEnvelope, EventPayload, Metadata};
use crate::entity::Entity;
use crate::error::DomainResult;
use crate::identity::{ActorId, AggregateId};
use crate::value_object::{DeleteAction, Version};

/// 生成事件时可选的元数据覆盖
#[derive(Builder, Debug, Clone, Default)]
pub struct ChangeOptions {
    actor_id: Option<ActorId>,
    /// 默认为当前时间
    occurred_on: Option<DateTime<Utc>>,
    /// 默认由载荷决定：删除/恢复事件分别为 Delete/Undelete，其余为 None
    delete_action: Option<DeleteAction>,
}

/// 聚合接口
pub trait Aggregate: Entity {
    /// 将领域事件投影到业务状态
    ///
    /// 版本、删除标记等公共状态已由引擎更新；不关心的变体可直接忽略。
    fn apply(&mut self, event: &Self::Event, metadata: &Metadata);

    fn id(&self) -> &AggregateId {
        self.root().id()
    }

    fn version(&self) -> Version {
        self.root().version()
    }

    fn is_deleted(&self) -> bool {
        self.root().is_deleted()
    }

    fn changes(&self) -> &[EventEnvelope<Self::Event>] {
        self.root().changes()
    }

    fn has_changes(&self) -> bool {
        self.root().has_changes()
    }

    fn clear_changes(&mut self) {
        self.root_mut().clear_changes();
    }

    /// 产生一个领域事件
    fn raise(&mut self, event: Self::Event, actor_id: Option<ActorId>) -> DomainResult<()> {
        self.apply_change(
            EventPayload::Event(event),
            ChangeOptions::builder().maybe_actor_id(actor_id).build(),
        )
    }

    /// 以下一个版本号生成信封、自我应用并加入待提交列表
    fn apply_change(
        &mut self,
        payload: EventPayload<Self::Event>,
        options: ChangeOptions,
    ) -> DomainResult<()> {
        let delete_action = options.delete_action.unwrap_or(match &payload {
            EventPayload::Event(_) => DeleteAction::None,
            EventPayload::Deleted => DeleteAction::Delete,
            EventPayload::Undeleted => DeleteAction::Undelete,
        });

        let metadata = Metadata::builder()
            .aggregate_id(self.id().clone())
            .version(self.version().next()?)
            .maybe_actor_id(options.actor_id)
            .maybe_occurred_on(options.occurred_on)
            .delete_action(delete_action)
            .build();

        let envelope = EventEnvelope::new(metadata, payload);
        self.dispatch(&envelope)?;
        self.root_mut().record(envelope);
        Ok(())
    }

    /// 应用一个事件（新产生或重放）
    fn dispatch(&mut self, envelope: &EventEnvelope<Self::Event>) -> DomainResult<()> {
        self.root_mut().advance(envelope.metadata())?;
        if let EventPayload::Event(event) = envelope.payload() {
            self.apply(event, envelope.metadata());
        }
        Ok(())
    }

    /// 逻辑删除；即使已删除也会产生事件
    fn delete(&mut self, actor_id: Option<ActorId>) -> DomainResult<()> {
        self.apply_change(
            EventPayload::Deleted,
            ChangeOptions::builder().maybe_actor_id(actor_id).build(),
        )
    }

    fn undelete(&mut self, actor_id: Option<ActorId>) -> DomainResult<()> {
        self.apply_change(
            EventPayload::Undeleted,
            ChangeOptions::builder().maybe_actor_id(actor_id).build(),
        )
    }

    /// 构造空聚合并按给定顺序应用历史事件（不排序）
    fn load_from_changes<I>(id: AggregateId, events: I) -> DomainResult<Self>
    where
        I: IntoIterator,
        I::Item: Borrow<EventEnvelope<Self::Event>>,
    {
        let mut aggregate = Self::construct(id)?;
        for event in events {
            aggregate.dispatch(event.borrow())?;
        }
        Ok(aggregate)
    }
}

/// 跨类型比较：类型名与标识都相同才视为同一聚合
pub fn same_aggregate<A: Aggregate, B: Aggregate>(a: &A, b: &B) -> bool {
    A::TYPE == B::TYPE && a.id() == b.id()
}
