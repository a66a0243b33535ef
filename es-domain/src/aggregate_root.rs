//! 聚合根基础状态（AggregateRoot）
//!
//! 每个聚合通过 `#[entity]` 注入一个 `root` 字段，保存与业务无关的公共状态：
//! 标识、版本、软删除标记、创建/更新审计信息以及尚未持久化的事件。
//! 所有事件（新产生的与重放的）都先经过 [`AggregateRoot::advance`] 的校验，
//! 校验失败时状态保持不变。
//!
use chrono::{DateTime, Utc};

use crate::domain_event::{EventEnvelope, Metadata};
use crate::error::{DomainError, DomainResult};
use crate::identity::{ActorId, AggregateId};
use crate::value_object::{DeleteAction, Version};

#[derive(Debug, Clone)]
pub struct AggregateRoot<E> {
    id: AggregateId,
    version: Version,
    is_deleted: bool,
    created_by: Option<ActorId>,
    created_on: Option<DateTime<Utc>>,
    updated_by: Option<ActorId>,
    updated_on: Option<DateTime<Utc>>,
    changes: Vec<EventEnvelope<E>>,
}

impl<E> AggregateRoot<E> {
    pub fn new(id: AggregateId) -> Self {
        Self {
            id,
            version: Version::new(),
            is_deleted: false,
            created_by: None,
            created_on: None,
            updated_by: None,
            updated_on: None,
            changes: Vec::new(),
        }
    }

    pub fn id(&self) -> &AggregateId {
        &self.id
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    /// 第一个事件的触发者
    pub fn created_by(&self) -> Option<&ActorId> {
        self.created_by.as_ref()
    }

    pub fn created_on(&self) -> Option<&DateTime<Utc>> {
        self.created_on.as_ref()
    }

    /// 最近一个事件的触发者
    pub fn updated_by(&self) -> Option<&ActorId> {
        self.updated_by.as_ref()
    }

    pub fn updated_on(&self) -> Option<&DateTime<Utc>> {
        self.updated_on.as_ref()
    }

    /// 尚未持久化的事件，按产生顺序
    pub fn changes(&self) -> &[EventEnvelope<E>] {
        &self.changes
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// 清空待提交事件，版本与删除状态不变
    pub fn clear_changes(&mut self) {
        self.changes.clear();
    }

    /// 校验并推进状态：标识一致、版本递增，随后更新删除标记与审计信息
    pub(crate) fn advance(&mut self, metadata: &Metadata) -> DomainResult<()> {
        if metadata.aggregate_id() != &self.id {
            return Err(DomainError::AggregateMismatch {
                aggregate_id: self.id.to_string(),
                event_aggregate_id: metadata.aggregate_id().to_string(),
                event_id: metadata.event_id().to_string(),
            });
        }

        if metadata.version() <= self.version {
            return Err(DomainError::PastEvent {
                aggregate_id: self.id.to_string(),
                aggregate_version: self.version.value(),
                event_id: metadata.event_id().to_string(),
                event_version: metadata.version().value(),
            });
        }

        self.version = metadata.version();

        match metadata.delete_action() {
            DeleteAction::Delete => self.is_deleted = true,
            DeleteAction::Undelete => self.is_deleted = false,
            DeleteAction::None => {}
        }

        if self.created_on.is_none() {
            self.created_by = metadata.actor_id().cloned();
            self.created_on = Some(*metadata.occurred_on());
        }
        self.updated_by = metadata.actor_id().cloned();
        self.updated_on = Some(*metadata.occurred_on());

        Ok(())
    }

    pub(crate) fn record(&mut self, envelope: EventEnvelope<E>) {
        self.changes.push(envelope);
    }
}
