use super::domain_event_trait::DomainEvent;
use super::metadata::Metadata;

/// 引擎内置：聚合被逻辑删除
pub const AGGREGATE_DELETED: &str = "AggregateDeleted";
/// 引擎内置：聚合被恢复
pub const AGGREGATE_UNDELETED: &str = "AggregateUndeleted";

/// 信封载荷：聚合事件族中的领域事件，或引擎内置的删除/恢复事件
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload<E> {
    Event(E),
    Deleted,
    Undeleted,
}

impl<E: DomainEvent> EventPayload<E> {
    pub fn event_type(&self) -> &'static str {
        match self {
            EventPayload::Event(e) => e.event_type(),
            EventPayload::Deleted => AGGREGATE_DELETED,
            EventPayload::Undeleted => AGGREGATE_UNDELETED,
        }
    }

    pub fn as_event(&self) -> Option<&E> {
        match self {
            EventPayload::Event(e) => Some(e),
            _ => None,
        }
    }
}

impl<E> From<E> for EventPayload<E> {
    fn from(value: E) -> Self {
        EventPayload::Event(value)
    }
}

/// 事件信封，创建后不可变
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope<E> {
    metadata: Metadata,
    payload: EventPayload<E>,
}

impl<E: DomainEvent> EventEnvelope<E> {
    pub fn new(metadata: Metadata, payload: impl Into<EventPayload<E>>) -> Self {
        Self {
            metadata,
            payload: payload.into(),
        }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn payload(&self) -> &EventPayload<E> {
        &self.payload
    }

    pub fn event_type(&self) -> &'static str {
        self.payload.event_type()
    }

    pub fn into_parts(self) -> (Metadata, EventPayload<E>) {
        (self.metadata, self.payload)
    }
}
