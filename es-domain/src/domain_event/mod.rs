//! 领域事件（Domain Event）与事件信封
//!
//! 定义事件载荷需要实现的最小接口（`DomainEvent`），以及将事件与元数据
//! 封装后的 `EventEnvelope`。信封载荷既可以是聚合自身的领域事件，
//! 也可以是引擎内置的 `AggregateDeleted` / `AggregateUndeleted`。

mod domain_event_trait;
mod event_envelope;
mod metadata;

pub use domain_event_trait::DomainEvent;
pub use event_envelope::{AGGREGATE_DELETED, AGGREGATE_UNDELETED, EventEnvelope, EventPayload};
pub use metadata::Metadata;
