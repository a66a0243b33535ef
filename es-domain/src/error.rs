//! 领域层统一错误定义
//!
//! 覆盖聚合状态机、事件编解码、事件存储与总线的最小必要集合，
//! 便于在各实现层统一转换为 `DomainError`。
//!
use thiserror::Error;

/// 统一错误类型
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DomainError {
    // --- 序列化 ---
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },

    // --- 聚合状态机 ---
    #[error(
        "past event: aggregate={aggregate_id} is at version {aggregate_version}, event={event_id} has version {event_version}"
    )]
    PastEvent {
        aggregate_id: String,
        aggregate_version: i64,
        event_id: String,
        event_version: i64,
    },
    #[error(
        "aggregate mismatch: aggregate={aggregate_id}, event={event_id} belongs to {event_aggregate_id}"
    )]
    AggregateMismatch {
        aggregate_id: String,
        event_aggregate_id: String,
        event_id: String,
    },
    #[error("missing constructor: aggregate type {aggregate_type} cannot be built from an id")]
    MissingConstructor { aggregate_type: String },

    // --- 事件编解码 ---
    #[error("event type not found: {event_type}")]
    EventTypeNotFound { event_type: String },
    #[error("event data deserialization failed: type={event_type}, reason={reason}")]
    EventDataDeserializationFailed { event_type: String, reason: String },
    #[error("event data serialization failed: type={event_type}, reason={reason}")]
    EventDataSerializationFailed { event_type: String, reason: String },
    #[error("duplicate event type: {event_type}")]
    DuplicateEventType { event_type: String },
    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch { expected: String, found: String },

    // --- 存储/发布 ---
    #[error("version conflict: {aggregate_type}/{aggregate_id} already has version {version}")]
    VersionConflict {
        aggregate_type: String,
        aggregate_id: String,
        version: i64,
    },
    #[error(
        "publish failed: {aggregate_type}/{aggregate_id}, {unpublished} event(s) left in outbox: {reason}"
    )]
    PublishFailed {
        aggregate_type: String,
        aggregate_id: String,
        unpublished: usize,
        reason: String,
    },
    #[error("operation cancelled")]
    Cancelled,
    #[error("event store error: {reason}")]
    EventStore { reason: String },
    #[error("event bus error: {reason}")]
    EventBus { reason: String },

    // --- 通用 ---
    #[error("invalid aggregate id: {0}")]
    InvalidAggregateId(String),
    #[error("invalid value: {reason}")]
    InvalidValue { reason: String },
}

/// 统一 Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;
