//! 持久化（persist）
//!
//! - `EventRecord`：事件的持久化形态；
//! - `EventStore` / `EventQuery`：仅追加的事件存储协议与查询条件；
//! - `InMemoryEventStore`：线程安全的内存实现（同时实现发件箱协议）；
//! - `AggregateRepository` / `EventSourcedRepository`：加载与保存聚合的编排逻辑；
//! - `schema`：关系型后端的参考表结构。
//!
//! 具体存储后端（如 Postgres）由上层实现 `EventStore` 后注入仓储。
//!
mod aggregate_repository;
mod event_record;
mod event_store;
mod event_store_inmemory;
pub mod schema;

pub use aggregate_repository::{AggregateRepository, EventSourcedRepository, LoadOptions};
pub use event_record::EventRecord;
pub use event_store::{EventQuery, EventStore};
pub use event_store_inmemory::{DeliveryStatus, InMemoryEventStore};
