//! 事件溯源聚合引擎（es-domain）
//!
//! 所有写操作都是不可变、有序、仅追加的事件，聚合当前状态即事件历史的折叠结果。
//! 本 crate 提供：
//! - 聚合状态机（`aggregate`、`aggregate_root`、`entity`）：版本单调递增、标识校验、软删除
//! - 事件信封（`domain_event`）：元数据 + 领域事件或引擎内置的删除/恢复事件
//! - 多态事件编解码（`event_codec`、`event_converter`）：封闭的事件类型注册表
//! - 持久化契约与仓储编排（`persist`）：加载/重建、追加/发布、内存事件存储
//! - 事件系统（`eventing`）：总线、发件箱与补发中继
//!
//! 本 crate 与具体存储和传输解耦，只定义接口与内存实现，
//! 便于在不同基础设施（例如关系型数据库、消息中间件等）上进行适配。
//!
//! 典型用法：
//! 1. 使用 `#[domain_event]` 定义事件枚举，使用 `#[entity]` 定义聚合并实现 `Aggregate::apply`；
//! 2. 启动时构建 `EventCodec` 并注册所有事件族，随后以 `Arc` 共享；
//! 3. 通过 `EventSourcedRepository` 加载、修改并保存聚合；
//! 4. 使用 `OutboxRelay` 补发发布失败的事件。
//!
pub mod aggregate;
pub mod aggregate_root;
pub mod domain_event;
pub mod entity;
pub mod error;
pub mod event_codec;
pub mod event_converter;
pub mod eventing;
pub mod identity;
pub mod persist;
pub mod value_object;

// 允许在本 crate 内部通过 ::es_domain 进行自引用，
// 以便过程宏在本 crate 的单元测试中也能解析到 ::es_domain 路径。
extern crate self as es_domain;
