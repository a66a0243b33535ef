//! 实体（Entity）基础抽象
//!
//! 为聚合提供统一的类型名、事件族与基础状态（`AggregateRoot`）访问能力。
//! 通常由 `#[entity]` 宏生成实现。
//!
use crate::aggregate_root::AggregateRoot;
use crate::domain_event::DomainEvent;
use crate::error::{DomainError, DomainResult};
use crate::identity::AggregateId;

/// 具备唯一标识与版本的实体抽象
pub trait Entity: Send + Sync + Sized + 'static {
    /// 聚合类型名，写入持久化记录的 AggregateType 列
    const TYPE: &'static str;

    /// 该聚合的事件族
    type Event: DomainEvent;

    fn root(&self) -> &AggregateRoot<Self::Event>;

    fn root_mut(&mut self) -> &mut AggregateRoot<Self::Event>;

    /// 仅凭标识构造空聚合（版本 0），重建历史时使用
    ///
    /// 默认实现返回 `MissingConstructor`；`#[entity]` 默认会生成该构造函数。
    fn construct(id: AggregateId) -> DomainResult<Self> {
        let _ = id;
        Err(DomainError::MissingConstructor {
            aggregate_type: Self::TYPE.to_string(),
        })
    }
}
