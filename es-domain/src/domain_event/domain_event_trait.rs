use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

/// 领域事件载荷需要满足的通用能力边界
///
/// 一个聚合的全部事件组成一个事件族（通常为一个枚举），
/// 每个变体有唯一的判别名，用于持久化时的多态编解码。
pub trait DomainEvent:
    Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// 事件族包含的全部判别名
    const EVENT_TYPES: &'static [&'static str];

    /// 事件类型（形如 `PersonEvent.Created` 或自定义类型名）
    fn event_type(&self) -> &'static str;
}
