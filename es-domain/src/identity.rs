//! 标识类型
//!
//! - `AggregateId`：不透明的字符串标识，客户端指定或随机生成
//! - `EventId`：事件信封创建时分配的 UUID，作为持久化记录的幂等键
//! - `ActorId`：触发事件的操作者
//!
use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;
use es_macros::entity_id;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// 标识与操作者字段在存储中的最大长度
pub const MAX_ID_LENGTH: usize = 255;

/// 聚合标识
///
/// 构造时校验：不能为空白，长度不超过 [`MAX_ID_LENGTH`]。
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AggregateId(String);

impl AggregateId {
    pub fn new(value: impl Into<String>) -> DomainResult<Self> {
        let id = Self(value.into());
        id.validate()?;
        Ok(id)
    }

    /// 随机生成（不可猜测）
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for AggregateId {
    type Error = DomainError;

    fn validate(&self) -> Result<(), Self::Error> {
        if self.0.trim().is_empty() {
            return Err(DomainError::InvalidAggregateId(
                "aggregate id must not be empty".to_string(),
            ));
        }
        if self.0.chars().count() > MAX_ID_LENGTH {
            return Err(DomainError::InvalidAggregateId(format!(
                "aggregate id exceeds {MAX_ID_LENGTH} characters"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for AggregateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AggregateId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for AggregateId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AggregateId> for String {
    fn from(value: AggregateId) -> Self {
        value.0
    }
}

impl AsRef<str> for AggregateId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// 事件标识
#[entity_id]
pub struct EventId(Uuid);

impl EventId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

/// 操作者标识
#[entity_id]
pub struct ActorId(String);

impl From<&str> for ActorId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl ActorId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_id_rejects_blank_and_oversized_values() {
        assert!(matches!(
            AggregateId::new(""),
            Err(DomainError::InvalidAggregateId(_))
        ));
        assert!(matches!(
            AggregateId::new("   "),
            Err(DomainError::InvalidAggregateId(_))
        ));
        assert!(matches!(
            AggregateId::new("x".repeat(MAX_ID_LENGTH + 1)),
            Err(DomainError::InvalidAggregateId(_))
        ));
        assert!(AggregateId::new("x".repeat(MAX_ID_LENGTH)).is_ok());
    }

    #[test]
    fn aggregate_id_value_equality() {
        let a = AggregateId::new("person-1").unwrap();
        let b: AggregateId = "person-1".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "person-1");
        assert_ne!(AggregateId::generate(), AggregateId::generate());
    }

    // 反序列化同样经过校验
    #[test]
    fn aggregate_id_serde_validates() {
        let id: AggregateId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(id.as_str(), "abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
        assert!(serde_json::from_str::<AggregateId>("\"\"").is_err());
    }

    #[test]
    fn event_and_actor_ids() {
        let e1 = EventId::generate();
        let e2: EventId = e1.to_string().parse().unwrap();
        assert_eq!(e1, e2);
        assert_ne!(e1, EventId::generate());

        let actor = ActorId::from("fpion");
        assert_eq!(actor.as_str(), "fpion");
        assert_eq!(String::from(actor), "fpion");
    }
}
