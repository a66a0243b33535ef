//! 值对象（Value Object）
//!
//! 无标识、以值相等为准的对象，用于封装不可变的概念性值与校验逻辑。
//!

use std::fmt;

use crate::error::{DomainError, DomainResult};

use es_macros::value_object;

/// 值对象抽象
pub trait ValueObject {
    /// 业务校验失败时的错误类型
    type Error;

    /// 创建值对象时进行验证
    fn validate(&self) -> Result<(), Self::Error>;
}

/// 聚合版本号
///
/// 新建聚合为 0，每应用一个事件加 1；事件信封中的版本即该事件应用后聚合所处的版本。
///
/// # 示例
///
/// ```
/// use es_domain::value_object::Version;
///
/// let v1 = Version::new();
/// assert_eq!(v1.value(), 0);
/// assert!(v1.is_new());
///
/// let v2 = v1.next().unwrap();
/// assert_eq!(v2.value(), 1);
/// assert!(v2 > v1);
/// ```
#[value_object(copy = true, ord = true)]
pub struct Version(i64);

impl Version {
    /// 创建初始版本（版本号为 0）
    pub const fn new() -> Self {
        Self(0)
    }

    /// 从值创建版本号
    ///
    /// ```
    /// use es_domain::value_object::Version;
    ///
    /// let v = Version::from_value(5);
    /// assert_eq!(v.value(), 5);
    /// ```
    pub const fn from_value(value: i64) -> Self {
        Self(value)
    }

    /// 获取下一个版本号，超出 `i64` 范围时返回 `InvalidValue`
    pub fn next(&self) -> DomainResult<Self> {
        self.0
            .checked_add(1)
            .map(Self)
            .ok_or_else(|| DomainError::InvalidValue {
                reason: format!("version {} cannot be incremented", self.0),
            })
    }

    pub const fn value(&self) -> i64 {
        self.0
    }

    /// 检查是否为初始版本
    pub fn is_new(&self) -> bool {
        self.0 == 0
    }

    /// 检查聚合是否已创建（版本大于零）
    pub fn is_created(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self::from_value(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.value()
    }
}

/// 软删除动作，每个事件信封都携带
///
/// 聚合的删除状态只取决于最近一个非 `None` 的动作。
#[value_object(copy = true)]
pub enum DeleteAction {
    #[default]
    None,
    Delete,
    Undelete,
}

impl DeleteAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeleteAction::None => "None",
            DeleteAction::Delete => "Delete",
            DeleteAction::Undelete => "Undelete",
        }
    }
}

impl fmt::Display for DeleteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
