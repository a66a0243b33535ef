//! 事件数据转换器（Event Converter）
//!
//! 在事件数据的 JSON 对象层面做双向转换：写入时按注册顺序执行 `write`，
//! 读取时按相反顺序执行 `read`。典型用途是自定义标量编码与旧字段重命名。
//!
use crate::error::DomainResult;
use serde_json::{Map, Value};
use std::sync::Arc;

/// 事件数据转换器
pub trait EventConverter: Send + Sync {
    /// 是否处理该事件类型
    fn applies(&self, event_type: &str) -> bool;

    /// 编码方向：类型化载荷 → 持久化 JSON
    fn write(&self, data: Map<String, Value>) -> DomainResult<Map<String, Value>> {
        Ok(data)
    }

    /// 解码方向：持久化 JSON → 类型化载荷
    fn read(&self, data: Map<String, Value>) -> DomainResult<Map<String, Value>> {
        Ok(data)
    }
}

impl<T> EventConverter for Arc<T>
where
    T: EventConverter + ?Sized,
{
    fn applies(&self, event_type: &str) -> bool {
        (**self).applies(event_type)
    }

    fn write(&self, data: Map<String, Value>) -> DomainResult<Map<String, Value>> {
        (**self).write(data)
    }

    fn read(&self, data: Map<String, Value>) -> DomainResult<Map<String, Value>> {
        (**self).read(data)
    }
}

/// 转换链
#[derive(Default, Clone)]
pub struct ConverterChain {
    stages: Vec<Arc<dyn EventConverter>>,
}

impl std::fmt::Debug for ConverterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConverterChain")
            .field("stages", &self.stages.len())
            .finish()
    }
}

impl ConverterChain {
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn push(&mut self, converter: Arc<dyn EventConverter>) {
        self.stages.push(converter);
    }

    pub fn write(
        &self,
        event_type: &str,
        data: Map<String, Value>,
    ) -> DomainResult<Map<String, Value>> {
        self.stages
            .iter()
            .filter(|stage| stage.applies(event_type))
            .try_fold(data, |acc, stage| stage.write(acc))
    }

    pub fn read(
        &self,
        event_type: &str,
        data: Map<String, Value>,
    ) -> DomainResult<Map<String, Value>> {
        self.stages
            .iter()
            .rev()
            .filter(|stage| stage.applies(event_type))
            .try_fold(data, |acc, stage| stage.read(acc))
    }
}

impl FromIterator<Arc<dyn EventConverter>> for ConverterChain {
    fn from_iter<I: IntoIterator<Item = Arc<dyn EventConverter>>>(iter: I) -> Self {
        Self {
            stages: iter.into_iter().collect(),
        }
    }
}

impl Extend<Arc<dyn EventConverter>> for ConverterChain {
    fn extend<I: IntoIterator<Item = Arc<dyn EventConverter>>>(&mut self, iter: I) {
        self.stages.extend(iter);
    }
}
