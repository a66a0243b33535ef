//! 持久化事件记录（EventRecord）
//!
//! 事件在存储层的标准行形态，字段与 `schema::CREATE_EVENTS_TABLE` 的列一一对应。
//! 事件数据是编解码器产出的 JSON 文本，元数据同时冗余在独立列中以便索引查询。
//!
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_object::DeleteAction;

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct EventRecord {
    /// 代理键（全局位点），由存储层在追加时赋值
    sequence: Option<i64>,
    /// 事件唯一标识，幂等键
    event_id: String,
    /// 触发事件的主体
    actor_id: Option<String>,
    occurred_on: DateTime<Utc>,
    /// 事件应用后聚合所处的版本
    version: i64,
    #[builder(default)]
    delete_action: DeleteAction,
    aggregate_type: String,
    aggregate_id: String,
    /// 判别名，用于在注册表中定位事件族
    event_type: String,
    event_data: String,
}

impl EventRecord {
    pub fn sequence(&self) -> Option<i64> {
        self.sequence
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn actor_id(&self) -> Option<&str> {
        self.actor_id.as_deref()
    }

    pub fn occurred_on(&self) -> DateTime<Utc> {
        self.occurred_on
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn delete_action(&self) -> DeleteAction {
        self.delete_action
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn event_data(&self) -> &str {
        &self.event_data
    }

    /// 存储层赋值位点后返回新记录
    pub fn with_sequence(mut self, sequence: i64) -> Self {
        self.sequence = Some(sequence);
        self
    }
}
