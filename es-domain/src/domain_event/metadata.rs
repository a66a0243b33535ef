use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{ActorId, AggregateId, EventId};
use crate::value_object::{DeleteAction, Version};

/// 事件元数据
///
/// 序列化字段名即持久化事件数据中的信封字段：
/// `id`、`aggregateId`、`version`、`actorId`、`occurredOn`、`deleteAction`。
#[derive(Builder, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(rename = "id")]
    #[builder(default = EventId::generate())]
    event_id: EventId,
    aggregate_id: AggregateId,
    version: Version,
    #[serde(default)]
    actor_id: Option<ActorId>,
    #[builder(default = Utc::now())]
    occurred_on: DateTime<Utc>,
    #[serde(default)]
    #[builder(default)]
    delete_action: DeleteAction,
}

impl Metadata {
    pub fn event_id(&self) -> &EventId {
        &self.event_id
    }

    pub fn aggregate_id(&self) -> &AggregateId {
        &self.aggregate_id
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn actor_id(&self) -> Option<&ActorId> {
        self.actor_id.as_ref()
    }

    pub fn occurred_on(&self) -> &DateTime<Utc> {
        &self.occurred_on
    }

    pub fn delete_action(&self) -> DeleteAction {
        self.delete_action
    }
}
