//! 多态事件编解码（EventCodec）
//!
//! 持久化的事件数据是一个扁平 JSON 对象：信封字段
//! （`id`、`aggregateId`、`version`、`actorId`、`occurredOn`、`deleteAction`）
//! 与具体事件变体的字段合并在一起，事件类型名单独存放在记录的 EventType 列。
//!
//! 解码时按事件类型名在封闭注册表中查找事件族，注册表在启动时填充，
//! 之后以 `Arc<EventCodec>` 共享、只读使用。
//!
use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::aggregate::Aggregate;
use crate::domain_event::{
    AGGREGATE_DELETED, AGGREGATE_UNDELETED, DomainEvent, EventEnvelope, EventPayload, Metadata,
};
use crate::error::{DomainError, DomainResult};
use crate::event_converter::{ConverterChain, EventConverter};
use crate::identity::MAX_ID_LENGTH;
use crate::persist::EventRecord;

/// 事件数据中属于信封的字段
const METADATA_KEYS: [&str; 6] = [
    "id",
    "aggregateId",
    "version",
    "actorId",
    "occurredOn",
    "deleteAction",
];

#[derive(Debug, Clone, Copy)]
struct Registration {
    type_id: TypeId,
    family: &'static str,
}

/// 事件编解码器
#[derive(Debug, Default, Clone)]
pub struct EventCodec {
    registry: HashMap<String, Registration>,
    converters: ConverterChain,
}

impl EventCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一个事件族的全部判别名
    ///
    /// 同一事件族重复注册是幂等的；判别名已属于其他事件族或与内置事件重名时
    /// 返回 `DuplicateEventType`，且不写入任何条目。
    pub fn register<E: DomainEvent>(&mut self) -> DomainResult<&mut Self> {
        let registration = Registration {
            type_id: TypeId::of::<E>(),
            family: type_name::<E>(),
        };

        for event_type in E::EVENT_TYPES {
            let reserved = *event_type == AGGREGATE_DELETED || *event_type == AGGREGATE_UNDELETED;
            let taken = self
                .registry
                .get(*event_type)
                .is_some_and(|existing| existing.type_id != registration.type_id);
            if reserved || taken {
                return Err(DomainError::DuplicateEventType {
                    event_type: event_type.to_string(),
                });
            }
        }

        for event_type in E::EVENT_TYPES {
            self.registry.insert(event_type.to_string(), registration);
        }

        tracing::debug!(
            family = registration.family,
            count = E::EVENT_TYPES.len(),
            "event family registered"
        );
        Ok(self)
    }

    pub fn register_converter(&mut self, converter: Arc<dyn EventConverter>) -> &mut Self {
        self.converters.push(converter);
        self
    }

    /// 判别名是否可解码（包含内置事件）
    pub fn is_registered(&self, event_type: &str) -> bool {
        event_type == AGGREGATE_DELETED
            || event_type == AGGREGATE_UNDELETED
            || self.registry.contains_key(event_type)
    }

    /// 编码为持久化事件数据
    pub fn serialize<E: DomainEvent>(&self, envelope: &EventEnvelope<E>) -> DomainResult<String> {
        let event_type = envelope.event_type();
        let fail = |reason: String| DomainError::EventDataSerializationFailed {
            event_type: event_type.to_string(),
            reason,
        };

        let mut object = match serde_json::to_value(envelope.metadata())? {
            Value::Object(map) => map,
            _ => return Err(fail("metadata is not a JSON object".to_string())),
        };

        let data = match envelope.payload() {
            EventPayload::Event(event) => payload_fields(event).map_err(fail)?,
            EventPayload::Deleted | EventPayload::Undeleted => Map::new(),
        };
        let data = self
            .converters
            .write(event_type, data)
            .map_err(|e| fail(e.to_string()))?;

        for (key, value) in data {
            if object.contains_key(&key) {
                return Err(fail(format!(
                    "payload field `{key}` collides with an envelope field"
                )));
            }
            object.insert(key, value);
        }

        Ok(serde_json::to_string(&Value::Object(object))?)
    }

    /// 从持久化记录解码出类型化信封
    pub fn deserialize<E: DomainEvent>(
        &self,
        record: &EventRecord,
    ) -> DomainResult<EventEnvelope<E>> {
        let event_type = record.event_type();
        let builtin = match event_type {
            AGGREGATE_DELETED => Some(EventPayload::Deleted),
            AGGREGATE_UNDELETED => Some(EventPayload::Undeleted),
            _ => None,
        };

        if builtin.is_none() {
            let registration = self.registry.get(event_type).ok_or_else(|| {
                DomainError::EventTypeNotFound {
                    event_type: event_type.to_string(),
                }
            })?;
            if registration.type_id != TypeId::of::<E>() {
                return Err(DomainError::TypeMismatch {
                    expected: type_name::<E>().to_string(),
                    found: registration.family.to_string(),
                });
            }
        }

        let fail = |reason: String| DomainError::EventDataDeserializationFailed {
            event_type: event_type.to_string(),
            reason,
        };

        let object = match serde_json::from_str::<Value>(record.event_data()) {
            Ok(Value::Object(map)) if !map.is_empty() => map,
            Ok(Value::Object(_)) => return Err(fail("event data is empty".to_string())),
            Ok(other) => return Err(fail(format!("expected a JSON object, found {other}"))),
            Err(err) => return Err(fail(err.to_string())),
        };

        let (mut meta, data): (Map<String, Value>, Map<String, Value>) = object
            .into_iter()
            .partition(|(key, _)| METADATA_KEYS.contains(&key.as_str()));
        fill_missing_metadata(&mut meta, record);

        let metadata: Metadata =
            serde_json::from_value(Value::Object(meta)).map_err(|e| fail(e.to_string()))?;

        let payload = match builtin {
            Some(payload) => payload,
            None => {
                let data = self
                    .converters
                    .read(event_type, data)
                    .map_err(|e| fail(e.to_string()))?;
                let tagged = serde_json::json!({ "type": event_type, "data": data });
                let event: E = serde_json::from_value(tagged).map_err(|e| fail(e.to_string()))?;
                EventPayload::Event(event)
            }
        };

        Ok(EventEnvelope::new(metadata, payload))
    }

    /// 按顺序解码一批记录
    pub fn deserialize_all<E: DomainEvent>(
        &self,
        records: &[EventRecord],
    ) -> DomainResult<Vec<EventEnvelope<E>>> {
        records.iter().map(|r| self.deserialize::<E>(r)).collect()
    }

    /// 生成聚合 `A` 的持久化记录（尚无位点）
    pub fn to_record<A: Aggregate>(
        &self,
        envelope: &EventEnvelope<A::Event>,
    ) -> DomainResult<EventRecord> {
        let metadata = envelope.metadata();
        let actor_id = metadata.actor_id().map(|a| a.to_string());

        check_length("aggregate type", A::TYPE)?;
        check_length("event type", envelope.event_type())?;
        check_length("aggregate id", metadata.aggregate_id().as_str())?;
        if let Some(actor) = &actor_id {
            check_length("actor id", actor)?;
        }

        Ok(EventRecord::builder()
            .event_id(metadata.event_id().to_string())
            .maybe_actor_id(actor_id)
            .occurred_on(*metadata.occurred_on())
            .version(metadata.version().value())
            .delete_action(metadata.delete_action())
            .aggregate_type(A::TYPE.to_string())
            .aggregate_id(metadata.aggregate_id().to_string())
            .event_type(envelope.event_type().to_string())
            .event_data(self.serialize(envelope)?)
            .build())
    }
}

// 取出 `{"type": .., "data": {..}}` 中的变体字段
fn payload_fields<E: DomainEvent>(event: &E) -> Result<Map<String, Value>, String> {
    match serde_json::to_value(event).map_err(|e| e.to_string())? {
        Value::Object(mut tagged) => match tagged.remove("data") {
            Some(Value::Object(fields)) => Ok(fields),
            None | Some(Value::Null) => Ok(Map::new()),
            Some(other) => Err(format!(
                "payload must serialize to an object, found {other}"
            )),
        },
        other => Err(format!("unexpected payload shape: {other}")),
    }
}

// 事件数据缺少的信封字段以记录列为准
fn fill_missing_metadata(meta: &mut Map<String, Value>, record: &EventRecord) {
    meta.entry("id")
        .or_insert_with(|| Value::from(record.event_id()));
    meta.entry("aggregateId")
        .or_insert_with(|| Value::from(record.aggregate_id()));
    meta.entry("version")
        .or_insert_with(|| Value::from(record.version()));
    meta.entry("actorId")
        .or_insert_with(|| record.actor_id().map(Value::from).unwrap_or(Value::Null));
    meta.entry("occurredOn")
        .or_insert_with(|| Value::from(record.occurred_on().to_rfc3339()));
    meta.entry("deleteAction")
        .or_insert_with(|| Value::from(record.delete_action().as_str()));
}

fn check_length(column: &str, value: &str) -> DomainResult<()> {
    if value.chars().count() > MAX_ID_LENGTH {
        return Err(DomainError::InvalidValue {
            reason: format!("{column} exceeds {MAX_ID_LENGTH} characters"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregate;
    use crate::entity::Entity;
    use crate::identity::{ActorId, AggregateId, EventId};
    use crate::value_object::{DeleteAction, Version};
    use es_macros::{domain_event, entity};
    use std::str::FromStr;

    #[domain_event]
    enum LocaleEvent {
        #[event(event_type = "LocaleChanged")]
        Changed { culture: String },
        #[event(event_type = "LocaleCleared")]
        Cleared {},
    }

    #[domain_event]
    enum OtherEvent {
        #[event(event_type = "OtherHappened")]
        Happened { note: String },
        #[event(event_type = "VersionBumped")]
        Bumped { version: i64 },
    }

    #[entity(event = LocaleEvent, aggregate_type = "Preferences")]
    struct Preferences {
        culture: Option<String>,
    }

    impl Aggregate for Preferences {
        fn apply(&mut self, event: &LocaleEvent, _metadata: &Metadata) {
            match event {
                LocaleEvent::Changed { culture } => self.culture = Some(culture.clone()),
                LocaleEvent::Cleared {} => self.culture = None,
            }
        }
    }

    fn codec() -> EventCodec {
        let mut codec = EventCodec::new();
        codec.register::<LocaleEvent>().unwrap();
        codec.register::<OtherEvent>().unwrap();
        codec
    }

    fn locale_envelope(culture: &str) -> EventEnvelope<LocaleEvent> {
        EventEnvelope::new(
            Metadata::builder()
                .event_id(EventId::from_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap())
                .aggregate_id(AggregateId::new("prefs-1").unwrap())
                .version(Version::from_value(5))
                .actor_id(ActorId::from("fpion"))
                .build(),
            LocaleEvent::Changed {
                culture: culture.to_string(),
            },
        )
    }

    #[test]
    fn envelope_round_trips_through_record() {
        let codec = codec();
        let original = locale_envelope("en-CA");

        let record = codec.to_record::<Preferences>(&original).unwrap();
        assert_eq!(record.event_type(), "LocaleChanged");
        assert_eq!(record.aggregate_type(), "Preferences");
        assert_eq!(record.version(), 5);
        assert_eq!(record.actor_id(), Some("fpion"));
        assert_eq!(record.sequence(), None);

        let data: Value = serde_json::from_str(record.event_data()).unwrap();
        assert_eq!(data["culture"], "en-CA");
        assert_eq!(data["id"], "67e55044-10b1-426f-9247-bb680e5fe0c8");
        assert_eq!(data["aggregateId"], "prefs-1");
        assert_eq!(data["deleteAction"], "None");

        let decoded = codec.deserialize::<LocaleEvent>(&record).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn builtin_events_round_trip_without_registration() {
        let codec = EventCodec::new();
        let deleted: EventEnvelope<LocaleEvent> = EventEnvelope::new(
            Metadata::builder()
                .aggregate_id(AggregateId::new("prefs-1").unwrap())
                .version(Version::from_value(2))
                .delete_action(DeleteAction::Delete)
                .build(),
            EventPayload::Deleted,
        );

        let record = codec.to_record::<Preferences>(&deleted).unwrap();
        assert_eq!(record.event_type(), AGGREGATE_DELETED);
        assert_eq!(record.delete_action(), DeleteAction::Delete);

        let decoded = codec.deserialize::<LocaleEvent>(&record).unwrap();
        assert_eq!(decoded, deleted);
    }

    #[test]
    fn unit_like_variant_round_trips() {
        let codec = codec();
        let cleared: EventEnvelope<LocaleEvent> = EventEnvelope::new(
            Metadata::builder()
                .aggregate_id(AggregateId::new("prefs-1").unwrap())
                .version(Version::from_value(1))
                .build(),
            LocaleEvent::Cleared {},
        );
        let record = codec.to_record::<Preferences>(&cleared).unwrap();
        assert_eq!(codec.deserialize::<LocaleEvent>(&record).unwrap(), cleared);
    }

    #[test]
    fn unknown_event_type_is_reported() {
        let codec = codec();
        let record = codec
            .to_record::<Preferences>(&locale_envelope("en-CA"))
            .unwrap();

        let err = EventCodec::new()
            .deserialize::<LocaleEvent>(&record)
            .unwrap_err();
        match err {
            DomainError::EventTypeNotFound { event_type } => {
                assert_eq!(event_type, "LocaleChanged")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn decoding_into_wrong_family_is_a_type_mismatch() {
        let codec = codec();
        let record = codec
            .to_record::<Preferences>(&locale_envelope("en-CA"))
            .unwrap();

        let err = codec.deserialize::<OtherEvent>(&record).unwrap_err();
        assert!(matches!(err, DomainError::TypeMismatch { .. }));
    }

    #[test]
    fn conflicting_registration_is_rejected() {
        #[domain_event]
        enum Clashing {
            #[event(event_type = "LocaleChanged")]
            Changed { culture: String },
            #[event(event_type = "Fresh")]
            Fresh { x: i32 },
        }

        let mut codec = codec();
        let err = codec.register::<Clashing>().unwrap_err();
        assert!(matches!(err, DomainError::DuplicateEventType { .. }));
        // 失败时不写入任何条目
        assert!(!codec.is_registered("Fresh"));

        // 重复注册同一事件族是幂等的
        assert!(codec.register::<LocaleEvent>().is_ok());
    }

    #[test]
    fn builtin_names_are_reserved() {
        #[domain_event]
        enum Sneaky {
            #[event(event_type = "AggregateDeleted")]
            Deleted { reason: String },
        }

        let err = EventCodec::new().register::<Sneaky>().unwrap_err();
        assert!(matches!(err, DomainError::DuplicateEventType { .. }));
    }

    #[test]
    fn malformed_event_data_fails_deserialization() {
        let codec = codec();
        let good = codec
            .to_record::<Preferences>(&locale_envelope("en-CA"))
            .unwrap();

        for data in ["not json", "null", "{}", "[1,2]", r#"{"culture": 42}"#] {
            let record = EventRecord::builder()
                .event_id(good.event_id().to_string())
                .occurred_on(good.occurred_on())
                .version(good.version())
                .aggregate_type(good.aggregate_type().to_string())
                .aggregate_id(good.aggregate_id().to_string())
                .event_type(good.event_type().to_string())
                .event_data(data.to_string())
                .build();
            let err = codec.deserialize::<LocaleEvent>(&record).unwrap_err();
            assert!(
                matches!(err, DomainError::EventDataDeserializationFailed { .. }),
                "{data}: {err:?}"
            );
        }
    }

    // 事件数据缺少信封字段时以记录列补齐
    #[test]
    fn metadata_falls_back_to_record_columns() {
        let codec = codec();
        let expected = locale_envelope("fr-CA");
        let good = codec.to_record::<Preferences>(&expected).unwrap();
        let record = EventRecord::builder()
            .event_id(good.event_id().to_string())
            .actor_id("fpion".to_string())
            .occurred_on(good.occurred_on())
            .version(good.version())
            .aggregate_type(good.aggregate_type().to_string())
            .aggregate_id(good.aggregate_id().to_string())
            .event_type(good.event_type().to_string())
            .event_data(r#"{"culture":"fr-CA"}"#.to_string())
            .build();

        let decoded = codec.deserialize::<LocaleEvent>(&record).unwrap();
        assert_eq!(decoded, expected);
    }

    #[test]
    fn payload_field_colliding_with_envelope_is_rejected() {
        let codec = codec();
        let envelope: EventEnvelope<OtherEvent> = EventEnvelope::new(
            Metadata::builder()
                .aggregate_id(AggregateId::new("x").unwrap())
                .version(Version::from_value(1))
                .build(),
            OtherEvent::Bumped { version: 9 },
        );

        let err = codec.serialize(&envelope).unwrap_err();
        assert!(matches!(
            err,
            DomainError::EventDataSerializationFailed { .. }
        ));
    }

    #[test]
    fn oversized_actor_is_rejected_by_to_record() {
        let codec = codec();
        let envelope: EventEnvelope<LocaleEvent> = EventEnvelope::new(
            Metadata::builder()
                .aggregate_id(AggregateId::new("prefs-1").unwrap())
                .version(Version::from_value(1))
                .actor_id(ActorId::new("a".repeat(MAX_ID_LENGTH + 1)))
                .build(),
            LocaleEvent::Changed {
                culture: "en".into(),
            },
        );
        let err = codec.to_record::<Preferences>(&envelope).unwrap_err();
        assert!(matches!(err, DomainError::InvalidValue { .. }));
    }

    struct CultureUpper;
    impl EventConverter for CultureUpper {
        fn applies(&self, event_type: &str) -> bool {
            event_type == "LocaleChanged"
        }

        fn write(&self, mut data: Map<String, Value>) -> DomainResult<Map<String, Value>> {
            if let Some(Value::String(c)) = data.remove("culture") {
                data.insert("locale".into(), Value::String(c.to_uppercase()));
            }
            Ok(data)
        }

        fn read(&self, mut data: Map<String, Value>) -> DomainResult<Map<String, Value>> {
            if let Some(Value::String(c)) = data.remove("locale") {
                let (lang, region) = c.split_once('-').unwrap_or((c.as_str(), ""));
                let culture = if region.is_empty() {
                    lang.to_lowercase()
                } else {
                    format!("{}-{}", lang.to_lowercase(), region)
                };
                data.insert("culture".into(), Value::String(culture));
            }
            Ok(data)
        }
    }

    #[test]
    fn converters_shape_the_stored_data() {
        let mut codec = codec();
        codec.register_converter(Arc::new(CultureUpper));

        let original = locale_envelope("en-CA");
        let record = codec.to_record::<Preferences>(&original).unwrap();
        let data: Value = serde_json::from_str(record.event_data()).unwrap();
        assert_eq!(data["locale"], "EN-CA");
        assert!(data.get("culture").is_none());

        assert_eq!(codec.deserialize::<LocaleEvent>(&record).unwrap(), original);
    }

    /// 写入或读取时总是失败的转换器
    struct Rejecting {
        on_write: bool,
    }
    impl EventConverter for Rejecting {
        fn applies(&self, event_type: &str) -> bool {
            event_type == "LocaleChanged"
        }

        fn write(&self, data: Map<String, Value>) -> DomainResult<Map<String, Value>> {
            if self.on_write {
                return Err(DomainError::InvalidValue {
                    reason: "culture is not supported".to_string(),
                });
            }
            Ok(data)
        }

        fn read(&self, _data: Map<String, Value>) -> DomainResult<Map<String, Value>> {
            Err(DomainError::InvalidValue {
                reason: "locale field is malformed".to_string(),
            })
        }
    }

    #[test]
    fn converter_failures_surface_as_codec_errors() {
        let mut writer = codec();
        writer.register_converter(Arc::new(Rejecting { on_write: true }));
        let err = writer
            .to_record::<Preferences>(&locale_envelope("en-CA"))
            .unwrap_err();
        match err {
            DomainError::EventDataSerializationFailed { event_type, reason } => {
                assert_eq!(event_type, "LocaleChanged");
                assert!(reason.contains("culture is not supported"));
            }
            other => panic!("unexpected {other:?}"),
        }

        let record = codec()
            .to_record::<Preferences>(&locale_envelope("en-CA"))
            .unwrap();
        let mut reader = codec();
        reader.register_converter(Arc::new(Rejecting { on_write: false }));
        let err = reader.deserialize::<LocaleEvent>(&record).unwrap_err();
        match err {
            DomainError::EventDataDeserializationFailed { event_type, reason } => {
                assert_eq!(event_type, "LocaleChanged");
                assert!(reason.contains("locale field is malformed"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn preferences_type_name_is_used() {
        assert_eq!(Preferences::TYPE, "Preferences");
    }
}
