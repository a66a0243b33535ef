//! 集成测试共用的 Person 聚合与装配
#![allow(dead_code)]

use std::sync::Arc;

use es_domain::aggregate::Aggregate;
use es_domain::domain_event::Metadata;
use es_domain::entity::Entity;
use es_domain::error::DomainResult;
use es_domain::event_codec::EventCodec;
use es_domain::eventing::InMemoryEventBus;
use es_domain::identity::{ActorId, AggregateId};
use es_domain::persist::{EventSourcedRepository, InMemoryEventStore};
use es_macros::{domain_event, entity};

#[domain_event]
pub enum PersonEvent {
    #[event(event_type = "PersonCreated")]
    Created { full_name: String },
    #[event(event_type = "PersonRenamed")]
    Renamed { full_name: String },
    #[event(event_type = "PersonLocaleChanged")]
    LocaleChanged { culture: String },
}

#[entity(event = PersonEvent, aggregate_type = "Person")]
pub struct Person {
    pub full_name: String,
    pub culture: Option<String>,
}

impl Person {
    pub fn create(id: AggregateId, full_name: &str, actor: Option<ActorId>) -> DomainResult<Self> {
        let mut person = Self::construct(id)?;
        person.raise(
            PersonEvent::Created {
                full_name: full_name.to_string(),
            },
            actor,
        )?;
        Ok(person)
    }

    pub fn rename(&mut self, full_name: &str, actor: Option<ActorId>) -> DomainResult<()> {
        self.raise(
            PersonEvent::Renamed {
                full_name: full_name.to_string(),
            },
            actor,
        )
    }

    pub fn change_locale(&mut self, culture: &str) -> DomainResult<()> {
        self.raise(
            PersonEvent::LocaleChanged {
                culture: culture.to_string(),
            },
            None,
        )
    }
}

impl Aggregate for Person {
    fn apply(&mut self, event: &PersonEvent, _metadata: &Metadata) {
        match event {
            PersonEvent::Created { full_name } | PersonEvent::Renamed { full_name } => {
                self.full_name = full_name.clone();
            }
            PersonEvent::LocaleChanged { culture } => self.culture = Some(culture.clone()),
        }
    }
}

pub fn codec() -> Arc<EventCodec> {
    let mut codec = EventCodec::new();
    codec.register::<PersonEvent>().unwrap();
    Arc::new(codec)
}

pub type Repo = EventSourcedRepository<InMemoryEventStore, InMemoryEventBus>;

pub fn repository() -> (Repo, Arc<InMemoryEventStore>, Arc<InMemoryEventBus>) {
    let store = Arc::new(InMemoryEventStore::new());
    let bus = Arc::new(InMemoryEventBus::default());
    let repo = EventSourcedRepository::new(store.clone(), bus.clone(), codec());
    (repo, store, bus)
}

pub fn id(value: &str) -> AggregateId {
    AggregateId::new(value).unwrap()
}
