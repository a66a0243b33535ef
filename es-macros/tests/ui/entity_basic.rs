use std::collections::HashSet;

use es_domain::aggregate::Aggregate;
use es_domain::domain_event::Metadata;
use es_domain::entity::Entity;
use es_domain::error::DomainError;
use es_domain::identity::AggregateId;
use es_macros::{domain_event, entity};

#[domain_event]
enum RoleEvent {
    Created { unique_name: String },
}

#[entity(event = RoleEvent, aggregate_type = "Role")]
struct Role {
    unique_name: String,
    permissions: Vec<String>,
}

impl Aggregate for Role {
    fn apply(&mut self, event: &RoleEvent, _metadata: &Metadata) {
        match event {
            RoleEvent::Created { unique_name } => self.unique_name = unique_name.clone(),
        }
    }
}

#[entity(event = RoleEvent)]
struct ApiKey {
    title: String,
}

impl Aggregate for ApiKey {
    fn apply(&mut self, _event: &RoleEvent, _metadata: &Metadata) {}
}

#[entity(event = RoleEvent, constructor = false)]
struct Session {
    token: String,
}

impl Aggregate for Session {
    fn apply(&mut self, _event: &RoleEvent, _metadata: &Metadata) {}
}

fn main() {
    assert_eq!(Role::TYPE, "Role");
    assert_eq!(ApiKey::TYPE, "ApiKey");

    let id = AggregateId::new("r-1").unwrap();
    let mut role = Role::construct(id.clone()).unwrap();
    assert!(role.unique_name.is_empty());
    assert!(role.permissions.is_empty());
    assert!(role.version().is_new());

    role.raise(
        RoleEvent::Created {
            unique_name: "admin".to_string(),
        },
        None,
    )
    .unwrap();
    assert_eq!(role.unique_name, "admin");
    assert_eq!(role.changes().len(), 1);

    // 相等性只看类型与标识
    let other = Role::construct(id.clone()).unwrap();
    assert_eq!(role, other);
    let set: HashSet<Role> = [role.clone(), other].into_iter().collect();
    assert_eq!(set.len(), 1);

    let key = ApiKey::construct(AggregateId::new("k-1").unwrap()).unwrap();
    assert!(key.title.is_empty());

    match Session::construct(id) {
        Err(DomainError::MissingConstructor { aggregate_type }) => {
            assert_eq!(aggregate_type, "Session")
        }
        _ => panic!("expected MissingConstructor"),
    }
    let _ = std::mem::size_of::<Session>();
}
