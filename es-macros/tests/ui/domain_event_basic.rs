use es_domain::domain_event::DomainEvent;
use es_macros::domain_event;

#[domain_event]
enum UserEvent {
    #[event(event_type = "UserSignedIn")]
    SignedIn { session_id: String },
    PasswordChanged {},
    #[serde(alias = "LockedOut")]
    Locked { attempts: u32 },
}

fn main() {
    assert_eq!(
        UserEvent::EVENT_TYPES,
        &["UserSignedIn", "UserEvent.PasswordChanged", "UserEvent.Locked"]
    );

    let event = UserEvent::SignedIn {
        session_id: "s-1".to_string(),
    };
    assert_eq!(event.event_type(), "UserSignedIn");
    assert_eq!(event.clone(), event);
    assert_eq!(UserEvent::PasswordChanged {}.event_type(), "UserEvent.PasswordChanged");
    assert_eq!(UserEvent::Locked { attempts: 3 }.event_type(), "UserEvent.Locked");
    let _ = format!("{event:?}");
}
