use std::collections::HashSet;
use std::str::FromStr;

use es_macros::entity_id;

#[entity_id]
struct TenantId(String);

#[entity_id]
struct Sequence(u64);

fn main() {
    let id = TenantId::new("acme".to_string());
    assert_eq!(id.to_string(), "acme");
    let inner: &String = id.as_ref();
    assert_eq!(inner, "acme");
    assert_eq!(TenantId::from_str("acme").unwrap(), id);
    assert_eq!(TenantId::from("acme".to_string()), id);

    let raw: String = id.clone().into();
    assert_eq!(raw, "acme");

    let ids: HashSet<TenantId> = [id.clone(), id].into_iter().collect();
    assert_eq!(ids.len(), 1);

    assert_eq!("42".parse::<Sequence>().unwrap(), Sequence::new(42));
    assert!("x".parse::<Sequence>().is_err());
    let _ = format!("{:?}", Sequence::new(1));
}
