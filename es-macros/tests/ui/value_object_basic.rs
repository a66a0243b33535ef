use std::collections::BTreeSet;

use es_macros::value_object;

#[value_object]
struct Locale {
    culture: String,
}

#[value_object(copy = true, ord = true)]
struct Priority(u8);

#[value_object(copy = true)]
enum Gender {
    #[default]
    Unknown,
    Female,
    Male,
}

#[value_object(debug = false)]
struct Secret(String);

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret(***)")
    }
}

fn main() {
    let locale = Locale {
        culture: "fr-CA".to_string(),
    };
    assert_eq!(locale.clone(), locale);
    assert_eq!(Locale::default().culture, "");

    let low = Priority(1);
    let copied = low;
    assert_eq!(low, copied);
    let set: BTreeSet<Priority> = [Priority(3), Priority(1), Priority(2)].into_iter().collect();
    assert_eq!(set.into_iter().next(), Some(Priority(1)));

    assert_eq!(Gender::default(), Gender::Unknown);
    let g = Gender::Female;
    let h = g;
    assert_ne!(g, Gender::Male);
    assert_eq!(h, g);

    assert_eq!(format!("{:?}", Secret("pw".to_string())), "Secret(***)");
}
