//! Property tests for title and location normalization

use jobtrail::parser::sanitize::{normalize_location, normalize_title};
use proptest::prelude::*;

fn title_words() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec![
            "Data", "data", "Scientist", "Senior", "Junior", "Analyst", "ML", "with",
            "verification", "Verification", "II", "-",
        ]),
        0..12,
    )
    .prop_map(|words| words.join(" "))
}

fn location_parts() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec![
            "tel aviv", "Tel-Aviv", "TLV", "herzliya", "Haifa District", "israel", "IL",
            "Israel", "Central District", " ", "", "Remote",
        ]),
        0..6,
    )
    .prop_map(|parts| parts.join(","))
}

proptest! {
    #[test]
    fn title_normalization_is_idempotent(raw in "\\PC{0,60}") {
        let once = normalize_title(&raw);
        prop_assert_eq!(normalize_title(&once), once);
    }

    #[test]
    fn title_normalization_is_idempotent_on_repetitive_titles(raw in title_words()) {
        let once = normalize_title(&raw);
        prop_assert_eq!(normalize_title(&once), once.clone());
        prop_assert!(!once.to_lowercase().contains("with verification"));
    }

    #[test]
    fn location_normalization_is_idempotent(raw in "\\PC{0,60}") {
        let once = normalize_location(&raw);
        prop_assert_eq!(normalize_location(&once), once);
    }

    #[test]
    fn location_normalization_is_idempotent_on_known_places(raw in location_parts()) {
        let once = normalize_location(&raw);
        prop_assert_eq!(normalize_location(&once), once.clone());
        prop_assert!(once.matches("Israel").count() <= 1);
    }
}
