// tests/properties.rs

//! Property tests for change ordering, filtering and path handling.

use proptest::prelude::*;
use std::collections::HashSet;

use stagehand::path::normalize;
use stagehand::{ChangeKind, ChangeSetBuilder, OrderedChanges, RawChange};

fn relative_path() -> impl Strategy<Value = String> {
    let segment = proptest::string::string_regex("[a-z0-9_.-]{1,8}")
        .unwrap()
        .prop_filter("no dot segments", |s| s != "." && s != "..");
    proptest::collection::vec(segment, 1..=4).prop_map(|segments| segments.join("/"))
}

fn raw_change() -> impl Strategy<Value = RawChange> {
    let kind = prop_oneof![
        Just("A"),
        Just("M"),
        Just("D"),
        Just("R100"),
        Just("T"),
    ];
    (kind, relative_path()).prop_map(|(kind, path)| RawChange::new(kind, path))
}

/// A relative path with noise that normalizes away: leading `/` or `./`,
/// doubled separators
fn noisy_path() -> impl Strategy<Value = String> {
    let prefix = prop_oneof![Just(""), Just("/"), Just("./")];
    let separator = prop_oneof![Just("/"), Just("//"), Just("/./")];
    (prefix, relative_path(), separator).prop_map(|(prefix, path, separator)| {
        format!("{}{}", prefix, path.replace('/', separator))
    })
}

fn known_kind() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("A"), Just("M"), Just("D")]
}

fn rank(kind: ChangeKind) -> u8 {
    match kind {
        ChangeKind::Added => 0,
        ChangeKind::Modified => 1,
        ChangeKind::Deleted => 2,
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// Ordered output is added, then modified, then deleted; adds and
    /// modifies ascend by path, deletes descend.
    #[test]
    fn property_order_partitions_by_kind(raw in proptest::collection::vec(raw_change(), 0..40)) {
        let builder = ChangeSetBuilder::new::<&str>(&[]).unwrap();
        let (set, _) = builder.build(raw);
        let total = set.len();
        let ordered = OrderedChanges::from_working_set(set);

        prop_assert_eq!(ordered.len(), total);

        for pair in ordered.changes().windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(rank(a.kind()) <= rank(b.kind()));

            if a.kind() == b.kind() {
                match a.kind() {
                    ChangeKind::Added | ChangeKind::Modified => prop_assert!(a.path() <= b.path()),
                    ChangeKind::Deleted => prop_assert!(a.path() >= b.path()),
                }
            }
        }
    }

    /// Building from an already-built set changes nothing.
    #[test]
    fn property_builder_is_idempotent(raw in proptest::collection::vec(raw_change(), 0..40)) {
        let builder = ChangeSetBuilder::new(&["*.md", "tests/*"]).unwrap();
        let (first, _) = builder.build(raw);
        let (second, stats) = builder.build(first.to_raw());

        prop_assert_eq!(stats.dropped(), 0);
        prop_assert_eq!(first, second);
    }

    /// Nothing the builder keeps matches an exclude pattern.
    #[test]
    fn property_excluded_paths_never_survive(
        raw in proptest::collection::vec(raw_change(), 0..40)
    ) {
        let builder = ChangeSetBuilder::new(&["*.md", "a*"]).unwrap();
        let (set, _) = builder.build(raw);

        for change in set.iter() {
            prop_assert!(builder.excluded_by(change.path()).is_none());
        }
    }

    /// Spellings of the same path collapse into one normalized entry.
    #[test]
    fn property_builder_paths_are_normalized_and_unique(
        entries in proptest::collection::vec((known_kind(), noisy_path()), 0..40)
    ) {
        let builder = ChangeSetBuilder::new::<&str>(&[]).unwrap();
        let raw: Vec<RawChange> = entries
            .iter()
            .map(|(kind, path)| RawChange::new(*kind, path.as_str()))
            .collect();
        let distinct: HashSet<String> = entries
            .iter()
            .map(|(_, path)| normalize(path).unwrap())
            .collect();

        let (set, stats) = builder.build(raw);

        prop_assert_eq!(set.len(), distinct.len());
        prop_assert_eq!(stats.duplicates, entries.len() - distinct.len());
        let mut seen = HashSet::new();
        for change in set.iter() {
            prop_assert_eq!(normalize(change.path()).unwrap(), change.path());
            prop_assert!(seen.insert(change.path().to_string()));
        }
    }

    /// Normalizing twice is the same as normalizing once, and never panics.
    #[test]
    fn property_normalize_is_idempotent(s in "(?s).{0,64}") {
        if let Ok(once) = normalize(&s) {
            prop_assert_eq!(normalize(&once).unwrap(), once.clone());
            prop_assert!(!once.split('/').any(|segment| segment == ".."));
        }
    }
}
