// tests/digest_properties.rs

use std::path::PathBuf;
use std::sync::Arc;

use proptest::prelude::*;

use taskgate::digest::{fold, ContentHasher, Digest};
use taskgate::fs::mock::MockFileSystem;
use taskgate::resolve::GoListCommand;
use taskgate::InputResolver;
use taskgate_test_utils::builders::TaskBuilder;

fn digests(max: usize) -> impl Strategy<Value = Vec<Digest>> {
    proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..32), 1..max)
        .prop_map(|blobs| blobs.iter().map(Digest::of_bytes).collect())
}

proptest! {
    #[test]
    fn fold_is_deterministic(ds in digests(8)) {
        prop_assert_eq!(fold(&ds), fold(&ds.clone()));
    }

    #[test]
    fn fold_depends_on_order(ds in digests(8)) {
        let mut reversed = ds.clone();
        reversed.reverse();
        prop_assume!(reversed != ds);
        prop_assert_ne!(fold(&ds), fold(&reversed));
    }

    #[test]
    fn digest_string_form_round_trips(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        let d = Digest::of_bytes(&bytes);
        let parsed: Digest = d.to_string().parse().unwrap();
        prop_assert_eq!(parsed, d);
    }

    /// Repeating patterns never changes the resolved set or its digest.
    #[test]
    fn repeated_patterns_are_deduplicated(
        names in proptest::collection::btree_set("[a-z]{1,6}", 1..6),
        repeats in 1usize..4,
    ) {
        let fs = MockFileSystem::new();
        fs.add_file("/r/app/.app.toml", "name = \"app\"");
        for name in &names {
            fs.add_file(PathBuf::from(format!("/r/app/{name}.txt")), name.as_bytes());
        }
        let fs = Arc::new(fs);
        let resolver = InputResolver::new(
            fs.clone(),
            Arc::new(ContentHasher::new(fs)),
            Arc::new(GoListCommand),
        );

        let single = TaskBuilder::new("/r", "app", "build").glob(&["*.txt"]).build();
        let mut repeated = TaskBuilder::new("/r", "app", "build");
        for _ in 0..repeats {
            repeated = repeated.glob(&["*.txt"]);
        }
        for name in &names {
            repeated = repeated.optional_glob(&[format!("{name}.txt").as_str()]);
        }
        let repeated = repeated.build();

        let root = PathBuf::from("/r");
        let a = resolver.resolve(&root, &single).unwrap();
        let b = resolver.resolve(&root, &repeated).unwrap();
        prop_assert_eq!(a.len(), names.len() + 1);
        prop_assert_eq!(a.len(), b.len());
        prop_assert_eq!(a.digest().unwrap(), b.digest().unwrap());
    }
}
