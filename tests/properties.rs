// Property tests over random dictionaries.
//
// Property 1: write → open → get returns the original value for every key.
// Property 2: keys that were never inserted report NotFound, never a value.
// Property 3: the built (gs, vs) pair maps the key set bijectively onto slots.
use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use strtable::perfect_hash::{lookup, PerfectHash};
use strtable::{Error, StringTableFile};

fn nul_free_bytes(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(1u8..=255u8, 0..max_len)
}

fn dictionary() -> impl Strategy<Value = BTreeMap<Vec<u8>, Vec<u8>>> {
    proptest::collection::btree_map(nul_free_bytes(12), nul_free_bytes(24), 1..80)
}

// Short binary keys often defeat every displacement and end up inline.
fn small_binary_dictionary() -> impl Strategy<Value = BTreeMap<Vec<u8>, Vec<u8>>> {
    proptest::collection::btree_map(nul_free_bytes(3), nul_free_bytes(4), 1..6)
}

fn write_and_open(dct: &BTreeMap<Vec<u8>, Vec<u8>>) -> (tempfile::TempDir, StringTableFile) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prop.bin");
    strtable::write(&path, [("t", dct)]).unwrap();
    let file = strtable::open(&path).unwrap();
    (dir, file)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_round_trip(dct in dictionary()) {
        let (_dir, file) = write_and_open(&dct);
        let table = file.get("t").unwrap();
        prop_assert_eq!(table.len(), dct.len());
        for (k, v) in &dct {
            prop_assert_eq!(table.get(k).unwrap(), v.as_slice());
        }
    }

    #[test]
    fn prop_round_trip_small_binary(dct in small_binary_dictionary()) {
        let (_dir, file) = write_and_open(&dct);
        let table = file.get("t").unwrap();
        prop_assert_eq!(table.len(), dct.len());
        for (k, v) in &dct {
            prop_assert_eq!(table.get(k).unwrap(), v.as_slice());
        }
        let entries = table.iter().collect::<strtable::Result<Vec<_>>>().unwrap();
        prop_assert_eq!(entries.len(), dct.len());
    }

    #[test]
    fn prop_foreign_keys_not_found(
        dct in dictionary(),
        queries in proptest::collection::vec(nul_free_bytes(12), 1..64),
    ) {
        let (_dir, file) = write_and_open(&dct);
        let table = file.get("t").unwrap();
        for query in queries.iter().filter(|q| !dct.contains_key(*q)) {
            prop_assert!(matches!(table.get(query), Err(Error::NotFound)));
        }
    }

    #[test]
    fn prop_perfect_hash_is_bijective(
        keys in proptest::collection::btree_set(proptest::collection::vec(any::<u8>(), 0..16), 1..300),
    ) {
        let keys: Vec<Vec<u8>> = keys.into_iter().collect();
        let hash = PerfectHash::build(&keys, 1 << 20).unwrap();
        prop_assert_eq!(hash.gs.len(), keys.len());

        let mut seen = BTreeSet::new();
        for (index, key) in keys.iter().enumerate() {
            let found = lookup(&hash.gs, &hash.vs, key).unwrap();
            prop_assert_eq!(found, Some(index as i32));
            seen.insert(found);
        }
        prop_assert_eq!(seen.len(), keys.len());
    }
}
