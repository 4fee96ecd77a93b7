//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check validity, persistence and sweep properties.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::time::Duration;

use crate::cache::{CacheClass, CacheEntry, CachePolicy, CacheSnapshot, CacheStore};

// == Test Configuration ==
const T0: u64 = 1_700_000_000_000;

// == Strategies ==
fn key_strategy() -> impl Strategy<Value = String> {
    "[A-Z0-9]{1,4}(-(outbound|inbound))?-[1-9]".prop_map(|s| s)
}

/// JSON payloads without floats, so encoding is exact.
fn payload_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[a-zA-Z0-9 ]{0,32}".prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        prop::collection::vec("[A-F0-9]{16}", 0..4)
            .prop_map(|ids| json!(ids.into_iter().map(|id| json!({ "stop": id })).collect::<Vec<_>>())),
    ]
}

fn class_strategy() -> impl Strategy<Value = CacheClass> {
    prop_oneof![
        Just(CacheClass::Stops),
        Just(CacheClass::Routes),
        Just(CacheClass::Eta),
    ]
}

/// Inserts at offsets (ms) from T0.
fn writes_strategy() -> impl Strategy<Value = Vec<(CacheClass, String, Value, u64)>> {
    prop::collection::vec(
        (class_strategy(), key_strategy(), payload_strategy(), 0u64..200_000),
        0..30,
    )
}

fn populated_store(writes: Vec<(CacheClass, String, Value, u64)>) -> CacheStore {
    let mut store = CacheStore::new(CachePolicy::default());
    for (class, key, value, offset) in writes {
        store.insert(class, &key, value, T0 + offset);
    }
    store
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // A fresh entry is invalid; a written entry is valid until exactly max_age has passed.
    #[test]
    fn prop_validity_window(
        class in class_strategy(),
        written_at in 1u64..u64::MAX / 4,
        elapsed in 0u64..100_000_000,
    ) {
        let policy = CachePolicy::default();
        let max_age = policy.max_age(class);
        let max_age_ms = max_age.as_millis() as u64;

        let empty: CacheEntry<Value> = CacheEntry::empty();
        prop_assert!(!empty.is_valid(max_age, written_at + elapsed));

        let entry = CacheEntry::new(json!(null), written_at);
        prop_assert!(entry.is_valid(max_age, written_at));
        prop_assert_eq!(
            entry.is_valid(max_age, written_at + elapsed),
            elapsed < max_age_ms
        );
    }

    // Persisting a snapshot and loading it back yields identical contents and bytes.
    #[test]
    fn prop_snapshot_roundtrip(writes in writes_strategy()) {
        let store = populated_store(writes);
        let snapshot = store.snapshot();

        let mut reloaded = CacheSnapshot::default();
        for class in CacheClass::ALL {
            reloaded.load_blob(class, &snapshot.blob(class).unwrap()).unwrap();
        }

        let mut restored = CacheStore::new(CachePolicy::default());
        restored.restore(reloaded);

        prop_assert_eq!(&restored.snapshot(), &snapshot);
        prop_assert_eq!(restored.snapshot().blobs().unwrap(), snapshot.blobs().unwrap());
    }

    // Sweeping twice with no time passing equals sweeping once.
    #[test]
    fn prop_sweep_idempotent(writes in writes_strategy(), sweep_at in 0u64..300_000) {
        let mut store = populated_store(writes);
        let now = T0 + sweep_at;

        store.sweep_expired(now);
        let once = store.snapshot();
        let removed_again = store.sweep_expired(now);

        prop_assert_eq!(removed_again, 0);
        prop_assert_eq!(store.snapshot(), once);
    }

    // After a sweep every keyed entry left behind is valid.
    #[test]
    fn prop_sweep_leaves_only_valid(writes in writes_strategy(), sweep_at in 0u64..300_000) {
        let mut store = populated_store(writes);
        let now = T0 + sweep_at;
        store.sweep_expired(now);

        let snapshot = store.snapshot();
        for key in snapshot.eta.keys() {
            prop_assert!(store.is_valid(CacheClass::Eta, key, now));
        }
        for key in snapshot.routes.keys() {
            prop_assert!(store.is_valid(CacheClass::Routes, key, now));
        }
    }
}

#[test]
fn test_eta_window_is_ten_seconds() {
    let policy = CachePolicy::default();
    assert_eq!(policy.max_age(CacheClass::Eta), Duration::from_secs(10));
}
