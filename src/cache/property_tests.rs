//! Property-Based Tests for Cache Module
//!
//! Uses proptest to verify the cache's capacity, expiry, invalidation and
//! eviction-order guarantees over generated operation sequences.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::time::Duration;

use crate::cache::{AccessOp, CacheManager, Priority, SetOptions};

// == Test Configuration ==
const TEST_MAX_ENTRIES: usize = 100;
const TEST_DEFAULT_TTL: Duration = Duration::from_secs(300);
const TAGS: [&str; 4] = ["friends", "activities", "messages", "user"];

// == Strategies ==
/// Generates valid cache keys
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9:_]{1,32}".prop_map(|s| s)
}

/// Generates JSON payloads, some above the encoding threshold
fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(|n| json!(n)),
        "[a-zA-Z0-9 ]{0,64}".prop_map(|s| json!({ "name": s })),
        (1500usize..3000).prop_map(|n| json!({ "bio": "z".repeat(n) })),
    ]
}

fn priority_strategy() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Critical),
        Just(Priority::High),
        Just(Priority::Normal),
        Just(Priority::Low),
        Just(Priority::Background),
    ]
}

fn tags_strategy() -> impl Strategy<Value = HashSet<String>> {
    prop::collection::hash_set(prop::sample::select(TAGS.to_vec()), 0..3)
        .prop_map(|set| set.into_iter().map(String::from).collect())
}

/// Cache operations for sequence tests
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: Value, tags: HashSet<String> },
    Get { key: String },
    Delete { key: String },
    Invalidate { tag: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), value_strategy(), tags_strategy())
            .prop_map(|(key, value, tags)| CacheOp::Set { key, value, tags }),
        valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Delete { key }),
        prop::sample::select(TAGS.to_vec()).prop_map(|tag| CacheOp::Invalidate {
            tag: tag.to_string()
        }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Hit and miss counters match the observed get results.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let mut store = CacheManager::new(TEST_MAX_ENTRIES, TEST_DEFAULT_TTL);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value, tags } => {
                    store.set(key, value, SetOptions { tags: Some(tags), ..Default::default() });
                }
                CacheOp::Get { key } => match store.get(&key) {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::Delete { key } => {
                    store.delete(&key);
                }
                CacheOp::Invalidate { tag } => {
                    store.invalidate_by_tags(&[tag]);
                }
            }
        }

        let stats = store.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.total_entries, store.len(), "Total entries mismatch");
    }

    // Stored values come back unchanged whether or not they were encoded.
    #[test]
    fn prop_value_survives_storage(key in valid_key_strategy(), value in value_strategy()) {
        let mut store = CacheManager::new(TEST_MAX_ENTRIES, TEST_DEFAULT_TTL);
        store.set(key.clone(), value.clone(), SetOptions::new());
        prop_assert_eq!(store.get(&key), Some(value));
    }

    // The cache never holds more than its capacity.
    #[test]
    fn prop_capacity_enforcement(
        max_entries in 1usize..60,
        entries in prop::collection::vec(
            (valid_key_strategy(), priority_strategy()),
            1..200
        )
    ) {
        let mut store = CacheManager::new(max_entries, TEST_DEFAULT_TTL);

        for (key, priority) in entries {
            store.set(key, json!(1), SetOptions::new().priority(priority));
            prop_assert!(
                store.len() <= max_entries,
                "Cache size {} exceeds max {}",
                store.len(),
                max_entries
            );
        }
    }

    // Tag invalidation removes exactly the entries carrying the tag.
    #[test]
    fn prop_tag_invalidation_is_exact(
        entries in prop::collection::hash_map(valid_key_strategy(), tags_strategy(), 1..40),
        tag in prop::sample::select(TAGS.to_vec())
    ) {
        let mut store = CacheManager::new(TEST_MAX_ENTRIES, TEST_DEFAULT_TTL);
        for (key, tags) in &entries {
            store.set(key.clone(), json!(key), SetOptions { tags: Some(tags.clone()), ..Default::default() });
        }

        let tagged = entries.values().filter(|tags| tags.contains(tag)).count();
        let removed = store.invalidate_by_tags(&[tag]);
        prop_assert_eq!(removed, tagged);

        for (key, tags) in &entries {
            let present = store.entry(key).is_some();
            prop_assert_eq!(present, !tags.contains(tag), "key {} tags {:?}", key, tags);
        }
    }

    // Reads at or after expires_at miss and drop the entry.
    #[test]
    fn prop_ttl_expiration_behavior(
        key in valid_key_strategy(),
        ttl_ms in 0u64..10_000,
        overshoot in 0u64..10_000
    ) {
        let mut store = CacheManager::new(TEST_MAX_ENTRIES, TEST_DEFAULT_TTL);
        let start = 1_000_000;
        store.set_at(
            key.clone(),
            json!("v"),
            SetOptions::new().ttl(Duration::from_millis(ttl_ms)),
            start,
            AccessOp::Set,
        );

        let entry = store.entry(&key).unwrap();
        prop_assert!(entry.expires_at >= entry.created_at);

        if ttl_ms > 0 {
            prop_assert!(store.get_at(&key, start + ttl_ms - 1).is_some());
        }
        prop_assert!(store.get_at(&key, start + ttl_ms + overshoot).is_none());
        prop_assert!(store.entry(&key).is_none());
    }

    // With equal priority and access counts, the least recently used
    // entries are evicted first.
    #[test]
    fn prop_eviction_order_by_recency(capacity in 5usize..40) {
        let mut store = CacheManager::new(capacity, TEST_DEFAULT_TTL);
        for i in 0..capacity {
            store.set_at(format!("k{}", i), json!(i), SetOptions::new(), (i as u64) * 1_000, AccessOp::Set);
        }

        let now = capacity as u64 * 1_000;
        store.set_at("incoming".to_string(), json!(0), SetOptions::new(), now, AccessOp::Set);

        let batch = store.eviction_batch_size().min(capacity);
        for i in 0..capacity {
            let present = store.entry(&format!("k{}", i)).is_some();
            prop_assert_eq!(present, i >= batch, "k{} presence", i);
        }
    }

    // Under equal recency, lower priorities are evicted first.
    #[test]
    fn prop_eviction_order_by_priority(priorities in prop::collection::vec(priority_strategy(), 5..30)) {
        let capacity = priorities.len();
        let mut store = CacheManager::new(capacity, TEST_DEFAULT_TTL);
        for (i, priority) in priorities.iter().enumerate() {
            store.set_at(format!("k{}", i), json!(i), SetOptions::new().priority(*priority), 0, AccessOp::Set);
        }

        store.set_at("incoming".to_string(), json!(0), SetOptions::new(), 10, AccessOp::Set);

        let survivors: Vec<f64> = (0..capacity)
            .filter(|i| store.entry(&format!("k{}", i)).is_some())
            .map(|i| priorities[i].score())
            .collect();
        let evicted: Vec<f64> = (0..capacity)
            .filter(|i| store.entry(&format!("k{}", i)).is_none())
            .map(|i| priorities[i].score())
            .collect();

        let min_survivor = survivors.iter().cloned().fold(f64::INFINITY, f64::min);
        let max_evicted = evicted.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(max_evicted <= min_survivor);
    }
}
