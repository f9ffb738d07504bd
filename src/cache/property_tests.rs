//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the cache invariants over random operation
//! sequences.

use proptest::prelude::*;
use std::sync::Arc;

use crate::cache::{Cache, CacheBuilder, CacheConfig, ManualClock, SecurityPolicy};

// == Test Configuration ==
const TEST_MAX_ENTRIES: usize = 100;

// == Strategies ==
/// Generates cache keys from a small alphabet so operations collide often
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-e]{1,2}".prop_map(|s| s)
}

/// Generates cache values of varying length
fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,64}".prop_map(|s| s)
}

/// Generates a sequence of cache operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    Delete { key: String },
    Contains { key: String },
    Advance { millis: u64 },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        3 => (key_strategy(), value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        3 => key_strategy().prop_map(|key| CacheOp::Get { key }),
        1 => key_strategy().prop_map(|key| CacheOp::Delete { key }),
        1 => key_strategy().prop_map(|key| CacheOp::Contains { key }),
        1 => (0u64..1500).prop_map(|millis| CacheOp::Advance { millis }),
    ]
}

fn length_sized(config: CacheConfig, clock: &ManualClock) -> Cache<String, String> {
    CacheBuilder::with_estimator(|value: &String| Some(value.len()))
        .config(config)
        .security(SecurityPolicy::permissive())
        .clock(Arc::new(clock.clone()))
        .build()
        .unwrap()
}

fn apply(cache: &Cache<String, String>, clock: &ManualClock, op: CacheOp) -> Option<bool> {
    match op {
        CacheOp::Set { key, value } => cache.set(key, value),
        CacheOp::Get { key } => return Some(cache.get(&key).is_some()),
        CacheOp::Delete { key } => cache.delete(&key),
        CacheOp::Contains { key } => {
            cache.contains(&key);
        }
        CacheOp::Advance { millis } => clock.advance(std::time::Duration::from_millis(millis)),
    }
    None
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // *For any* sequence of operations, hits + misses equals the number of
    // get calls and each get is classified correctly.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..80)) {
        let clock = ManualClock::new();
        let cache = length_sized(
            CacheConfig::with_max_size(TEST_MAX_ENTRIES).ttl_seconds(1.0),
            &clock,
        );
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match apply(&cache, &clock, op) {
                Some(true) => expected_hits += 1,
                Some(false) => expected_misses += 1,
                None => {}
            }
        }

        let stats = cache.get_stats();
        prop_assert_eq!(stats.cache_hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.cache_misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.cache_size, cache.len(), "Total entries mismatch");
    }

    // *For any* sequence of SET operations, the number of entries never
    // exceeds max_size.
    #[test]
    fn prop_capacity_enforcement(
        entries in prop::collection::vec((key_strategy(), value_strategy()), 1..200),
        max_size in 1usize..8
    ) {
        let clock = ManualClock::new();
        let cache = length_sized(CacheConfig::with_max_size(max_size), &clock);

        for (key, value) in entries {
            cache.set(key, value);
            prop_assert!(
                cache.len() <= max_size,
                "Cache size {} exceeds max {}",
                cache.len(),
                max_size
            );
        }
    }

    // *For any* sequence of operations, the aggregate byte count stays
    // within budget and matches the sum of live values.
    #[test]
    fn prop_byte_budget_enforcement(
        ops in prop::collection::vec(cache_op_strategy(), 1..120),
        budget in 64usize..256
    ) {
        let clock = ManualClock::new();
        let config = CacheConfig::with_max_size(TEST_MAX_ENTRIES)
            .ttl_seconds(1.0)
            .max_content_size_bytes(budget);
        let cache = length_sized(config, &clock);
        let mut model: std::collections::HashMap<String, usize> = Default::default();

        for op in ops {
            if let CacheOp::Set { key, value } = &op {
                model.insert(key.clone(), value.len());
            }
            apply(&cache, &clock, op);

            let stats = cache.get_stats();
            prop_assert!(stats.current_bytes <= budget);
        }

        // Live bytes are the sum over keys still present with their last
        // accepted size; every value fits the budget so no set is rejected.
        cache.cleanup_expired();
        let live: usize = model
            .iter()
            .filter(|(key, _)| cache.contains(key.as_str()))
            .map(|(_, size)| *size)
            .sum();
        prop_assert_eq!(cache.get_stats().current_bytes, live);
        prop_assert_eq!(cache.get_stats().rejections, 0);
    }

    // *For any* key, deleting it twice leaves counters untouched.
    #[test]
    fn prop_delete_is_idempotent(
        key in key_strategy(),
        value in value_strategy(),
        other in key_strategy()
    ) {
        let clock = ManualClock::new();
        let cache = length_sized(CacheConfig::default(), &clock);

        cache.set(key.clone(), value);
        cache.delete(&key);
        let before = cache.get_stats();
        cache.delete(&key);
        cache.delete(&other);
        let after = cache.get_stats();

        prop_assert_eq!(after.cache_hits, before.cache_hits);
        prop_assert_eq!(after.cache_misses, before.cache_misses);
        prop_assert_eq!(after.evictions, before.evictions);
        prop_assert_eq!(after.rejections, before.rejections);
        prop_assert!(!cache.contains(&key));
    }

    // *For any* key-value pair, a value stored and read back within its
    // TTL is the value that was stored.
    #[test]
    fn prop_roundtrip_storage(key in key_strategy(), value in value_strategy()) {
        let clock = ManualClock::new();
        let cache = length_sized(CacheConfig::default().ttl_seconds(1.0), &clock);

        cache.set(key.clone(), value.clone());
        clock.advance(std::time::Duration::from_millis(999));

        prop_assert_eq!(cache.get(&key), Some(value));
    }
}
