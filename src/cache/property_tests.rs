//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check round-trips, budget limits, LRU ordering and
//! statistics against simple reference models.

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::cache::events::EventBus;
use crate::cache::policy::PolicyKind;
use crate::cache::stats::TierStats;
use crate::cache::tier::{CacheTier, TierConfig};
use crate::cache::{CacheItem, TieredCache, MAX_KEY_LENGTH};

// == Strategies ==
/// Generates valid cache keys (non-empty, within length limit)
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,64}"
}

/// Small key space so operations collide
fn small_key_strategy() -> impl Strategy<Value = String> {
    "[a-f]{1,2}"
}

fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,256}"
}

fn policy_strategy() -> impl Strategy<Value = PolicyKind> {
    prop_oneof![
        Just(PolicyKind::Lru),
        Just(PolicyKind::Lfu),
        Just(PolicyKind::Fifo),
        Just(PolicyKind::Random),
        Just(PolicyKind::Ttl),
    ]
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (small_key_strategy(), valid_value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        small_key_strategy().prop_map(|key| CacheOp::Get { key }),
        small_key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

fn tier(policy: PolicyKind, max_items: usize, max_bytes: u64) -> CacheTier {
    let config = TierConfig::new("L1", policy, max_items, max_bytes).with_seed(7);
    CacheTier::new(&config, Arc::new(TierStats::new("L1", 8)), EventBus::new())
}

fn facade(max_items: usize) -> TieredCache {
    TieredCache::builder()
        .tier(TierConfig::new("L1", PolicyKind::Lru, max_items, 1 << 24))
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Any valid (key, value, ttl > 0) written is read back unchanged.
    #[test]
    fn prop_roundtrip(
        key in valid_key_strategy(),
        value in valid_value_strategy(),
        ttl_secs in 1u64..3600,
    ) {
        let cache = facade(100);
        tokio_test::block_on(async {
            cache.set(&key, value.clone(), Some(Duration::from_secs(ttl_secs))).await.unwrap();
            let got = cache.get(&key).await.unwrap();
            prop_assert_eq!(got, Some(Bytes::from(value)));
            Ok::<(), TestCaseError>(())
        })?;
    }

    // Keys above the length limit are rejected and leave no trace.
    #[test]
    fn prop_oversized_key_rejected(extra in 1usize..64) {
        let cache = facade(100);
        let key = "k".repeat(MAX_KEY_LENGTH + extra);
        tokio_test::block_on(async {
            prop_assert!(cache.set(&key, "v", None).await.is_err());
            prop_assert_eq!(cache.tier_len(0), Some(0));
            Ok::<(), TestCaseError>(())
        })?;
    }

    // Item count and byte budget hold after every insert, for every policy.
    #[test]
    fn prop_budget_invariant(
        policy in policy_strategy(),
        max_items in 1usize..8,
        max_bytes in 64u64..512,
        writes in prop::collection::vec((small_key_strategy(), 1usize..60), 1..60),
    ) {
        let mut tier = tier(policy, max_items, max_bytes);
        for (key, len) in writes {
            let _ = tier.insert(CacheItem::new(key, "x".repeat(len), None));
            prop_assert!(tier.len() <= max_items);
            prop_assert!(tier.size_bytes() <= max_bytes);

            let snapshot = tier.stats().snapshot();
            prop_assert_eq!(snapshot.item_count, tier.len() as u64);
            prop_assert_eq!(snapshot.size_bytes, tier.size_bytes());
        }
    }

    // LRU matches a reference recency queue.
    #[test]
    fn prop_lru_matches_model(
        capacity in 1usize..6,
        ops in prop::collection::vec((any::<bool>(), small_key_strategy()), 1..80),
    ) {
        let mut tier = tier(PolicyKind::Lru, capacity, 1 << 20);
        let mut model: VecDeque<String> = VecDeque::new();

        for (is_set, key) in ops {
            if is_set {
                tier.insert(CacheItem::new(key.clone(), "v", None)).unwrap();
                model.retain(|k| k != &key);
                model.push_back(key);
                if model.len() > capacity {
                    model.pop_front();
                }
            } else {
                let hit = tier.get(&key).is_some();
                let in_model = model.contains(&key);
                prop_assert_eq!(hit, in_model);
                if in_model {
                    model.retain(|k| k != &key);
                    model.push_back(key);
                }
            }
        }

        prop_assert_eq!(tier.len(), model.len());
        for key in &model {
            prop_assert!(tier.contains_key(key));
        }
    }

    // Facade statistics agree with a reference map of what is stored.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let cache = facade(1000);
        let mut model: HashMap<String, String> = HashMap::new();
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        tokio_test::block_on(async {
            for op in ops {
                match op {
                    CacheOp::Set { key, value } => {
                        cache.set(&key, value.clone(), None).await.unwrap();
                        model.insert(key, value);
                    }
                    CacheOp::Get { key } => {
                        let got = cache.get(&key).await.unwrap();
                        match model.get(&key) {
                            Some(value) => {
                                expected_hits += 1;
                                prop_assert_eq!(got, Some(Bytes::from(value.clone())));
                            }
                            None => {
                                expected_misses += 1;
                                prop_assert_eq!(got, None);
                            }
                        }
                    }
                    CacheOp::Delete { key } => {
                        let removed = cache.delete(&key).await.unwrap();
                        prop_assert_eq!(removed, model.remove(&key).is_some());
                    }
                }
            }
            Ok::<(), TestCaseError>(())
        })?;

        let stats = cache.get_statistics();
        prop_assert_eq!(stats.total_hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.total_misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.total_items, model.len() as u64, "Item count mismatch");
        let lookups = expected_hits + expected_misses;
        if lookups > 0 {
            prop_assert_eq!(stats.hit_rate, expected_hits as f64 / lookups as f64);
        }
    }
}
