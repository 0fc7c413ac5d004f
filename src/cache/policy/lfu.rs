//! LFU Policy Module
//!
//! Evicts the least frequently read key; ties go to the oldest.

use std::collections::{BTreeSet, HashMap};

use super::{EvictionPolicy, PolicyKind};
use crate::cache::CacheItem;

/// Ordering key: (frequency, created_at, insertion sequence).
type Rank = (u64, u64, u64);

// == LFU Policy ==
/// Frequency-ordered tracker.
///
/// Insertion counts as the first use, so a fresh key starts at frequency 1.
#[derive(Debug, Default)]
pub struct LfuPolicy {
    ranked: BTreeSet<(Rank, String)>,
    ranks: HashMap<String, Rank>,
    next_seq: u64,
}

impl LfuPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current frequency of a key, if tracked.
    pub fn frequency(&self, key: &str) -> Option<u64> {
        self.ranks.get(key).map(|rank| rank.0)
    }

    fn forget(&mut self, key: &str) -> Option<Rank> {
        let rank = self.ranks.remove(key)?;
        self.ranked.remove(&(rank, key.to_string()));
        Some(rank)
    }

    fn track(&mut self, key: &str, rank: Rank) {
        self.ranks.insert(key.to_string(), rank);
        self.ranked.insert((rank, key.to_string()));
    }
}

impl EvictionPolicy for LfuPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Lfu
    }

    fn on_insert(&mut self, item: &CacheItem) {
        self.forget(&item.key);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.track(&item.key, (1, item.created_at, seq));
    }

    fn on_access(&mut self, item: &CacheItem) {
        if let Some((freq, created_at, seq)) = self.forget(&item.key) {
            self.track(&item.key, (freq.saturating_add(1), created_at, seq));
        }
    }

    fn on_remove(&mut self, item: &CacheItem) {
        self.forget(&item.key);
    }

    fn select_victim(&mut self, _now: u64) -> Option<String> {
        self.ranked.iter().next().map(|(_, key)| key.clone())
    }

    fn clear(&mut self) {
        self.ranked.clear();
        self.ranks.clear();
    }

    fn len(&self) -> usize {
        self.ranks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(key: &str, created_at: u64) -> CacheItem {
        let mut item = CacheItem::new(key, "v", None);
        item.created_at = created_at;
        item
    }

    #[test]
    fn test_lfu_evicts_least_frequent() {
        let mut lfu = LfuPolicy::new();
        let a = item("a", 1);
        let b = item("b", 2);
        let c = item("c", 3);

        lfu.on_insert(&a);
        lfu.on_insert(&b);
        lfu.on_insert(&c);

        lfu.on_access(&a);
        lfu.on_access(&a);
        lfu.on_access(&c);

        assert_eq!(lfu.frequency("a"), Some(3));
        assert_eq!(lfu.select_victim(0), Some("b".to_string()));
    }

    #[test]
    fn test_lfu_tie_broken_by_created_at() {
        let mut lfu = LfuPolicy::new();
        // Inserted out of creation order
        lfu.on_insert(&item("young", 20));
        lfu.on_insert(&item("old", 10));

        assert_eq!(lfu.select_victim(0), Some("old".to_string()));
    }

    #[test]
    fn test_lfu_tie_broken_by_insertion_order() {
        let mut lfu = LfuPolicy::new();
        lfu.on_insert(&item("first", 5));
        lfu.on_insert(&item("second", 5));

        assert_eq!(lfu.select_victim(0), Some("first".to_string()));
    }

    #[test]
    fn test_lfu_reinsert_resets_frequency() {
        let mut lfu = LfuPolicy::new();
        let a = item("a", 1);
        lfu.on_insert(&a);
        lfu.on_access(&a);
        lfu.on_access(&a);
        lfu.on_insert(&a);

        assert_eq!(lfu.frequency("a"), Some(1));
        assert_eq!(lfu.len(), 1);
    }

    #[test]
    fn test_lfu_remove() {
        let mut lfu = LfuPolicy::new();
        let a = item("a", 1);
        let b = item("b", 2);
        lfu.on_insert(&a);
        lfu.on_insert(&b);

        lfu.on_remove(&a);
        assert_eq!(lfu.select_victim(0), Some("b".to_string()));

        // Access on an untracked key is ignored
        lfu.on_access(&a);
        assert_eq!(lfu.len(), 1);
    }
}
