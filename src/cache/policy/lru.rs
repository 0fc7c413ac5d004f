//! LRU Policy Module
//!
//! Implements Least Recently Used tracking for cache eviction.

use std::collections::HashMap;

use super::{EvictionPolicy, PolicyKind};
use crate::cache::slab::LinkedSlab;
use crate::cache::CacheItem;

// == LRU Policy ==
/// Tracks access order for LRU eviction.
///
/// Keys live in a [`LinkedSlab`] where:
/// - Front = Most recently used
/// - Back = Least recently used
#[derive(Debug, Default)]
pub struct LruPolicy {
    /// Recency order
    order: LinkedSlab<String>,
    /// Key to slot index in `order`
    slots: HashMap<String, usize>,
}

impl LruPolicy {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most recently used, adding it if untracked.
    pub fn touch(&mut self, key: &str) {
        match self.slots.get(key) {
            Some(&idx) => self.order.move_to_front(idx),
            None => {
                let idx = self.order.push_front(key.to_string());
                self.slots.insert(key.to_string(), idx);
            }
        }
    }

    // == Remove ==
    pub fn remove(&mut self, key: &str) {
        if let Some(idx) = self.slots.remove(key) {
            self.order.remove(idx);
        }
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&String> {
        self.order.back().map(|(_, key)| key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }
}

impl EvictionPolicy for LruPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Lru
    }

    fn on_insert(&mut self, item: &CacheItem) {
        self.touch(&item.key);
    }

    fn on_access(&mut self, item: &CacheItem) {
        self.touch(&item.key);
    }

    fn on_remove(&mut self, item: &CacheItem) {
        self.remove(&item.key);
    }

    fn select_victim(&mut self, _now: u64) -> Option<String> {
        self.peek_oldest().cloned()
    }

    fn clear(&mut self) {
        self.order.clear();
        self.slots.clear();
    }

    fn len(&self) -> usize {
        self.slots.len()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn evict(lru: &mut LruPolicy) -> Option<String> {
        let victim = lru.select_victim(0)?;
        lru.remove(&victim);
        Some(victim)
    }

    #[test]
    fn test_lru_new() {
        let lru = LruPolicy::new();
        assert!(lru.is_empty());
        assert_eq!(lru.peek_oldest(), None);
    }

    #[test]
    fn test_lru_touch_existing_key() {
        let mut lru = LruPolicy::new();

        lru.touch("key1");
        lru.touch("key2");
        lru.touch("key3");

        // Touch key1 again - should move to front
        lru.touch("key1");

        assert_eq!(lru.len(), 3);
        assert_eq!(lru.peek_oldest(), Some(&"key2".to_string()));
    }

    #[test]
    fn test_lru_remove() {
        let mut lru = LruPolicy::new();

        lru.touch("key1");
        lru.touch("key2");
        lru.touch("key3");

        lru.remove("key2");
        lru.remove("nonexistent");

        assert_eq!(lru.len(), 2);
        assert!(!lru.contains("key2"));
        assert!(lru.contains("key1"));
        assert!(lru.contains("key3"));
    }

    #[test]
    fn test_lru_order_after_multiple_touches() {
        let mut lru = LruPolicy::new();

        // touch(a), touch(b), touch(c) -> [c, b, a]
        lru.touch("a");
        lru.touch("b");
        lru.touch("c");

        // touch(a) -> [a, c, b]; touch(c) -> [c, a, b]; touch(b) -> [b, c, a]
        lru.touch("a");
        lru.touch("c");
        lru.touch("b");

        assert_eq!(evict(&mut lru), Some("a".to_string()));
        assert_eq!(evict(&mut lru), Some("c".to_string()));
        assert_eq!(evict(&mut lru), Some("b".to_string()));
        assert_eq!(evict(&mut lru), None);
    }

    #[test]
    fn test_lru_touch_same_key_multiple_times() {
        let mut lru = LruPolicy::new();

        lru.touch("key1");
        lru.touch("key1");
        lru.touch("key1");

        assert_eq!(lru.len(), 1);
        assert_eq!(evict(&mut lru), Some("key1".to_string()));
        assert!(lru.is_empty());
    }

    #[test]
    fn test_lru_policy_hooks() {
        let mut lru = LruPolicy::new();
        let a = CacheItem::new("a", "1", None);
        let b = CacheItem::new("b", "2", None);

        lru.on_insert(&a);
        lru.on_insert(&b);
        lru.on_access(&a);

        assert_eq!(lru.select_victim(0), Some("b".to_string()));

        lru.on_remove(&b);
        assert_eq!(lru.select_victim(0), Some("a".to_string()));

        lru.clear();
        assert_eq!(lru.select_victim(0), None);
    }
}
