//! TTL Policy Module
//!
//! Prefers keys that have already expired; otherwise behaves like FIFO.
//! Proactive removal of expired keys is the janitor's job, this policy only
//! covers the case where a tier fills up between sweeps.

use std::collections::{BTreeSet, HashMap};

use super::{EvictionPolicy, FifoPolicy, PolicyKind};
use crate::cache::CacheItem;

// == TTL Policy ==
#[derive(Debug, Default)]
pub struct TtlPolicy {
    /// Keys with an expiry, ordered by (expires_at, insertion sequence)
    deadlines: BTreeSet<((u64, u64), String)>,
    positions: HashMap<String, (u64, u64)>,
    next_seq: u64,
    fallback: FifoPolicy,
}

impl TtlPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    fn forget(&mut self, key: &str) {
        if let Some(pos) = self.positions.remove(key) {
            self.deadlines.remove(&(pos, key.to_string()));
        }
    }
}

impl EvictionPolicy for TtlPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Ttl
    }

    fn on_insert(&mut self, item: &CacheItem) {
        self.forget(&item.key);
        if let Some(expires_at) = item.expires_at {
            let pos = (expires_at, self.next_seq);
            self.next_seq += 1;
            self.positions.insert(item.key.clone(), pos);
            self.deadlines.insert((pos, item.key.clone()));
        }
        self.fallback.on_insert(item);
    }

    fn on_access(&mut self, _item: &CacheItem) {}

    fn on_remove(&mut self, item: &CacheItem) {
        self.forget(&item.key);
        self.fallback.on_remove(item);
    }

    fn select_victim(&mut self, now: u64) -> Option<String> {
        match self.deadlines.iter().next() {
            Some(((expires_at, _), key)) if *expires_at <= now => Some(key.clone()),
            _ => self.fallback.select_victim(now),
        }
    }

    fn clear(&mut self) {
        self.deadlines.clear();
        self.positions.clear();
        self.fallback.clear();
    }

    fn len(&self) -> usize {
        self.fallback.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(key: &str, created_at: u64, expires_at: Option<u64>) -> CacheItem {
        let mut item = CacheItem::with_expiry(key, "v", expires_at);
        item.created_at = created_at;
        item
    }

    #[test]
    fn test_ttl_prefers_expired() {
        let mut ttl = TtlPolicy::new();
        ttl.on_insert(&item("old", 1, None));
        ttl.on_insert(&item("stale", 5, Some(100)));

        assert_eq!(ttl.select_victim(150), Some("stale".to_string()));
    }

    #[test]
    fn test_ttl_falls_back_to_fifo() {
        let mut ttl = TtlPolicy::new();
        ttl.on_insert(&item("old", 1, None));
        ttl.on_insert(&item("fresh", 5, Some(1_000)));

        assert_eq!(ttl.select_victim(150), Some("old".to_string()));
    }

    #[test]
    fn test_ttl_earliest_deadline_first() {
        let mut ttl = TtlPolicy::new();
        ttl.on_insert(&item("b", 1, Some(200)));
        ttl.on_insert(&item("a", 2, Some(100)));

        assert_eq!(ttl.select_victim(500), Some("a".to_string()));

        ttl.on_remove(&item("a", 2, Some(100)));
        assert_eq!(ttl.select_victim(500), Some("b".to_string()));
        assert_eq!(ttl.len(), 1);
    }
}
