//! FIFO Policy Module
//!
//! Evicts in creation order; reads never reorder.

use std::collections::{BTreeSet, HashMap};

use super::{EvictionPolicy, PolicyKind};
use crate::cache::CacheItem;

// == FIFO Policy ==
/// Orders keys by `(created_at, insertion sequence)`.
#[derive(Debug, Default)]
pub struct FifoPolicy {
    queue: BTreeSet<((u64, u64), String)>,
    positions: HashMap<String, (u64, u64)>,
    next_seq: u64,
}

impl FifoPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    fn forget(&mut self, key: &str) {
        if let Some(pos) = self.positions.remove(key) {
            self.queue.remove(&(pos, key.to_string()));
        }
    }
}

impl EvictionPolicy for FifoPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Fifo
    }

    fn on_insert(&mut self, item: &CacheItem) {
        self.forget(&item.key);
        let pos = (item.created_at, self.next_seq);
        self.next_seq += 1;
        self.positions.insert(item.key.clone(), pos);
        self.queue.insert((pos, item.key.clone()));
    }

    fn on_access(&mut self, _item: &CacheItem) {}

    fn on_remove(&mut self, item: &CacheItem) {
        self.forget(&item.key);
    }

    fn select_victim(&mut self, _now: u64) -> Option<String> {
        self.queue.iter().next().map(|(_, key)| key.clone())
    }

    fn clear(&mut self) {
        self.queue.clear();
        self.positions.clear();
    }

    fn len(&self) -> usize {
        self.positions.len()
    }
}
