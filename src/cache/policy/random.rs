//! Random Policy Module

use std::collections::HashMap;
use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use super::{EvictionPolicy, PolicyKind};
use crate::cache::CacheItem;

// == Random Policy ==
/// Uniform victim selection over the current members.
///
/// Members live in a dense vector with swap-remove so selection and removal
/// are O(1). The random source is injectable for reproducible tests.
pub struct RandomPolicy {
    keys: Vec<String>,
    index: HashMap<String, usize>,
    rng: Box<dyn RngCore + Send>,
}

impl RandomPolicy {
    /// Seeds from the operating system.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic sequence for a given seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(rng: impl RngCore + Send + 'static) -> Self {
        Self {
            keys: Vec::new(),
            index: HashMap::new(),
            rng: Box::new(rng),
        }
    }
}

impl Default for RandomPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RandomPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomPolicy")
            .field("keys", &self.keys.len())
            .finish()
    }
}

impl EvictionPolicy for RandomPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Random
    }

    fn on_insert(&mut self, item: &CacheItem) {
        if !self.index.contains_key(&item.key) {
            self.index.insert(item.key.clone(), self.keys.len());
            self.keys.push(item.key.clone());
        }
    }

    fn on_access(&mut self, _item: &CacheItem) {}

    fn on_remove(&mut self, item: &CacheItem) {
        if let Some(pos) = self.index.remove(&item.key) {
            self.keys.swap_remove(pos);
            if let Some(moved) = self.keys.get(pos) {
                self.index.insert(moved.clone(), pos);
            }
        }
    }

    fn select_victim(&mut self, _now: u64) -> Option<String> {
        if self.keys.is_empty() {
            return None;
        }
        let pos = self.rng.gen_range(0..self.keys.len());
        Some(self.keys[pos].clone())
    }

    fn clear(&mut self) {
        self.keys.clear();
        self.index.clear();
    }

    fn len(&self) -> usize {
        self.keys.len()
    }
}
