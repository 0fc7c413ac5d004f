//! Cache Tier Module
//!
//! One capacity-bounded store: a hash index, an eviction policy, an ordered
//! expiry index and the byte/item budget. Every mutation updates the index,
//! the policy and the budget together under the caller's lock.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::events::{CacheEvent, EventBus};
use crate::cache::item::current_timestamp_ms;
use crate::cache::policy::{EvictionPolicy, PolicyKind};
use crate::cache::stats::TierStats;
use crate::cache::CacheItem;
use crate::error::{CacheError, Result};

/// A tier shared between the chain, the facade and the janitor.
pub type SharedTier = Arc<Mutex<CacheTier>>;

// == Tier Config ==
/// Limits and policy for one in-process tier.
#[derive(Debug, Clone, PartialEq)]
pub struct TierConfig {
    pub name: String,
    pub policy: PolicyKind,
    pub max_items: usize,
    pub max_size_bytes: u64,
    /// Seed for the random policy; ignored by the others
    pub seed: Option<u64>,
}

impl TierConfig {
    pub fn new(
        name: impl Into<String>,
        policy: PolicyKind,
        max_items: usize,
        max_size_bytes: u64,
    ) -> Self {
        Self {
            name: name.into(),
            policy,
            max_items,
            max_size_bytes,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

// == Lookup ==
/// Outcome of a read against a single tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Hit(CacheItem),
    Miss,
    /// Present but expired; removed as a side effect
    Expired,
    /// Present but failed verification; purged as a side effect
    Corrupt,
}

impl Lookup {
    pub fn into_item(self) -> Option<CacheItem> {
        match self {
            Lookup::Hit(item) => Some(item),
            _ => None,
        }
    }
}

// == Cache Tier ==
#[derive(Debug)]
pub struct CacheTier {
    name: String,
    /// Key-value storage
    items: HashMap<String, CacheItem>,
    /// Victim selection
    policy: Box<dyn EvictionPolicy>,
    /// (expires_at, key) for every item with a TTL
    expiry: BTreeSet<(u64, String)>,
    max_items: usize,
    max_size_bytes: u64,
    current_size_bytes: u64,
    stats: Arc<TierStats>,
    events: EventBus,
}

impl CacheTier {
    // == Constructor ==
    pub fn new(config: &TierConfig, stats: Arc<TierStats>, events: EventBus) -> Self {
        Self::with_policy(config, config.policy.build(config.seed), stats, events)
    }

    /// Builds a tier around an already constructed policy.
    pub fn with_policy(
        config: &TierConfig,
        policy: Box<dyn EvictionPolicy>,
        stats: Arc<TierStats>,
        events: EventBus,
    ) -> Self {
        Self {
            name: config.name.clone(),
            items: HashMap::new(),
            policy,
            expiry: BTreeSet::new(),
            max_items: config.max_items,
            max_size_bytes: config.max_size_bytes,
            current_size_bytes: 0,
            stats,
            events,
        }
    }

    /// Wraps the tier for sharing.
    pub fn shared(self) -> SharedTier {
        Arc::new(Mutex::new(self))
    }

    // == Lookup ==
    /// Reads a key, applying lazy expiry and integrity checks.
    ///
    /// A hit updates `last_accessed_at`, `access_count` and the policy.
    /// Hits and misses are recorded in the tier's stats.
    pub fn lookup(&mut self, key: &str) -> Lookup {
        let now = current_timestamp_ms();
        let state = self
            .items
            .get(key)
            .map(|item| (item.is_expired_at(now), item.verify()));

        match state {
            None => {}
            Some((true, _)) => self.expire(key),
            Some((false, false)) => self.purge_corrupt(key),
            Some((false, true)) => {
                if let Some(item) = self.items.get_mut(key) {
                    item.touch(now);
                    let snapshot = item.clone();
                    self.policy.on_access(&snapshot);
                    self.stats.record_hit();
                    return Lookup::Hit(snapshot);
                }
            }
        }

        self.stats.record_miss();
        match state {
            Some((true, _)) => Lookup::Expired,
            Some((false, false)) => Lookup::Corrupt,
            _ => Lookup::Miss,
        }
    }

    // == Get ==
    /// Returns the item if present and live.
    pub fn get(&mut self, key: &str) -> Option<CacheItem> {
        self.lookup(key).into_item()
    }

    // == Has ==
    /// Presence check honouring lazy expiry and integrity. Does not count as
    /// an access; expired or corrupt items are removed as with `lookup`.
    pub fn has(&mut self, key: &str) -> bool {
        self.settle(key, current_timestamp_ms())
    }

    /// Read without any side effect.
    pub fn peek(&self, key: &str) -> Option<&CacheItem> {
        self.items.get(key)
    }

    // == Insert ==
    /// Stores an item, evicting until it fits.
    ///
    /// An existing item under the same key is replaced (not counted as an
    /// eviction). Returns the evicted items so the caller can demote them.
    pub fn insert(&mut self, item: CacheItem) -> Result<Vec<CacheItem>> {
        if self.max_items == 0 || item.size_bytes > self.max_size_bytes {
            return Err(CacheError::Validation(format!(
                "item '{}' ({} bytes) does not fit in tier {} ({} bytes, {} items)",
                item.key, item.size_bytes, self.name, self.max_size_bytes, self.max_items
            )));
        }

        self.remove_entry(&item.key);

        let now = current_timestamp_ms();
        let mut evicted = Vec::new();
        while self.items.len() + 1 > self.max_items
            || self.current_size_bytes + item.size_bytes > self.max_size_bytes
        {
            let victim = match self.policy.select_victim(now) {
                Some(victim) => victim,
                None => {
                    return Err(CacheError::Internal(format!(
                        "tier {} is over budget but its policy has no victim",
                        self.name
                    )))
                }
            };

            match self.remove_entry(&victim) {
                Some(removed) => {
                    debug!(tier = %self.name, key = %victim, "evicted");
                    self.stats.record_eviction();
                    self.events.emit(CacheEvent::Evicted {
                        tier: self.name.clone(),
                        key: victim,
                    });
                    evicted.push(removed);
                }
                None => {
                    return Err(CacheError::Internal(format!(
                        "policy of tier {} selected untracked key '{}'",
                        self.name, victim
                    )))
                }
            }
        }

        if let Some(expires_at) = item.expires_at {
            self.expiry.insert((expires_at, item.key.clone()));
        }
        self.current_size_bytes += item.size_bytes;
        self.policy.on_insert(&item);
        self.items.insert(item.key.clone(), item);
        self.publish_occupancy();

        Ok(evicted)
    }

    /// Stores `item` only when the tier holds no live copy of its key.
    ///
    /// The check and the insert happen under the same borrow, so a copy
    /// arriving late (promotion) never replaces a value written meanwhile.
    /// Returns `None` when a live copy was kept.
    pub fn insert_if_absent(&mut self, item: CacheItem) -> Result<Option<Vec<CacheItem>>> {
        if self.settle(&item.key, current_timestamp_ms()) {
            return Ok(None);
        }
        self.insert(item).map(Some)
    }

    // == Delete ==
    /// Removes a key, returning whether it was present.
    pub fn delete(&mut self, key: &str) -> bool {
        self.remove_entry(key).is_some()
    }

    // == Purge Expired ==
    /// Removes up to `limit` items whose TTL elapsed at `now`, earliest first.
    ///
    /// Returns the removed keys.
    pub fn purge_expired(&mut self, now: u64, limit: usize) -> Vec<String> {
        let due: Vec<String> = self
            .expiry
            .iter()
            .take_while(|(expires_at, _)| *expires_at <= now)
            .take(limit)
            .map(|(_, key)| key.clone())
            .collect();

        for key in &due {
            self.expire(key);
        }
        due
    }

    /// Earliest pending expiry, if any.
    pub fn next_expiry(&self) -> Option<u64> {
        self.expiry.iter().next().map(|(expires_at, _)| *expires_at)
    }

    // == Clear ==
    /// Drops every item. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let count = self.items.len();
        self.items.clear();
        self.expiry.clear();
        self.policy.clear();
        self.current_size_bytes = 0;
        self.publish_occupancy();
        count
    }

    /// Clones every live item, oldest first by creation time.
    pub fn live_items(&self) -> Vec<CacheItem> {
        let now = current_timestamp_ms();
        let mut items: Vec<CacheItem> = self
            .items
            .values()
            .filter(|item| !item.is_expired_at(now))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.key.cmp(&b.key)));
        items
    }

    // == Accessors ==
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    pub fn size_bytes(&self) -> u64 {
        self.current_size_bytes
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    pub fn policy_kind(&self) -> PolicyKind {
        self.policy.kind()
    }

    pub fn stats(&self) -> &Arc<TierStats> {
        &self.stats
    }

    /// True when `key` holds a live, verified item. Expired and corrupt
    /// items are removed on the way.
    fn settle(&mut self, key: &str, now: u64) -> bool {
        let state = self
            .items
            .get(key)
            .map(|item| (item.is_expired_at(now), item.verify()));

        match state {
            None => false,
            Some((true, _)) => {
                self.expire(key);
                false
            }
            Some((false, false)) => {
                self.purge_corrupt(key);
                false
            }
            Some((false, true)) => true,
        }
    }

    fn purge_corrupt(&mut self, key: &str) {
        if self.remove_entry(key).is_some() {
            self.stats.record_integrity_failure();
            self.events.emit(CacheEvent::IntegrityFailure {
                tier: self.name.clone(),
                key: key.to_string(),
            });
        }
    }

    fn expire(&mut self, key: &str) {
        if self.remove_entry(key).is_some() {
            self.stats.record_expiration();
            self.events.emit(CacheEvent::Expired {
                tier: self.name.clone(),
                key: key.to_string(),
            });
        }
    }

    fn remove_entry(&mut self, key: &str) -> Option<CacheItem> {
        let item = self.items.remove(key)?;
        if let Some(expires_at) = item.expires_at {
            self.expiry.remove(&(expires_at, item.key.clone()));
        }
        self.current_size_bytes -= item.size_bytes;
        self.policy.on_remove(&item);
        self.publish_occupancy();
        Some(item)
    }

    fn publish_occupancy(&self) {
        self.stats
            .set_occupancy(self.items.len(), self.current_size_bytes);
    }

    /// Flips stored bytes without updating the checksum.
    #[cfg(test)]
    pub(crate) fn corrupt(&mut self, key: &str) {
        if let Some(item) = self.items.get_mut(key) {
            let mut bytes = item.value.to_vec();
            bytes.push(0xFF);
            item.value = bytes.into();
        }
    }
}
