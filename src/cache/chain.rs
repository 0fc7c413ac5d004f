//! Tier Chain Module
//!
//! Ordered levels, fastest first. Reads descend until the first hit and copy
//! the item into every faster level; writes land on one level and optionally
//! fan out (write-through) or cascade evictions downward (write-back).
//!
//! Locks are taken one level at a time in chain order and are never held
//! across an await.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::cache::backend::RemoteTier;
use crate::cache::events::{CacheEvent, EventBus};
use crate::cache::stats::TierStats;
use crate::cache::tier::SharedTier;
use crate::cache::CacheItem;
use crate::error::{CacheError, Result};

// == Tier Level ==
/// One position in the chain.
#[derive(Debug, Clone)]
pub enum TierLevel {
    /// In-process tier guarded by its own lock
    Local(SharedTier),
    /// Tier reached through a `CacheBackend`
    Remote(RemoteTier),
}

impl TierLevel {
    /// Takes the tier lock for local levels; the chain caches both values.
    pub fn name(&self) -> String {
        match self {
            TierLevel::Local(tier) => tier.lock().name().to_string(),
            TierLevel::Remote(remote) => remote.name().to_string(),
        }
    }

    pub fn stats(&self) -> Arc<TierStats> {
        match self {
            TierLevel::Local(tier) => tier.lock().stats().clone(),
            TierLevel::Remote(remote) => remote.stats().clone(),
        }
    }
}

// == Chain Options ==
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChainOptions {
    /// Propagate every write to all slower levels
    pub write_through: bool,
    /// Demote evicted items into the next slower level
    pub write_back: bool,
}

// == Tier Chain ==
#[derive(Debug)]
pub struct TierChain {
    levels: Vec<TierLevel>,
    /// Level names and stats, resolved once so hot paths skip the tier locks
    names: Vec<String>,
    stats: Vec<Arc<TierStats>>,
    options: ChainOptions,
    events: EventBus,
}

impl TierChain {
    pub fn new(levels: Vec<TierLevel>, options: ChainOptions, events: EventBus) -> Self {
        let names = levels.iter().map(TierLevel::name).collect();
        let stats = levels.iter().map(TierLevel::stats).collect();
        Self {
            levels,
            names,
            stats,
            options,
            events,
        }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level(&self, index: usize) -> Option<&TierLevel> {
        self.levels.get(index)
    }

    pub fn level_name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn level_stats(&self, index: usize) -> Option<&Arc<TierStats>> {
        self.stats.get(index)
    }

    pub fn options(&self) -> ChainOptions {
        self.options
    }

    /// In-process tiers in chain order, for the janitor.
    pub fn local_tiers(&self) -> Vec<SharedTier> {
        self.levels
            .iter()
            .filter_map(|level| match level {
                TierLevel::Local(tier) => Some(tier.clone()),
                TierLevel::Remote(_) => None,
            })
            .collect()
    }

    // == Get ==
    /// Finds the fastest live copy of `key`.
    ///
    /// Returns the level index that served the read and the item. A hit
    /// below level 0 promotes a fresh copy into every faster level.
    pub async fn get(&self, key: &str) -> Option<(usize, CacheItem)> {
        for (index, level) in self.levels.iter().enumerate() {
            let found = match level {
                TierLevel::Local(tier) => local_get(tier, key),
                TierLevel::Remote(remote) => remote.get(key).await,
            };

            if let Some(item) = found {
                if index > 0 {
                    self.promote(index, &item).await;
                }
                return Some((index, item));
            }
        }
        None
    }

    // == Set ==
    /// Writes `item` into level `target`.
    ///
    /// Copies in faster levels are invalidated so they cannot shadow the new
    /// value. Fan-out to slower levels is best-effort.
    pub async fn set(&self, item: CacheItem, target: usize) -> Result<()> {
        let level = self.levels.get(target).ok_or_else(|| {
            CacheError::Validation(format!(
                "tier index {} out of range (chain has {} tiers)",
                target,
                self.levels.len()
            ))
        })?;

        self.write_level(target, level, item.clone()).await?;

        for faster in &self.levels[..target] {
            self.delete_level(faster, &item.key).await;
        }

        if self.options.write_through {
            for (index, slower) in self.levels.iter().enumerate().skip(target + 1) {
                if let Err(err) = self.write_level(index, slower, item.clone()).await {
                    warn!(
                        tier = %self.names[index],
                        key = %item.key,
                        error = %err,
                        "write-through propagation failed"
                    );
                }
            }
        }
        Ok(())
    }

    // == Delete ==
    /// Removes `key` from every level. True when any level held it.
    pub async fn delete(&self, key: &str) -> bool {
        let mut removed = false;
        for level in &self.levels {
            removed |= self.delete_level(level, key).await;
        }
        removed
    }

    // == Exists ==
    /// Presence check across levels; not counted as a lookup.
    pub async fn exists(&self, key: &str) -> bool {
        for level in &self.levels {
            let present = match level {
                TierLevel::Local(tier) => tier.lock().has(key),
                TierLevel::Remote(remote) => remote.exists(key).await,
            };
            if present {
                return true;
            }
        }
        false
    }

    // == Clear ==
    /// Empties every level. Returns how many in-process items were dropped.
    pub async fn clear(&self) -> usize {
        let mut cleared = 0;
        for level in &self.levels {
            match level {
                TierLevel::Local(tier) => cleared += tier.lock().clear(),
                TierLevel::Remote(remote) => {
                    if let Err(err) = remote.clear().await {
                        warn!(tier = %remote.name(), error = %err, "clear failed");
                    }
                }
            }
        }
        cleared
    }

    /// Live items of level 0, oldest first. Empty when level 0 is remote.
    pub fn fastest_items(&self) -> Vec<CacheItem> {
        match self.levels.first() {
            Some(TierLevel::Local(tier)) => tier.lock().live_items(),
            _ => Vec::new(),
        }
    }

    /// Item count of an in-process level.
    pub fn level_len(&self, index: usize) -> Option<usize> {
        match self.levels.get(index)? {
            TierLevel::Local(tier) => Some(tier.lock().len()),
            TierLevel::Remote(_) => None,
        }
    }

    /// Side-effect free containment check for one level.
    pub async fn level_contains(&self, index: usize, key: &str) -> bool {
        match self.levels.get(index) {
            Some(TierLevel::Local(tier)) => tier.lock().contains_key(key),
            Some(TierLevel::Remote(remote)) => remote.exists(key).await,
            None => false,
        }
    }

    // == Promotion ==
    /// Copies a hit from level `source` into every faster level.
    ///
    /// A faster local level that gained a live copy since the descent passed
    /// it keeps that copy; the promoted one is older.
    async fn promote(&self, source: usize, item: &CacheItem) {
        let source_name = &self.names[source];

        for (index, target) in self.levels.iter().enumerate().take(source) {
            let target_name = &self.names[index];
            let copy = item.promoted_copy();
            let result = match target {
                TierLevel::Local(tier) => local_insert_if_absent(tier, copy),
                TierLevel::Remote(remote) => remote.set(&copy).await.map(|_| Some(Vec::new())),
            };

            match result {
                Ok(Some(evicted)) => {
                    debug!(from = %source_name, to = %target_name, key = %item.key, "promoted");
                    self.stats[source].record_promotion_out();
                    self.stats[index].record_promotion_in();
                    self.events.emit(CacheEvent::Promoted {
                        from: source_name.clone(),
                        to: target_name.clone(),
                        key: item.key.clone(),
                    });
                    self.demote(index, evicted).await;
                }
                Ok(None) => {
                    debug!(tier = %target_name, key = %item.key, "newer copy present, promotion skipped");
                }
                Err(err) => {
                    debug!(tier = %target_name, key = %item.key, error = %err, "promotion skipped");
                }
            }
        }
    }

    // == Demotion ==
    /// Moves items evicted from level `from` down the chain when write-back
    /// is on; otherwise they are dropped.
    async fn demote(&self, from: usize, evicted: Vec<CacheItem>) {
        if !self.options.write_back || evicted.is_empty() {
            return;
        }

        let mut pending: Vec<(usize, CacheItem)> =
            evicted.into_iter().map(|item| (from, item)).collect();

        while let Some((from, item)) = pending.pop() {
            let to = from + 1;
            let Some(target) = self.levels.get(to) else {
                continue;
            };
            if item.is_expired() {
                continue;
            }

            let result = match target {
                TierLevel::Local(tier) => local_insert(tier, item.clone()),
                TierLevel::Remote(remote) => remote.set(&item).await.map(|_| Vec::new()),
            };

            match result {
                Ok(cascade) => {
                    self.stats[to].record_demotion_in();
                    self.events.emit(CacheEvent::Demoted {
                        from: self.names[from].clone(),
                        to: self.names[to].clone(),
                        key: item.key,
                    });
                    pending.extend(cascade.into_iter().map(|item| (to, item)));
                }
                Err(err) => {
                    warn!(tier = %self.names[to], key = %item.key, error = %err, "demotion failed");
                }
            }
        }
    }

    async fn write_level(&self, index: usize, level: &TierLevel, item: CacheItem) -> Result<()> {
        match level {
            TierLevel::Local(tier) => {
                let evicted = local_insert(tier, item)?;
                self.demote(index, evicted).await;
                Ok(())
            }
            TierLevel::Remote(remote) => remote.set(&item).await,
        }
    }

    async fn delete_level(&self, level: &TierLevel, key: &str) -> bool {
        match level {
            TierLevel::Local(tier) => tier.lock().delete(key),
            TierLevel::Remote(remote) => remote.delete(key).await.unwrap_or(false),
        }
    }
}

// Lock guards stay inside these helpers so no guard lives across an await.

fn local_get(tier: &SharedTier, key: &str) -> Option<CacheItem> {
    let mut guard = tier.lock();
    let started = Instant::now();
    let found = guard.get(key);
    guard.stats().record_latency(started.elapsed());
    found
}

fn local_insert(tier: &SharedTier, item: CacheItem) -> Result<Vec<CacheItem>> {
    tier.lock().insert(item)
}

fn local_insert_if_absent(tier: &SharedTier, item: CacheItem) -> Result<Option<Vec<CacheItem>>> {
    tier.lock().insert_if_absent(item)
}
