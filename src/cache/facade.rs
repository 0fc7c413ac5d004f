//! Tiered Cache Facade
//!
//! The public API: validation, value transforms and statistics wrapped
//! around a [`TierChain`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::backend::{CacheBackend, RemoteTier};
use crate::cache::chain::{ChainOptions, TierChain, TierLevel};
use crate::cache::events::{CacheEvent, EventBus, EventListener};
use crate::cache::stats::{StatisticsSnapshot, StatsRecorder, TierStats, DEFAULT_LATENCY_WINDOW};
use crate::cache::tier::{CacheTier, TierConfig};
use crate::cache::transform::{AeadTransform, Lz4Transform, Transform, TransformPipeline};
use crate::cache::{CacheItem, MAX_KEY_LENGTH, MAX_VALUE_SIZE};
use crate::config::Config;
use crate::error::{CacheError, Result};

/// Default bound on a single backend call.
pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_millis(250);

// == Bulk Types ==
/// One live item as dumped by [`TieredCache::export`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedItem {
    pub key: String,
    pub value: Bytes,
    /// Remaining TTL in milliseconds, None = no expiry
    pub ttl_remaining_ms: Option<u64>,
}

/// Outcome of a best-effort bulk write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MsetReport {
    pub stored: usize,
    pub failed: Vec<(String, CacheError)>,
}

impl MsetReport {
    fn record(&mut self, key: String, result: Result<()>) {
        match result {
            Ok(()) => self.stored += 1,
            Err(err) => self.failed.push((key, err)),
        }
    }
}

// == Builder ==
enum PendingLevel {
    Local(TierConfig),
    Remote {
        name: String,
        backend: Arc<dyn CacheBackend>,
    },
}

/// Assembles a [`TieredCache`]. Levels are ordered by insertion, fastest
/// first; listeners must be registered before `build`.
pub struct TieredCacheBuilder {
    levels: Vec<PendingLevel>,
    listeners: Vec<Arc<dyn EventListener>>,
    pipeline: TransformPipeline,
    options: ChainOptions,
    default_ttl: Option<Duration>,
    max_key_length: usize,
    max_value_size: usize,
    backend_timeout: Duration,
    latency_window: usize,
}

impl Default for TieredCacheBuilder {
    fn default() -> Self {
        Self {
            levels: Vec::new(),
            listeners: Vec::new(),
            pipeline: TransformPipeline::new(),
            options: ChainOptions::default(),
            default_ttl: None,
            max_key_length: MAX_KEY_LENGTH,
            max_value_size: MAX_VALUE_SIZE,
            backend_timeout: DEFAULT_BACKEND_TIMEOUT,
            latency_window: DEFAULT_LATENCY_WINDOW,
        }
    }
}

impl TieredCacheBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an in-process tier.
    pub fn tier(mut self, config: TierConfig) -> Self {
        self.levels.push(PendingLevel::Local(config));
        self
    }

    /// Appends a level served by an external backend.
    pub fn remote(mut self, name: impl Into<String>, backend: Arc<dyn CacheBackend>) -> Self {
        self.levels.push(PendingLevel::Remote {
            name: name.into(),
            backend,
        });
        self
    }

    pub fn listener(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Appends a value transform; encode order is registration order.
    pub fn transform(mut self, stage: Arc<dyn Transform>) -> Self {
        self.pipeline = self.pipeline.with_stage(stage);
        self
    }

    pub fn write_through(mut self, enabled: bool) -> Self {
        self.options.write_through = enabled;
        self
    }

    pub fn write_back(mut self, enabled: bool) -> Self {
        self.options.write_back = enabled;
        self
    }

    /// TTL applied when `set` is called without one. None = no expiry.
    pub fn default_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn max_key_length(mut self, max: usize) -> Self {
        self.max_key_length = max;
        self
    }

    pub fn max_value_size(mut self, max: usize) -> Self {
        self.max_value_size = max;
        self
    }

    pub fn backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = timeout;
        self
    }

    pub fn latency_window(mut self, samples: usize) -> Self {
        self.latency_window = samples;
        self
    }

    pub fn build(self) -> Result<TieredCache> {
        if self.levels.is_empty() {
            return Err(CacheError::Config("at least one tier is required".into()));
        }
        if self.default_ttl == Some(Duration::ZERO) {
            return Err(CacheError::Config("default TTL must be positive".into()));
        }

        let events = EventBus::with_listeners(self.listeners);
        let mut levels = Vec::with_capacity(self.levels.len());
        let mut tier_stats = Vec::with_capacity(self.levels.len());

        for level in self.levels {
            match level {
                PendingLevel::Local(config) => {
                    let stats = Arc::new(TierStats::new(&config.name, self.latency_window));
                    tier_stats.push(stats.clone());
                    let tier = CacheTier::new(&config, stats, events.clone());
                    levels.push(TierLevel::Local(tier.shared()));
                }
                PendingLevel::Remote { name, backend } => {
                    let stats = Arc::new(TierStats::new(&name, self.latency_window));
                    tier_stats.push(stats.clone());
                    levels.push(TierLevel::Remote(RemoteTier::new(
                        name,
                        backend,
                        self.backend_timeout,
                        stats,
                        events.clone(),
                    )));
                }
            }
        }

        Ok(TieredCache {
            chain: Arc::new(TierChain::new(levels, self.options, events.clone())),
            stats: Arc::new(StatsRecorder::new(tier_stats)),
            pipeline: self.pipeline,
            events,
            default_ttl: self.default_ttl,
            max_key_length: self.max_key_length,
            max_value_size: self.max_value_size,
        })
    }
}

// == Tiered Cache ==
/// Multi-level cache with pluggable eviction, promotion and TTL.
#[derive(Debug)]
pub struct TieredCache {
    chain: Arc<TierChain>,
    stats: Arc<StatsRecorder>,
    pipeline: TransformPipeline,
    events: EventBus,
    default_ttl: Option<Duration>,
    max_key_length: usize,
    max_value_size: usize,
}

impl TieredCache {
    pub fn builder() -> TieredCacheBuilder {
        TieredCacheBuilder::new()
    }

    /// Builds the in-process tiers and transforms described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut builder = Self::builder()
            .write_through(config.write_through)
            .write_back(config.write_back)
            .default_ttl(config.default_ttl())
            .max_key_length(config.max_key_length)
            .max_value_size(config.max_value_size)
            .backend_timeout(config.backend_timeout())
            .latency_window(config.latency_window);

        for tier in config.tiers()? {
            builder = builder.tier(tier);
        }
        if config.compression {
            builder = builder.transform(Arc::new(Lz4Transform::new(config.compression_min_bytes)));
        }
        if let Some(key) = &config.encryption_key {
            builder = builder.transform(Arc::new(AeadTransform::from_hex(key)?));
        }
        builder.build()
    }

    // == Get ==
    /// Returns the value from the fastest level holding it.
    ///
    /// Values that fail to decode are purged everywhere and reported as a
    /// miss.
    pub async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.validate_key(key)?;

        let Some((level, item)) = self.chain.get(key).await else {
            self.stats.record_miss();
            return Ok(None);
        };

        match self.pipeline.decode(&item.value) {
            Ok(value) => {
                self.stats.record_hit();
                Ok(Some(Bytes::from(value)))
            }
            Err(err) => {
                let tier = self
                    .chain
                    .level_name(level)
                    .unwrap_or_default()
                    .to_string();
                warn!(tier = %tier, key = %key, error = %err, "stored value failed to decode, purging");
                if let Some(stats) = self.stats.tier(level) {
                    stats.record_integrity_failure();
                }
                self.events.emit(CacheEvent::IntegrityFailure {
                    tier,
                    key: key.to_string(),
                });
                self.chain.delete(key).await;
                self.stats.record_miss();
                Ok(None)
            }
        }
    }

    // == Set ==
    /// Stores `value` in the fastest tier.
    ///
    /// `ttl = None` applies the configured default TTL.
    pub async fn set(&self, key: &str, value: impl Into<Bytes>, ttl: Option<Duration>) -> Result<()> {
        self.set_in_tier(key, value, ttl, 0).await
    }

    /// Stores `value` in tier `tier`. All validation happens before any
    /// tier is touched.
    pub async fn set_in_tier(
        &self,
        key: &str,
        value: impl Into<Bytes>,
        ttl: Option<Duration>,
        tier: usize,
    ) -> Result<()> {
        let item = self.prepare(key, value.into(), ttl.or(self.default_ttl), tier)?;
        self.chain.set(item, tier).await?;
        debug!(key = %key, tier, "set");
        Ok(())
    }

    // == Delete ==
    pub async fn delete(&self, key: &str) -> Result<bool> {
        self.validate_key(key)?;
        Ok(self.chain.delete(key).await)
    }

    // == Exists ==
    pub async fn exists(&self, key: &str) -> Result<bool> {
        self.validate_key(key)?;
        Ok(self.chain.exists(key).await)
    }

    // == Bulk ==
    /// Fetches several keys. Invalid or absent keys are left out.
    pub async fn mget<S: AsRef<str>>(&self, keys: &[S]) -> HashMap<String, Bytes> {
        let mut found = HashMap::with_capacity(keys.len());
        for key in keys {
            let key = key.as_ref();
            match self.get(key).await {
                Ok(Some(value)) => {
                    found.insert(key.to_string(), value);
                }
                Ok(None) => {}
                Err(err) => debug!(key = %key, error = %err, "mget skipped key"),
            }
        }
        found
    }

    /// Stores several entries, continuing past individual failures.
    pub async fn mset<I, K, V>(&self, entries: I, ttl: Option<Duration>) -> MsetReport
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Bytes>,
    {
        let mut report = MsetReport::default();
        for (key, value) in entries {
            let key = key.into();
            let result = self.set(&key, value, ttl).await;
            report.record(key, result);
        }
        report
    }

    // == Clear ==
    /// Empties every tier and zeroes all statistics.
    pub async fn clear(&self) -> usize {
        let cleared = self.chain.clear().await;
        self.stats.reset();
        self.events.emit(CacheEvent::Cleared);
        info!(cleared, "cache cleared");
        cleared
    }

    // == Warm Up / Export / Import ==
    /// Preloads raw values into the fastest tier with the default TTL.
    pub async fn warm_up<I, K, V>(&self, data: I) -> MsetReport
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Bytes>,
    {
        let report = self.mset(data, None).await;
        info!(stored = report.stored, failed = report.failed.len(), "warm-up finished");
        report
    }

    /// Dumps the fastest tier's live items with decoded values.
    pub fn export(&self) -> Vec<ExportedItem> {
        self.chain
            .fastest_items()
            .into_iter()
            .filter_map(|item| match self.pipeline.decode(&item.value) {
                Ok(value) => Some(ExportedItem {
                    ttl_remaining_ms: item.ttl_remaining_ms(),
                    key: item.key,
                    value: Bytes::from(value),
                }),
                Err(err) => {
                    warn!(key = %item.key, error = %err, "export skipped undecodable item");
                    None
                }
            })
            .filter(|item| item.ttl_remaining_ms != Some(0))
            .collect()
    }

    /// Loads exported items into the fastest tier, keeping their remaining
    /// TTL. Items with no time left are skipped.
    pub async fn import(&self, items: Vec<ExportedItem>) -> MsetReport {
        let mut report = MsetReport::default();
        for item in items {
            let ttl = match item.ttl_remaining_ms {
                Some(0) => continue,
                Some(ms) => Some(Duration::from_millis(ms)),
                None => None,
            };
            // Exported without expiry stays without expiry.
            let result = match self.prepare(&item.key, item.value, ttl, 0) {
                Ok(prepared) => self.chain.set(prepared, 0).await,
                Err(err) => Err(err),
            };
            report.record(item.key, result);
        }
        report
    }

    // == Introspection ==
    pub fn get_statistics(&self) -> StatisticsSnapshot {
        self.stats.snapshot()
    }

    pub fn tier_count(&self) -> usize {
        self.chain.len()
    }

    /// Item count of an in-process tier.
    pub fn tier_len(&self, tier: usize) -> Option<usize> {
        self.chain.level_len(tier)
    }

    pub async fn tier_contains(&self, tier: usize, key: &str) -> bool {
        self.chain.level_contains(tier, key).await
    }

    pub fn chain(&self) -> &Arc<TierChain> {
        &self.chain
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    // == Validation ==
    fn validate_key(&self, key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(CacheError::Validation("key cannot be empty".into()));
        }
        if key.len() > self.max_key_length {
            return Err(CacheError::Validation(format!(
                "key exceeds maximum length of {} bytes",
                self.max_key_length
            )));
        }
        Ok(())
    }

    /// Validates and encodes a write. `ttl` is final here: None = no expiry.
    fn prepare(&self, key: &str, value: Bytes, ttl: Option<Duration>, tier: usize) -> Result<CacheItem> {
        self.validate_key(key)?;
        if tier >= self.chain.len() {
            return Err(CacheError::Validation(format!(
                "tier index {} out of range (cache has {} tiers)",
                tier,
                self.chain.len()
            )));
        }
        if ttl == Some(Duration::ZERO) {
            return Err(CacheError::Validation("TTL must be positive".into()));
        }

        let stored = self.pipeline.encode(&value)?;
        if stored.len() > self.max_value_size {
            return Err(CacheError::Validation(format!(
                "value of {} stored bytes exceeds maximum of {}",
                stored.len(),
                self.max_value_size
            )));
        }

        Ok(CacheItem::new(key, stored, ttl))
    }
}
