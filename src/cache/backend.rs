//! Cache Backend Module
//!
//! Collaborator interface for tiers that live outside the process (remote
//! cache, disk store) and the tier wrapper that turns backend failures into
//! misses.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tracing::warn;

use crate::cache::events::{CacheEvent, EventBus};
use crate::cache::item::current_timestamp_ms;
use crate::cache::stats::TierStats;
use crate::cache::CacheItem;
use crate::error::{CacheError, Result};

// == Backend Trait ==
/// Storage reachable only through fallible, possibly slow calls.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<bool>;

    async fn clear(&self) -> Result<()>;
}

// == In-Memory Backend ==
/// Process-local backend for tests and single-node deployments.
///
/// Outages and latency can be simulated to exercise the degraded paths.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    storage: DashMap<String, (Bytes, Option<u64>)>,
    unavailable: AtomicBool,
    delay_ms: AtomicU64,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// When false, every call fails with `BackendUnavailable`.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Adds an artificial delay to every call.
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Stores raw bytes, bypassing any envelope.
    pub fn insert_raw(&self, key: impl Into<String>, value: impl Into<Bytes>) {
        self.storage.insert(key.into(), (value.into(), None));
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.storage.contains_key(key)
    }

    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    async fn enter(&self) -> Result<()> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::backend("in-memory", "backend marked unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.enter().await?;
        self.reads.fetch_add(1, Ordering::Relaxed);

        let now = current_timestamp_ms();
        let expired = match self.storage.get(key) {
            None => return Ok(None),
            Some(entry) => match entry.1 {
                Some(expires_at) if now >= expires_at => true,
                _ => return Ok(Some(entry.0.clone())),
            },
        };
        if expired {
            self.storage.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<()> {
        self.enter().await?;
        self.writes.fetch_add(1, Ordering::Relaxed);

        let expires_at =
            ttl.map(|ttl| current_timestamp_ms().saturating_add(ttl.as_millis() as u64));
        self.storage.insert(key.to_string(), (value, expires_at));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.enter().await?;
        Ok(self.storage.remove(key).is_some())
    }

    async fn clear(&self) -> Result<()> {
        self.enter().await?;
        self.storage.clear();
        Ok(())
    }
}

// == Remote Tier ==
/// A chain level backed by a [`CacheBackend`].
///
/// Items travel as a JSON envelope of [`CacheItem`] so expiry and checksum
/// survive the round trip. Every call is bounded by `timeout`; failures are
/// reported as events and degrade to a miss.
#[derive(Clone)]
pub struct RemoteTier {
    name: String,
    backend: Arc<dyn CacheBackend>,
    timeout: Duration,
    stats: Arc<TierStats>,
    events: EventBus,
}

impl RemoteTier {
    pub fn new(
        name: impl Into<String>,
        backend: Arc<dyn CacheBackend>,
        timeout: Duration,
        stats: Arc<TierStats>,
        events: EventBus,
    ) -> Self {
        Self {
            name: name.into(),
            backend,
            timeout,
            stats,
            events,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stats(&self) -> &Arc<TierStats> {
        &self.stats
    }

    /// Reads and validates an item. Any failure is a miss.
    pub async fn get(&self, key: &str) -> Option<CacheItem> {
        let started = Instant::now();
        let outcome = self.fetch(key).await;
        self.stats.record_latency(started.elapsed());

        match outcome {
            Some(item) => {
                self.stats.record_hit();
                Some(item)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Presence check without counting a lookup.
    pub async fn exists(&self, key: &str) -> bool {
        self.fetch(key).await.is_some()
    }

    /// Writes an item, preserving its remaining TTL.
    pub async fn set(&self, item: &CacheItem) -> Result<()> {
        let ttl = match item.ttl_remaining_ms() {
            Some(0) => return Ok(()),
            Some(ms) => Some(Duration::from_millis(ms)),
            None => None,
        };
        let envelope = serde_json::to_vec(item)
            .map_err(|e| CacheError::Internal(format!("envelope encode: {}", e)))?;

        self.call("set", self.backend.set(&item.key, Bytes::from(envelope), ttl))
            .await
    }

    pub async fn delete(&self, key: &str) -> Result<bool> {
        self.call("delete", self.backend.delete(key)).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.call("clear", self.backend.clear()).await
    }

    async fn fetch(&self, key: &str) -> Option<CacheItem> {
        let raw = self.call("get", self.backend.get(key)).await.ok()??;

        let item: CacheItem = match serde_json::from_slice(&raw) {
            Ok(item) => item,
            Err(_) => {
                self.purge_corrupt(key).await;
                return None;
            }
        };

        if item.key != key || !item.verify() {
            self.purge_corrupt(key).await;
            return None;
        }
        if item.is_expired() {
            let _ = self.call("delete", self.backend.delete(key)).await;
            self.stats.record_expiration();
            self.events.emit(CacheEvent::Expired {
                tier: self.name.clone(),
                key: key.to_string(),
            });
            return None;
        }
        Some(item)
    }

    async fn purge_corrupt(&self, key: &str) {
        warn!(tier = %self.name, key = %key, "integrity check failed, purging");
        self.stats.record_integrity_failure();
        self.events.emit(CacheEvent::IntegrityFailure {
            tier: self.name.clone(),
            key: key.to_string(),
        });
        let _ = self.call("delete", self.backend.delete(key)).await;
    }

    async fn call<T>(
        &self,
        operation: &str,
        fut: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        let result = match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::backend(
                &self.name,
                format!("{} timed out after {:?}", operation, self.timeout),
            )),
        };

        if let Err(err) = &result {
            warn!(tier = %self.name, operation, error = %err, "backend call failed");
            self.stats.record_backend_failure();
            self.events.emit(CacheEvent::BackendFailure {
                tier: self.name.clone(),
                operation: operation.to_string(),
                reason: err.to_string(),
            });
        }
        result
    }
}

impl std::fmt::Debug for RemoteTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteTier")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .finish()
    }
}
