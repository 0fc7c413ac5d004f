//! Cache Statistics Module
//!
//! Tracks per-tier and aggregate hits, misses, evictions and latency.
//!
//! Counters are relaxed atomics so recording never blocks a tier lock and
//! snapshots never block foreground operations. The aggregate hit rate is
//! always recomputed from the raw counters.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

/// Default number of latency samples kept per tier.
pub const DEFAULT_LATENCY_WINDOW: usize = 64;

// == Latency Window ==
/// Fixed-size sliding window over the last `capacity` samples.
///
/// The reported average is the arithmetic mean of the samples currently in
/// the window, so it is reproducible from the input sequence.
#[derive(Debug, Clone)]
pub struct LatencyWindow {
    samples: VecDeque<u64>,
    capacity: usize,
    sum: u64,
}

impl LatencyWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            sum: 0,
        }
    }

    /// Adds a sample in microseconds, dropping the oldest when full.
    pub fn record_us(&mut self, micros: u64) {
        if self.samples.len() == self.capacity {
            if let Some(oldest) = self.samples.pop_front() {
                self.sum -= oldest;
            }
        }
        self.samples.push_back(micros);
        self.sum += micros;
    }

    pub fn record(&mut self, elapsed: Duration) {
        self.record_us(elapsed.as_micros() as u64);
    }

    /// Mean of the window in microseconds, 0.0 when empty.
    pub fn average_us(&self) -> f64 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.sum as f64 / self.samples.len() as f64
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.sum = 0;
    }
}

// == Tier Stats ==
/// Counters for one tier.
#[derive(Debug)]
pub struct TierStats {
    name: String,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
    promotions_in: AtomicU64,
    promotions_out: AtomicU64,
    demotions_in: AtomicU64,
    integrity_failures: AtomicU64,
    backend_failures: AtomicU64,
    item_count: AtomicU64,
    size_bytes: AtomicU64,
    latency: Mutex<LatencyWindow>,
}

impl TierStats {
    pub fn new(name: impl Into<String>, latency_window: usize) -> Self {
        Self {
            name: name.into(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
            promotions_in: AtomicU64::new(0),
            promotions_out: AtomicU64::new(0),
            demotions_in: AtomicU64::new(0),
            integrity_failures: AtomicU64::new(0),
            backend_failures: AtomicU64::new(0),
            item_count: AtomicU64::new(0),
            size_bytes: AtomicU64::new(0),
            latency: Mutex::new(LatencyWindow::new(latency_window)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expiration(&self) {
        self.expirations.fetch_add(1, Ordering::Relaxed);
    }

    /// A copy was promoted into this tier.
    pub fn record_promotion_in(&self) {
        self.promotions_in.fetch_add(1, Ordering::Relaxed);
    }

    /// This tier was the source of a promotion.
    pub fn record_promotion_out(&self) {
        self.promotions_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_demotion_in(&self) {
        self.demotions_in.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_integrity_failure(&self) {
        self.integrity_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_backend_failure(&self) {
        self.backend_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_latency(&self, elapsed: Duration) {
        self.latency.lock().record(elapsed);
    }

    /// Publishes the tier's occupancy; called under the tier lock.
    pub fn set_occupancy(&self, item_count: usize, size_bytes: u64) {
        self.item_count.store(item_count as u64, Ordering::Relaxed);
        self.size_bytes.store(size_bytes, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> TierSnapshot {
        let hits = self.hits();
        let misses = self.misses();
        TierSnapshot {
            name: self.name.clone(),
            hits,
            misses,
            hit_rate: ratio(hits, misses),
            evictions: self.evictions(),
            expirations: self.expirations.load(Ordering::Relaxed),
            promotions_in: self.promotions_in.load(Ordering::Relaxed),
            promotions_out: self.promotions_out.load(Ordering::Relaxed),
            demotions_in: self.demotions_in.load(Ordering::Relaxed),
            integrity_failures: self.integrity_failures.load(Ordering::Relaxed),
            backend_failures: self.backend_failures.load(Ordering::Relaxed),
            item_count: self.item_count.load(Ordering::Relaxed),
            size_bytes: self.size_bytes.load(Ordering::Relaxed),
            avg_latency_us: self.latency.lock().average_us(),
        }
    }

    /// Zeroes every counter except occupancy, which the tier owns.
    pub fn reset(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.evictions,
            &self.expirations,
            &self.promotions_in,
            &self.promotions_out,
            &self.demotions_in,
            &self.integrity_failures,
            &self.backend_failures,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.latency.lock().clear();
    }
}

// == Stats Recorder ==
/// Aggregate recorder shared by the chain and the facade.
///
/// `lookups_hit` / `lookups_missed` count facade-level lookups: a lookup is a
/// hit when any tier served it and a miss when every tier missed.
#[derive(Debug)]
pub struct StatsRecorder {
    tiers: Vec<Arc<TierStats>>,
    lookups_hit: AtomicU64,
    lookups_missed: AtomicU64,
}

impl StatsRecorder {
    pub fn new(tiers: Vec<Arc<TierStats>>) -> Self {
        Self {
            tiers,
            lookups_hit: AtomicU64::new(0),
            lookups_missed: AtomicU64::new(0),
        }
    }

    pub fn tier(&self, index: usize) -> Option<&Arc<TierStats>> {
        self.tiers.get(index)
    }

    pub fn record_hit(&self) {
        self.lookups_hit.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.lookups_missed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        let tiers: Vec<TierSnapshot> = self.tiers.iter().map(|t| t.snapshot()).collect();
        let total_hits = self.lookups_hit.load(Ordering::Relaxed);
        let total_misses = self.lookups_missed.load(Ordering::Relaxed);

        StatisticsSnapshot {
            total_hits,
            total_misses,
            hit_rate: ratio(total_hits, total_misses),
            total_evictions: tiers.iter().map(|t| t.evictions).sum(),
            total_items: tiers.iter().map(|t| t.item_count).sum(),
            tiers,
        }
    }

    pub fn reset(&self) {
        self.lookups_hit.store(0, Ordering::Relaxed);
        self.lookups_missed.store(0, Ordering::Relaxed);
        for tier in &self.tiers {
            tier.reset();
        }
    }
}

// == Snapshots ==
/// Immutable copy of one tier's counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierSnapshot {
    pub name: String,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub evictions: u64,
    pub expirations: u64,
    pub promotions_in: u64,
    pub promotions_out: u64,
    pub demotions_in: u64,
    pub integrity_failures: u64,
    pub backend_failures: u64,
    pub item_count: u64,
    pub size_bytes: u64,
    pub avg_latency_us: f64,
}

/// Immutable copy of all counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsSnapshot {
    pub total_hits: u64,
    pub total_misses: u64,
    /// total_hits / (total_hits + total_misses), 0.0 with no lookups
    pub hit_rate: f64,
    pub total_evictions: u64,
    pub total_items: u64,
    pub tiers: Vec<TierSnapshot>,
}

fn ratio(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}
