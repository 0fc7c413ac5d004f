//! Eviction Policies
//!
//! Pluggable victim selection for a [`CacheTier`](crate::cache::CacheTier).
//!
//! A policy only tracks ordering metadata. The tier owns the items, asks
//! the policy for a victim, removes it, and then reports the removal back
//! through [`EvictionPolicy::on_remove`].
//!
//! # Tie-breaking
//! - LRU: strict recency; the least recently inserted or read key goes first.
//! - LFU: lowest read frequency, then oldest `created_at`, then insertion order.
//! - FIFO: oldest `created_at`, then insertion order. Reads never reorder.
//! - Random: uniform over current members, drawn from an injectable RNG.
//! - TTL: earliest already-expired key, otherwise FIFO order.

mod fifo;
mod lfu;
mod lru;
mod random;
mod ttl;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cache::CacheItem;
use crate::error::CacheError;

pub use fifo::FifoPolicy;
pub use lfu::LfuPolicy;
pub use lru::LruPolicy;
pub use random::RandomPolicy;
pub use ttl::TtlPolicy;

// == Eviction Policy Trait ==
/// Victim-selection strategy for one tier.
pub trait EvictionPolicy: Send + fmt::Debug {
    /// Which algorithm this is.
    fn kind(&self) -> PolicyKind;

    /// Called after `item` has been inserted into the tier.
    fn on_insert(&mut self, item: &CacheItem);

    /// Called after `item` has been read from the tier.
    fn on_access(&mut self, item: &CacheItem);

    /// Called after `item` has been removed from the tier for any reason.
    fn on_remove(&mut self, item: &CacheItem);

    /// Picks the next key to evict without removing it.
    fn select_victim(&mut self, now: u64) -> Option<String>;

    /// Forgets every tracked key.
    fn clear(&mut self);

    /// Number of tracked keys.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// == Policy Kind ==
/// Names of the available policies, used by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    Lru,
    Lfu,
    Fifo,
    Random,
    Ttl,
}

impl PolicyKind {
    pub fn name(&self) -> &'static str {
        match self {
            PolicyKind::Lru => "lru",
            PolicyKind::Lfu => "lfu",
            PolicyKind::Fifo => "fifo",
            PolicyKind::Random => "random",
            PolicyKind::Ttl => "ttl",
        }
    }

    /// Builds a boxed policy of this kind.
    ///
    /// `seed` only matters for [`PolicyKind::Random`]; `None` seeds from
    /// the OS.
    pub fn build(&self, seed: Option<u64>) -> Box<dyn EvictionPolicy> {
        match self {
            PolicyKind::Lru => Box::new(LruPolicy::new()),
            PolicyKind::Lfu => Box::new(LfuPolicy::new()),
            PolicyKind::Fifo => Box::new(FifoPolicy::new()),
            PolicyKind::Random => match seed {
                Some(seed) => Box::new(RandomPolicy::with_seed(seed)),
                None => Box::new(RandomPolicy::new()),
            },
            PolicyKind::Ttl => Box::new(TtlPolicy::new()),
        }
    }
}

impl Default for PolicyKind {
    fn default() -> Self {
        PolicyKind::Lru
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PolicyKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(PolicyKind::Lru),
            "lfu" => Ok(PolicyKind::Lfu),
            "fifo" => Ok(PolicyKind::Fifo),
            "random" => Ok(PolicyKind::Random),
            "ttl" => Ok(PolicyKind::Ttl),
            other => Err(CacheError::Config(format!(
                "unknown eviction policy '{}'",
                other
            ))),
        }
    }
}
