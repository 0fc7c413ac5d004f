//! Cache Module
//!
//! Multi-level caching: capacity-bounded tiers with pluggable eviction,
//! promotion across levels, TTL expiry and statistics.

pub mod backend;
pub mod chain;
pub mod events;
mod facade;
mod item;
pub mod policy;
pub mod slab;
pub mod stats;
pub mod tier;
pub mod transform;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use backend::{CacheBackend, InMemoryBackend, RemoteTier};
pub use chain::{ChainOptions, TierChain, TierLevel};
pub use events::{CacheEvent, ChannelListener, EventBus, EventListener};
pub use facade::{ExportedItem, MsetReport, TieredCache, TieredCacheBuilder};
pub use item::{checksum, current_timestamp_ms, CacheItem};
pub use policy::{EvictionPolicy, PolicyKind};
pub use stats::{StatisticsSnapshot, TierSnapshot};
pub use tier::{CacheTier, Lookup, SharedTier, TierConfig};
pub use transform::{AeadTransform, Lz4Transform, Transform, TransformPipeline};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB
