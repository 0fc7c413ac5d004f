//! Tiered Cache - A multi-level cache server
//!
//! Capacity-bounded tiers with pluggable eviction policies, promotion of hot
//! items toward faster tiers, TTL expiry and hit/miss statistics.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::{create_router, AppState};
pub use cache::TieredCache;
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::{spawn_janitor, JanitorConfig, JanitorHandle};
