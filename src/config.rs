//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{PolicyKind, TierConfig, MAX_KEY_LENGTH, MAX_VALUE_SIZE};
use crate::error::{CacheError, Result};
use crate::tasks::JanitorConfig;

/// Default tier layout: a small LRU in front of a larger LFU.
pub const DEFAULT_TIERS: &str = "lru:1000:67108864,lfu:10000:536870912";

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Default TTL in seconds for items set without one (0 = no expiry)
    pub default_ttl: u64,
    /// Maximum key length in bytes
    pub max_key_length: usize,
    /// Maximum stored value size in bytes
    pub max_value_size: usize,
    /// Tier layout, `policy:max_items:max_bytes` separated by commas
    pub tiers: String,
    /// Propagate writes to slower tiers
    pub write_through: bool,
    /// Demote evicted items to the next tier
    pub write_back: bool,
    /// Janitor sweep interval in milliseconds
    pub janitor_interval_ms: u64,
    /// Expired items removed per tier lock acquisition
    pub janitor_batch_size: usize,
    /// Enable LZ4 compression of stored values
    pub compression: bool,
    /// Values shorter than this are stored uncompressed
    pub compression_min_bytes: usize,
    /// 64 hex characters enabling ChaCha20-Poly1305 encryption
    pub encryption_key: Option<String>,
    /// Bound on a single backend call in milliseconds
    pub backend_timeout_ms: u64,
    /// Latency samples kept per tier
    pub latency_window: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `DEFAULT_TTL` - Default TTL in seconds, 0 disables expiry (default: 300)
    /// - `MAX_KEY_LENGTH` - Maximum key length (default: 256)
    /// - `MAX_VALUE_SIZE` - Maximum stored value size (default: 1 MiB)
    /// - `CACHE_TIERS` - Tier layout (default: [`DEFAULT_TIERS`])
    /// - `WRITE_THROUGH` / `WRITE_BACK` - Chain write modes (default: false)
    /// - `JANITOR_INTERVAL_MS` - Sweep interval (default: 1000)
    /// - `JANITOR_BATCH_SIZE` - Sweep batch size (default: 256)
    /// - `COMPRESSION` / `COMPRESSION_MIN_BYTES` - LZ4 (default: false / 1024)
    /// - `ENCRYPTION_KEY` - Hex key for AEAD encryption (default: unset)
    /// - `BACKEND_TIMEOUT_MS` - Backend call bound (default: 250)
    /// - `LATENCY_WINDOW` - Latency samples per tier (default: 64)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parsed("SERVER_PORT", defaults.server_port),
            default_ttl: parsed("DEFAULT_TTL", defaults.default_ttl),
            max_key_length: parsed("MAX_KEY_LENGTH", defaults.max_key_length),
            max_value_size: parsed("MAX_VALUE_SIZE", defaults.max_value_size),
            tiers: env::var("CACHE_TIERS").unwrap_or(defaults.tiers),
            write_through: flag("WRITE_THROUGH", defaults.write_through),
            write_back: flag("WRITE_BACK", defaults.write_back),
            janitor_interval_ms: parsed("JANITOR_INTERVAL_MS", defaults.janitor_interval_ms),
            janitor_batch_size: parsed("JANITOR_BATCH_SIZE", defaults.janitor_batch_size),
            compression: flag("COMPRESSION", defaults.compression),
            compression_min_bytes: parsed(
                "COMPRESSION_MIN_BYTES",
                defaults.compression_min_bytes,
            ),
            encryption_key: env::var("ENCRYPTION_KEY")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            backend_timeout_ms: parsed("BACKEND_TIMEOUT_MS", defaults.backend_timeout_ms),
            latency_window: parsed("LATENCY_WINDOW", defaults.latency_window),
        }
    }

    /// Default TTL as a duration; None when expiry is disabled.
    pub fn default_ttl(&self) -> Option<Duration> {
        (self.default_ttl > 0).then(|| Duration::from_secs(self.default_ttl))
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.backend_timeout_ms)
    }

    pub fn janitor(&self) -> JanitorConfig {
        JanitorConfig {
            interval: Duration::from_millis(self.janitor_interval_ms.max(1)),
            batch_size: self.janitor_batch_size.max(1),
            ..JanitorConfig::default()
        }
    }

    /// Parses the tier layout. Tiers are named `L1`, `L2`, ... in order.
    pub fn tiers(&self) -> Result<Vec<TierConfig>> {
        let tiers: Vec<TierConfig> = self
            .tiers
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .enumerate()
            .map(|(i, entry)| parse_tier(&format!("L{}", i + 1), entry))
            .collect::<Result<_>>()?;

        if tiers.is_empty() {
            return Err(CacheError::Config("CACHE_TIERS defines no tiers".into()));
        }
        Ok(tiers)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            default_ttl: 300,
            max_key_length: MAX_KEY_LENGTH,
            max_value_size: MAX_VALUE_SIZE,
            tiers: DEFAULT_TIERS.to_string(),
            write_through: false,
            write_back: false,
            janitor_interval_ms: 1000,
            janitor_batch_size: 256,
            compression: false,
            compression_min_bytes: 1024,
            encryption_key: None,
            backend_timeout_ms: 250,
            latency_window: 64,
        }
    }
}

fn parse_tier(name: &str, entry: &str) -> Result<TierConfig> {
    let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
    let [policy, max_items, max_bytes] = parts.as_slice() else {
        return Err(CacheError::Config(format!(
            "tier '{}' must look like policy:max_items:max_bytes",
            entry
        )));
    };

    let policy = PolicyKind::from_str(policy)?;
    let max_items: usize = max_items
        .parse()
        .map_err(|_| CacheError::Config(format!("invalid max_items in tier '{}'", entry)))?;
    let max_bytes: u64 = max_bytes
        .parse()
        .map_err(|_| CacheError::Config(format!("invalid max_bytes in tier '{}'", entry)))?;

    if max_items == 0 || max_bytes == 0 {
        return Err(CacheError::Config(format!(
            "tier '{}' must have non-zero limits",
            entry
        )));
    }
    Ok(TierConfig::new(name, policy, max_items, max_bytes))
}

fn parsed<T: FromStr>(var: &str, default: T) -> T {
    env::var(var)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn flag(var: &str, default: bool) -> bool {
    match env::var(var) {
        Ok(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.default_ttl, 300);
        assert_eq!(config.default_ttl(), Some(Duration::from_secs(300)));
        assert_eq!(config.janitor().interval, Duration::from_secs(1));
        assert!(!config.write_through);
        assert!(config.encryption_key.is_none());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        for var in [
            "SERVER_PORT",
            "DEFAULT_TTL",
            "CACHE_TIERS",
            "WRITE_THROUGH",
            "JANITOR_INTERVAL_MS",
            "ENCRYPTION_KEY",
        ] {
            env::remove_var(var);
        }

        let config = Config::from_env();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.default_ttl, 300);
        assert_eq!(config.tiers, DEFAULT_TIERS);
        assert_eq!(config.janitor_interval_ms, 1000);
    }

    #[test]
    fn test_zero_default_ttl_disables_expiry() {
        let config = Config {
            default_ttl: 0,
            ..Config::default()
        };
        assert_eq!(config.default_ttl(), None);
    }

    #[test]
    fn test_default_tiers_parse() {
        let tiers = Config::default().tiers().unwrap();
        assert_eq!(tiers.len(), 2);
        assert_eq!(tiers[0].name, "L1");
        assert_eq!(tiers[0].policy, PolicyKind::Lru);
        assert_eq!(tiers[0].max_items, 1000);
        assert_eq!(tiers[1].policy, PolicyKind::Lfu);
        assert_eq!(tiers[1].max_size_bytes, 536_870_912);
    }

    #[test]
    fn test_malformed_tiers_are_config_errors() {
        for layout in ["", "lru:10", "mru:10:100", "lru:x:100", "lru:0:100"] {
            let config = Config {
                tiers: layout.to_string(),
                ..Config::default()
            };
            assert!(
                matches!(config.tiers(), Err(CacheError::Config(_))),
                "layout {:?} should be rejected",
                layout
            );
        }
    }

    #[test]
    fn test_tier_layout_tolerates_whitespace() {
        let config = Config {
            tiers: " fifo:5:500 , random:6:600 ,ttl:7:700".to_string(),
            ..Config::default()
        };
        let tiers = config.tiers().unwrap();
        let kinds: Vec<PolicyKind> = tiers.iter().map(|t| t.policy).collect();
        assert_eq!(kinds, vec![PolicyKind::Fifo, PolicyKind::Random, PolicyKind::Ttl]);
        assert_eq!(tiers[2].name, "L3");
    }
}
