//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies. Key and value
//! limits are enforced by the cache itself.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

/// Request body for the SET operation (PUT /set)
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: The value to store
/// - `ttl`: Optional TTL in seconds (uses default if not specified)
/// - `tier`: Optional target tier index (fastest if not specified)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The value to store
    pub value: String,
    /// Optional TTL in seconds
    #[serde(default)]
    pub ttl: Option<u64>,
    /// Optional target tier, 0 = fastest
    #[serde(default)]
    pub tier: Option<usize>,
}

impl SetRequest {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl.map(Duration::from_secs)
    }
}

/// Request body for POST /mget
#[derive(Debug, Clone, Deserialize)]
pub struct MgetRequest {
    pub keys: Vec<String>,
}

/// Request body for POST /mset
#[derive(Debug, Clone, Deserialize)]
pub struct MsetRequest {
    pub entries: HashMap<String, String>,
    /// Optional TTL in seconds applied to every entry
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl MsetRequest {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl.map(Duration::from_secs)
    }
}

/// One entry of an import, as produced by GET /export
#[derive(Debug, Clone, Deserialize)]
pub struct ImportEntry {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub ttl_remaining_ms: Option<u64>,
}

/// Request body for POST /import
#[derive(Debug, Clone, Deserialize)]
pub struct ImportRequest {
    pub items: Vec<ImportEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_request_deserialize() {
        let json = r#"{"key": "test", "value": "hello"}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.key, "test");
        assert_eq!(req.value, "hello");
        assert!(req.ttl.is_none());
        assert!(req.tier.is_none());
    }

    #[test]
    fn test_set_request_with_ttl_and_tier() {
        let json = r#"{"key": "test", "value": "hello", "ttl": 60, "tier": 1}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.ttl(), Some(Duration::from_secs(60)));
        assert_eq!(req.tier, Some(1));
    }

    #[test]
    fn test_mset_request_deserialize() {
        let json = r#"{"entries": {"a": "1", "b": "2"}, "ttl": 5}"#;
        let req: MsetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.entries.len(), 2);
        assert_eq!(req.ttl(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_import_request_deserialize() {
        let json = r#"{"items": [{"key": "a", "value": "1", "ttl_remaining_ms": 900},
                                 {"key": "b", "value": "2"}]}"#;
        let req: ImportRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.items[0].ttl_remaining_ms, Some(900));
        assert!(req.items[1].ttl_remaining_ms.is_none());
    }
}
