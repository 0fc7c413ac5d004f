//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use std::collections::HashMap;

use bytes::Bytes;
use serde::Serialize;

use crate::cache::{ExportedItem, MsetReport, StatisticsSnapshot};

/// Values travel as UTF-8; invalid sequences are replaced.
pub fn value_to_string(value: &Bytes) -> String {
    String::from_utf8_lossy(value).into_owned()
}

/// Response body for the GET operation (GET /get/:key)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The stored value
    pub value: String,
}

impl GetResponse {
    /// Creates a new GetResponse
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Response body for the SET operation (PUT /set)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
    /// Tier the value was written to
    pub tier: usize,
}

impl SetResponse {
    /// Creates a new SetResponse
    pub fn new(key: impl Into<String>, tier: usize) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
            tier,
        }
    }
}

/// Response body for the DELETE operation (DELETE /del/:key)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// The key that was deleted
    pub key: String,
}

impl DeleteResponse {
    /// Creates a new DeleteResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
        }
    }
}

/// Response body for GET /exists/:key
#[derive(Debug, Clone, Serialize)]
pub struct ExistsResponse {
    pub key: String,
    pub exists: bool,
}

/// Response body for POST /mget; absent keys are omitted
#[derive(Debug, Clone, Serialize)]
pub struct MgetResponse {
    pub values: HashMap<String, String>,
}

impl MgetResponse {
    pub fn new(values: HashMap<String, Bytes>) -> Self {
        Self {
            values: values
                .into_iter()
                .map(|(key, value)| (key, value_to_string(&value)))
                .collect(),
        }
    }
}

/// A key rejected by a bulk write
#[derive(Debug, Clone, Serialize)]
pub struct FailedKey {
    pub key: String,
    pub error: String,
}

/// Response body for POST /mset and POST /import
#[derive(Debug, Clone, Serialize)]
pub struct BulkWriteResponse {
    pub stored: usize,
    pub failed: Vec<FailedKey>,
}

impl From<MsetReport> for BulkWriteResponse {
    fn from(report: MsetReport) -> Self {
        Self {
            stored: report.stored,
            failed: report
                .failed
                .into_iter()
                .map(|(key, err)| FailedKey {
                    key,
                    error: err.to_string(),
                })
                .collect(),
        }
    }
}

/// Response body for POST /clear
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    /// Items dropped from in-process tiers
    pub cleared: usize,
}

/// One exported item
#[derive(Debug, Clone, Serialize)]
pub struct ExportEntry {
    pub key: String,
    pub value: String,
    pub ttl_remaining_ms: Option<u64>,
}

/// Response body for GET /export
#[derive(Debug, Clone, Serialize)]
pub struct ExportResponse {
    pub items: Vec<ExportEntry>,
}

impl ExportResponse {
    pub fn new(items: Vec<ExportedItem>) -> Self {
        Self {
            items: items
                .into_iter()
                .map(|item| ExportEntry {
                    value: value_to_string(&item.value),
                    key: item.key,
                    ttl_remaining_ms: item.ttl_remaining_ms,
                })
                .collect(),
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub snapshot: StatisticsSnapshot,
    /// Number of configured tiers
    pub tier_count: usize,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
