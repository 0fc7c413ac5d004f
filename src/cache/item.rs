//! Cache Item Module
//!
//! Defines the record stored in every tier, with TTL and integrity metadata.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

// == Cache Item ==
/// A single stored record.
///
/// `value` holds the bytes as stored, i.e. after compression/encryption.
/// `checksum` covers exactly those bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheItem {
    /// The key this item is stored under
    pub key: String,
    /// Stored (transformed) bytes
    pub value: Bytes,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Last read timestamp (Unix milliseconds)
    pub last_accessed_at: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
    /// Number of reads served from this copy
    pub access_count: u64,
    /// Budget charge: key plus stored value length
    pub size_bytes: u64,
    /// CRC32 of `value`
    pub checksum: u32,
}

impl CacheItem {
    // == Constructor ==
    /// Creates a new item with an optional TTL relative to now.
    pub fn new(key: impl Into<String>, value: impl Into<Bytes>, ttl: Option<Duration>) -> Self {
        let now = current_timestamp_ms();
        let expires_at = ttl.map(|ttl| now.saturating_add(ttl.as_millis() as u64));
        Self::with_expiry(key, value, expires_at)
    }

    /// Creates a new item with an absolute expiry timestamp.
    pub fn with_expiry(
        key: impl Into<String>,
        value: impl Into<Bytes>,
        expires_at: Option<u64>,
    ) -> Self {
        let key = key.into();
        let value = value.into();
        let now = current_timestamp_ms();

        Self {
            size_bytes: (key.len() + value.len()) as u64,
            checksum: checksum(&value),
            key,
            value,
            created_at: now,
            last_accessed_at: now,
            expires_at,
            access_count: 0,
        }
    }

    // == Is Expired ==
    /// Checks whether the item is expired at `now`.
    ///
    /// An item is expired once `now >= expires_at`.
    pub fn is_expired_at(&self, now: u64) -> bool {
        matches!(self.expires_at, Some(expires) if now >= expires)
    }

    /// Checks whether the item is expired right now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    // == Integrity ==
    /// Returns true when the stored bytes still match the checksum.
    pub fn verify(&self) -> bool {
        checksum(&self.value) == self.checksum
    }

    // == Access Bookkeeping ==
    /// Records a read at `now`.
    pub fn touch(&mut self, now: u64) {
        self.last_accessed_at = now;
        self.access_count += 1;
    }

    // == Promotion Copy ==
    /// Returns a fresh copy for insertion into a faster tier.
    ///
    /// Expiry and stored bytes are preserved; creation time and access
    /// counters restart so the copy enters the faster tier as new.
    pub fn promoted_copy(&self) -> Self {
        let now = current_timestamp_ms();
        Self {
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            ..self.clone()
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    ///
    /// Returns `Some(0)` once the item has expired.
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        let now = current_timestamp_ms();
        self.expires_at.map(|expires| expires.saturating_sub(now))
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// CRC32 over stored bytes.
pub fn checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}
