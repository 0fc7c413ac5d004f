//! Value Transform Module
//!
//! Reversible transforms applied to values before they are stored and
//! undone on read: LZ4 compression and ChaCha20-Poly1305 authenticated
//! encryption. Checksums and tier budgets always see the transformed bytes.

use std::fmt;
use std::sync::Arc;

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;

use crate::error::{CacheError, Result};

/// Length of the per-item nonce prepended to ciphertext.
pub const NONCE_LEN: usize = 12;

const TAG_RAW: u8 = 0;
const TAG_LZ4: u8 = 1;

// == Transform Trait ==
pub trait Transform: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn encode(&self, data: &[u8]) -> Result<Vec<u8>>;

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>>;
}

// == LZ4 ==
/// LZ4 block compression with a one-byte header.
///
/// Inputs shorter than `min_bytes`, or inputs that do not shrink, are
/// stored raw behind a `0` tag.
#[derive(Debug, Clone)]
pub struct Lz4Transform {
    min_bytes: usize,
    level: i32,
}

impl Lz4Transform {
    pub fn new(min_bytes: usize) -> Self {
        Self {
            min_bytes,
            level: 4,
        }
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }
}

impl Default for Lz4Transform {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl Transform for Lz4Transform {
    fn name(&self) -> &'static str {
        "lz4"
    }

    fn encode(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() >= self.min_bytes {
            let compressed = lz4::block::compress(
                data,
                Some(lz4::block::CompressionMode::HIGHCOMPRESSION(self.level)),
                true,
            )
            .map_err(|e| CacheError::Transform(format!("lz4 compress: {}", e)))?;

            if compressed.len() < data.len() {
                let mut out = Vec::with_capacity(compressed.len() + 1);
                out.push(TAG_LZ4);
                out.extend_from_slice(&compressed);
                return Ok(out);
            }
        }

        let mut out = Vec::with_capacity(data.len() + 1);
        out.push(TAG_RAW);
        out.extend_from_slice(data);
        Ok(out)
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>> {
        match data.split_first() {
            Some((&TAG_RAW, rest)) => Ok(rest.to_vec()),
            Some((&TAG_LZ4, rest)) => lz4::block::decompress(rest, None)
                .map_err(|e| CacheError::Transform(format!("lz4 decompress: {}", e))),
            Some((tag, _)) => Err(CacheError::Transform(format!(
                "unknown compression tag {}",
                tag
            ))),
            None => Err(CacheError::Transform("empty compressed payload".into())),
        }
    }
}

// == AEAD ==
/// ChaCha20-Poly1305 with a fresh random nonce per value.
///
/// Output layout: `nonce (12 bytes) || ciphertext+tag`.
#[derive(Clone)]
pub struct AeadTransform {
    cipher: ChaCha20Poly1305,
}

impl AeadTransform {
    pub fn new(key: [u8; 32]) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(&key)),
        }
    }

    /// Parses a 64-character hex key.
    pub fn from_hex(key_hex: &str) -> Result<Self> {
        let bytes = hex::decode(key_hex.trim())
            .map_err(|e| CacheError::Config(format!("encryption key is not valid hex: {}", e)))?;
        let key = <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| {
            CacheError::Config(format!(
                "encryption key must be 32 bytes (64 hex characters), got {} bytes",
                bytes.len()
            ))
        })?;
        Ok(Self::new(key))
    }
}

impl fmt::Debug for AeadTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AeadTransform(chacha20poly1305)")
    }
}

impl Transform for AeadTransform {
    fn name(&self) -> &'static str {
        "chacha20poly1305"
    }

    fn encode(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, data)
            .map_err(|_| CacheError::Internal("encryption failed".into()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() < NONCE_LEN {
            return Err(CacheError::Integrity("ciphertext too short".into()));
        }
        let (nonce_bytes, ciphertext) = data.split_at(NONCE_LEN);

        self.cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CacheError::Integrity("authentication failed".into()))
    }
}

// == Pipeline ==
/// Ordered transforms; encode runs front to back, decode back to front.
#[derive(Debug, Clone, Default)]
pub struct TransformPipeline {
    stages: Vec<Arc<dyn Transform>>,
}

impl TransformPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stage(mut self, stage: Arc<dyn Transform>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn encode(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut buf = data.to_vec();
        for stage in &self.stages {
            buf = stage.encode(&buf)?;
        }
        Ok(buf)
    }

    pub fn decode(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut buf = data.to_vec();
        for stage in self.stages.iter().rev() {
            buf = stage.decode(&buf)?;
        }
        Ok(buf)
    }
}
