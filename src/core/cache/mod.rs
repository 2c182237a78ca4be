//! # Cache Module
//!
//! Persists fingerprints to avoid decoding unchanged images again.
//!
//! ## Benefits
//! - Re-running on a large tree only decodes new or modified images
//! - Entries are keyed by path and algorithm, so switching `--algo` is safe
//! - Cache invalidation based on file size and modification time
//!
//! ## Backends
//! - `SqliteCache` - Persistent storage using SQLite
//! - `InMemoryCache` - For testing
//!
//! The cache is advisory: every error is logged by the caller and the file
//! is simply fingerprinted again.

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryCache;
pub use sqlite::SqliteCache;
pub use traits::CacheBackend;

use crate::core::hasher::HashAlgorithmKind;
use crate::core::scanner::ImageFile;
use crate::error::CacheError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// A cached fingerprint entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Path to the image
    pub path: PathBuf,
    /// Algorithm that produced the fingerprint
    pub algorithm: HashAlgorithmKind,
    /// The fingerprint, serialized as JSON
    pub fingerprint: Vec<u8>,
    /// Decoded pixel dimensions
    pub width: u32,
    pub height: u32,
    /// File size at time of fingerprinting
    pub file_size: u64,
    /// File modification time at time of fingerprinting
    pub file_modified: SystemTime,
    /// When the entry was cached
    pub cached_at: SystemTime,
}

impl CacheEntry {
    /// Build an entry for a freshly fingerprinted file
    pub fn new<F: Serialize>(
        file: &ImageFile,
        algorithm: HashAlgorithmKind,
        fingerprint: &F,
        (width, height): (u32, u32),
    ) -> Result<Self, CacheError> {
        let fingerprint = serde_json::to_vec(fingerprint)
            .map_err(|e| CacheError::SerializationFailed(e.to_string()))?;

        Ok(Self {
            path: file.path.clone(),
            algorithm,
            fingerprint,
            width,
            height,
            file_size: file.size,
            file_modified: file.modified,
            cached_at: SystemTime::now(),
        })
    }

    /// Decode the stored fingerprint
    pub fn fingerprint<F: DeserializeOwned>(&self) -> Result<F, CacheError> {
        serde_json::from_slice(&self.fingerprint)
            .map_err(|e| CacheError::SerializationFailed(e.to_string()))
    }

    /// Check if this entry is still valid for a file
    pub fn is_valid_for(&self, file_size: u64, file_modified: SystemTime) -> bool {
        // Compare timestamps at second precision (SQLite stores seconds)
        self.file_size == file_size && unix_secs(self.file_modified) == unix_secs(file_modified)
    }
}

fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Cache statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Total number of entries
    pub total_entries: usize,
    /// Total size of cached fingerprints in bytes
    pub total_size_bytes: u64,
    /// Oldest entry timestamp
    pub oldest_entry: Option<SystemTime>,
    /// Newest entry timestamp
    pub newest_entry: Option<SystemTime>,
}
