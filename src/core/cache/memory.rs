//! In-memory cache backend for testing.

use super::{CacheBackend, CacheEntry, CacheStats};
use crate::core::hasher::HashAlgorithmKind;
use crate::error::CacheError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

type Key = (PathBuf, HashAlgorithmKind);

/// In-memory cache backend
///
/// Useful for testing and scenarios where persistence isn't needed.
pub struct InMemoryCache {
    entries: RwLock<HashMap<Key, CacheEntry>>,
}

impl InMemoryCache {
    /// Create a new in-memory cache
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<Key, CacheEntry>>, CacheError> {
        self.entries.read().map_err(|_| CacheError::Corrupted {
            path: PathBuf::from("memory"),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<Key, CacheEntry>>, CacheError> {
        self.entries.write().map_err(|_| CacheError::Corrupted {
            path: PathBuf::from("memory"),
        })
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBackend for InMemoryCache {
    fn get(
        &self,
        path: &Path,
        algorithm: HashAlgorithmKind,
        current_size: u64,
        current_modified: SystemTime,
    ) -> Result<Option<CacheEntry>, CacheError> {
        let entries = self.read()?;

        Ok(entries
            .get(&(path.to_path_buf(), algorithm))
            .filter(|entry| entry.is_valid_for(current_size, current_modified))
            .cloned())
    }

    fn set(&self, entry: CacheEntry) -> Result<(), CacheError> {
        self.write()?
            .insert((entry.path.clone(), entry.algorithm), entry);
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<(), CacheError> {
        self.write()?.retain(|(stored, _), _| stored != path);
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        self.write()?.clear();
        Ok(())
    }

    fn stats(&self) -> Result<CacheStats, CacheError> {
        let entries = self.read()?;

        Ok(CacheStats {
            total_entries: entries.len(),
            total_size_bytes: entries.values().map(|e| e.fingerprint.len() as u64).sum(),
            oldest_entry: entries.values().map(|e| e.cached_at).min(),
            newest_entry: entries.values().map(|e| e.cached_at).max(),
        })
    }

    fn prune_orphans(&self) -> Result<usize, CacheError> {
        let mut entries = self.write()?;

        let before = entries.len();
        entries.retain(|(path, _), _| path.exists());
        Ok(before - entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::test_support::entry;

    #[test]
    fn cache_miss_returns_none() {
        let cache = InMemoryCache::new();
        let result = cache
            .get(
                Path::new("/nonexistent.jpg"),
                HashAlgorithmKind::Average,
                1000,
                SystemTime::now(),
            )
            .unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn cache_hit_returns_entry() {
        let cache = InMemoryCache::new();
        let stored = entry("/test.jpg", HashAlgorithmKind::Average);
        let modified = stored.file_modified;
        cache.set(stored).unwrap();

        let result = cache
            .get(Path::new("/test.jpg"), HashAlgorithmKind::Average, 1000, modified)
            .unwrap()
            .unwrap();

        assert_eq!(result.fingerprint, b"[222,173,190,239]");
        assert_eq!(result.width, 800);
    }

    #[test]
    fn other_algorithm_misses() {
        let cache = InMemoryCache::new();
        let stored = entry("/test.jpg", HashAlgorithmKind::Average);
        let modified = stored.file_modified;
        cache.set(stored).unwrap();

        let result = cache
            .get(
                Path::new("/test.jpg"),
                HashAlgorithmKind::Multiresolution,
                1000,
                modified,
            )
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn modified_file_invalidates_cache() {
        let cache = InMemoryCache::new();
        let stored = entry("/test.jpg", HashAlgorithmKind::Average);
        let later = stored.file_modified + std::time::Duration::from_secs(60);
        cache.set(stored).unwrap();

        let result = cache
            .get(Path::new("/test.jpg"), HashAlgorithmKind::Average, 1000, later)
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn remove_drops_every_algorithm_for_path() {
        let cache = InMemoryCache::new();
        cache.set(entry("/a.jpg", HashAlgorithmKind::Average)).unwrap();
        cache.set(entry("/a.jpg", HashAlgorithmKind::Difference)).unwrap();
        cache.set(entry("/b.jpg", HashAlgorithmKind::Average)).unwrap();

        cache.remove(Path::new("/a.jpg")).unwrap();

        assert_eq!(cache.stats().unwrap().total_entries, 1);
    }

    #[test]
    fn clear_and_stats() {
        let cache = InMemoryCache::new();
        cache.set(entry("/a.jpg", HashAlgorithmKind::Average)).unwrap();
        cache.set(entry("/b.jpg", HashAlgorithmKind::Average)).unwrap();

        let stats = cache.stats().unwrap();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.total_size_bytes, 2 * 17);

        cache.clear().unwrap();
        assert_eq!(cache.stats().unwrap().total_entries, 0);
    }

    #[test]
    fn prune_removes_missing_files() {
        let cache = InMemoryCache::new();
        cache.set(entry("/definitely/missing.jpg", HashAlgorithmKind::Average)).unwrap();

        assert_eq!(cache.prune_orphans().unwrap(), 1);
    }
}
