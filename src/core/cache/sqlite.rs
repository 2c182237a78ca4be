//! SQLite cache backend for persistent storage.

use super::{CacheBackend, CacheEntry, CacheStats};
use crate::core::hasher::HashAlgorithmKind;
use crate::error::CacheError;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// SQLite-backed persistent cache
///
/// Uses WAL (Write-Ahead Logging) mode so readers proceed while a batch
/// is being written.
pub struct SqliteCache {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteCache {
    /// Open or create a cache database at the given path
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::OpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let conn = Connection::open(path).map_err(|e| CacheError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             CREATE TABLE IF NOT EXISTS fingerprints (
                path TEXT NOT NULL,
                algorithm TEXT NOT NULL,
                fingerprint BLOB NOT NULL,
                width INTEGER NOT NULL,
                height INTEGER NOT NULL,
                file_size INTEGER NOT NULL,
                file_modified INTEGER NOT NULL,
                cached_at INTEGER NOT NULL,
                PRIMARY KEY (path, algorithm)
             );",
        )
        .map_err(|e| CacheError::QueryFailed(e.to_string()))?;

        tracing::debug!(path = %path.display(), "Opened fingerprint cache");

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::Corrupted {
            path: self.db_path.clone(),
        })
    }

    /// Convert SystemTime to Unix timestamp
    fn to_timestamp(time: SystemTime) -> i64 {
        time.duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs() as i64
    }

    /// Convert Unix timestamp to SystemTime
    fn from_timestamp(timestamp: i64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(timestamp.max(0) as u64)
    }

    fn insert(conn: &Connection, entry: &CacheEntry) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT OR REPLACE INTO fingerprints
             (path, algorithm, fingerprint, width, height, file_size, file_modified, cached_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                entry.path.to_string_lossy(),
                entry.algorithm.as_str(),
                entry.fingerprint,
                entry.width,
                entry.height,
                entry.file_size as i64,
                Self::to_timestamp(entry.file_modified),
                Self::to_timestamp(entry.cached_at),
            ],
        )
    }
}

impl CacheBackend for SqliteCache {
    fn get(
        &self,
        path: &Path,
        algorithm: HashAlgorithmKind,
        current_size: u64,
        current_modified: SystemTime,
    ) -> Result<Option<CacheEntry>, CacheError> {
        let conn = self.lock()?;

        let entry = conn
            .query_row(
                "SELECT fingerprint, width, height, file_size, file_modified, cached_at
                 FROM fingerprints WHERE path = ? AND algorithm = ?",
                params![path.to_string_lossy(), algorithm.as_str()],
                |row| {
                    Ok(CacheEntry {
                        path: path.to_path_buf(),
                        algorithm,
                        fingerprint: row.get(0)?,
                        width: row.get(1)?,
                        height: row.get(2)?,
                        file_size: row.get::<_, i64>(3)? as u64,
                        file_modified: Self::from_timestamp(row.get(4)?),
                        cached_at: Self::from_timestamp(row.get(5)?),
                    })
                },
            )
            .optional()
            .map_err(|e| CacheError::QueryFailed(e.to_string()))?;

        Ok(entry.filter(|entry| entry.is_valid_for(current_size, current_modified)))
    }

    fn set(&self, entry: CacheEntry) -> Result<(), CacheError> {
        let conn = self.lock()?;
        Self::insert(&conn, &entry).map_err(|e| CacheError::QueryFailed(e.to_string()))?;
        Ok(())
    }

    fn set_batch(&self, entries: &[CacheEntry]) -> Result<(), CacheError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| CacheError::QueryFailed(e.to_string()))?;

        for entry in entries {
            Self::insert(&tx, entry).map_err(|e| CacheError::QueryFailed(e.to_string()))?;
        }

        tx.commit()
            .map_err(|e| CacheError::QueryFailed(e.to_string()))
    }

    fn remove(&self, path: &Path) -> Result<(), CacheError> {
        let conn = self.lock()?;

        conn.execute(
            "DELETE FROM fingerprints WHERE path = ?",
            [path.to_string_lossy()],
        )
        .map_err(|e| CacheError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        let conn = self.lock()?;

        conn.execute("DELETE FROM fingerprints", [])
            .map_err(|e| CacheError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    fn stats(&self) -> Result<CacheStats, CacheError> {
        let conn = self.lock()?;

        conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(LENGTH(fingerprint)), 0), MIN(cached_at), MAX(cached_at)
             FROM fingerprints",
            [],
            |row| {
                Ok(CacheStats {
                    total_entries: row.get::<_, i64>(0)? as usize,
                    total_size_bytes: row.get::<_, i64>(1)? as u64,
                    oldest_entry: row.get::<_, Option<i64>>(2)?.map(Self::from_timestamp),
                    newest_entry: row.get::<_, Option<i64>>(3)?.map(Self::from_timestamp),
                })
            },
        )
        .map_err(|e| CacheError::QueryFailed(e.to_string()))
    }

    fn prune_orphans(&self) -> Result<usize, CacheError> {
        let conn = self.lock()?;

        let paths: Vec<String> = {
            let mut stmt = conn
                .prepare("SELECT DISTINCT path FROM fingerprints")
                .map_err(|e| CacheError::QueryFailed(e.to_string()))?;
            let rows = stmt
                .query_map([], |row| row.get(0))
                .map_err(|e| CacheError::QueryFailed(e.to_string()))?;
            rows.filter_map(|r| r.ok()).collect()
        };

        let mut count = 0;
        for path in paths {
            if !Path::new(&path).exists() {
                count += conn
                    .execute("DELETE FROM fingerprints WHERE path = ?", [&path])
                    .map_err(|e| CacheError::QueryFailed(e.to_string()))?;
            }
        }

        Ok(count)
    }
}
