//! Append-only record of every file placed in the quarantine.
//!
//! One JSON object per line in `<quarantine>/.manifest.jsonl`. Undo reads it
//! to map each quarantine file back to its original location without
//! relying on the file name.

use super::naming::Role;
use crate::error::QuarantineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// File name of the manifest inside the quarantine root
pub const MANIFEST_FILE: &str = ".manifest.jsonl";

/// One quarantined file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Run that produced the entry
    pub run_id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub tag: String,
    pub role: Role,
    /// Location relative to the quarantine root
    pub quarantined: PathBuf,
    /// Location relative to the scan root
    pub original: PathBuf,
}

/// Handle on a quarantine's manifest file
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
}

impl Manifest {
    /// The manifest belonging to the quarantine rooted at `quarantine_root`
    pub fn in_quarantine(quarantine_root: &Path) -> Self {
        Self {
            path: quarantine_root.join(MANIFEST_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Append entries, creating the file if needed
    pub fn append(&self, entries: &[ManifestEntry]) -> Result<(), QuarantineError> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut out = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;

        let mut buffer = String::new();
        for entry in entries {
            buffer.push_str(&serde_json::to_string(entry)?);
            buffer.push('\n');
        }
        out.write_all(buffer.as_bytes())
            .map_err(|e| self.io_error(e))
    }

    /// Read every well-formed entry; a missing manifest is empty
    pub fn load(&self) -> Result<Vec<ManifestEntry>, QuarantineError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };

        let mut entries = Vec::new();
        for (number, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| self.io_error(e))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ManifestEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!(
                    manifest = %self.path.display(),
                    line = number + 1,
                    "Skipping malformed manifest entry: {}",
                    e
                ),
            }
        }
        Ok(entries)
    }

    /// Entries keyed by their quarantine-relative path; later lines win
    pub fn index(&self) -> Result<HashMap<PathBuf, ManifestEntry>, QuarantineError> {
        Ok(self
            .load()?
            .into_iter()
            .map(|entry| (entry.quarantined.clone(), entry))
            .collect())
    }

    fn io_error(&self, source: io::Error) -> QuarantineError {
        QuarantineError::Manifest {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn entry(role: Role, quarantined: &str, original: &str) -> ManifestEntry {
        ManifestEntry {
            run_id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            tag: "abcde".to_string(),
            role,
            quarantined: PathBuf::from(quarantined),
            original: PathBuf::from(original),
        }
    }

    #[test]
    fn missing_manifest_loads_empty() {
        let temp = TempDir::new().unwrap();
        let manifest = Manifest::in_quarantine(temp.path());

        assert!(!manifest.exists());
        assert!(manifest.load().unwrap().is_empty());
    }

    #[test]
    fn appended_entries_are_loaded_in_order() {
        let temp = TempDir::new().unwrap();
        let manifest = Manifest::in_quarantine(temp.path());

        manifest
            .append(&[entry(Role::Kept, "abcde_KEPT_a.jpg", "a.jpg")])
            .unwrap();
        manifest
            .append(&[entry(Role::Discarded, "abcde_GONE_b.jpg", "b.jpg")])
            .unwrap();

        let loaded = manifest.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].role, Role::Kept);
        assert_eq!(loaded[1].original, PathBuf::from("b.jpg"));
    }

    #[test]
    fn entries_are_one_json_object_per_line() {
        let temp = TempDir::new().unwrap();
        let manifest = Manifest::in_quarantine(temp.path());
        manifest
            .append(&[
                entry(Role::Kept, "abcde_KEPT_a.jpg", "a.jpg"),
                entry(Role::Discarded, "abcde_GONE_b.jpg", "b.jpg"),
            ])
            .unwrap();

        let raw = fs::read_to_string(manifest.path()).unwrap();
        let lines: Vec<_> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("\"role\":\"discarded\""));
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let temp = TempDir::new().unwrap();
        let manifest = Manifest::in_quarantine(temp.path());
        manifest
            .append(&[entry(Role::Discarded, "abcde_GONE_b.jpg", "b.jpg")])
            .unwrap();
        let mut raw = fs::read_to_string(manifest.path()).unwrap();
        raw.push_str("{not json}\n");
        fs::write(manifest.path(), raw).unwrap();

        assert_eq!(manifest.load().unwrap().len(), 1);
    }

    #[test]
    fn index_keys_by_quarantined_path() {
        let temp = TempDir::new().unwrap();
        let manifest = Manifest::in_quarantine(temp.path());
        manifest
            .append(&[entry(Role::Discarded, "sub/abcde_GONE_b.jpg", "sub/b.jpg")])
            .unwrap();

        let index = manifest.index().unwrap();
        let found = &index[&PathBuf::from("sub/abcde_GONE_b.jpg")];
        assert_eq!(found.original, PathBuf::from("sub/b.jpg"));
    }
}
