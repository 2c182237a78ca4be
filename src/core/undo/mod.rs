//! # Undo Module
//!
//! Reverses every quarantine under a scan root.
//!
//! Each file under the quarantine directory is classified by its manifest
//! entry, or failing that by its `<tag>_<marker>_<name>` file name:
//! - `KEPT` copies are removed (the original never moved)
//! - `GONE` files are moved back to where they were found
//!
//! Afterwards the manifest and every now-empty directory are removed with
//! `remove_dir`, never recursively. Unrecognised files stay where they are
//! and keep the quarantine directory alive.
//!
//! A restore overwrites whatever now sits at the original path.

use crate::core::quarantine::{
    move_file, parse_quarantine_name, Manifest, ManifestEntry, Role, DEFAULT_QUARANTINE_DIR,
};
use crate::error::UndoError;
use crate::events::{null_sender, Event, EventSender, UndoEvent};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A discarded file moved back into the tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoredFile {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// An entry that could not be processed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Result of an undo run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UndoReport {
    pub quarantine: PathBuf,
    pub dry_run: bool,
    /// Kept copies deleted (or that would be)
    pub removed: Vec<PathBuf>,
    /// Discarded files moved back (or that would be)
    pub restored: Vec<RestoredFile>,
    /// Files that are neither in the manifest nor carry a role marker
    pub ignored: Vec<PathBuf>,
    pub errors: Vec<UndoFailure>,
    /// Whether the quarantine directory itself is gone (or would be)
    pub quarantine_removed: bool,
}

impl UndoReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.ignored.is_empty()
    }
}

/// How a quarantine file is to be reversed
#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    RemoveCopy,
    Restore(PathBuf),
}

/// Reverses the quarantine of one scan root
#[derive(Debug, Clone)]
pub struct Undo {
    scan_root: PathBuf,
    quarantine: PathBuf,
    dry_run: bool,
}

impl Undo {
    /// Undo the default quarantine under `scan_root`
    pub fn new(scan_root: impl Into<PathBuf>) -> Self {
        let scan_root = scan_root.into();
        Self {
            quarantine: scan_root.join(DEFAULT_QUARANTINE_DIR),
            scan_root,
            dry_run: false,
        }
    }

    /// Report planned actions without performing them
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Use a different quarantine directory; relative paths are under the scan root
    pub fn quarantine_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.quarantine = self.scan_root.join(dir);
        self
    }

    pub fn quarantine(&self) -> &Path {
        &self.quarantine
    }

    pub fn run(&self) -> Result<UndoReport, UndoError> {
        self.run_with_events(&null_sender())
    }

    /// Fails only when there is no quarantine directory to undo
    pub fn run_with_events(&self, events: &EventSender) -> Result<UndoReport, UndoError> {
        if !self.quarantine.is_dir() {
            return Err(UndoError::QuarantineMissing {
                path: self.quarantine.clone(),
            });
        }

        events.send(Event::Undo(UndoEvent::Started {
            quarantine: self.quarantine.clone(),
        }));
        tracing::info!(quarantine = %self.quarantine.display(), dry_run = self.dry_run, "Undoing quarantine");

        let mut report = UndoReport {
            quarantine: self.quarantine.clone(),
            dry_run: self.dry_run,
            ..Default::default()
        };

        let manifest = Manifest::in_quarantine(&self.quarantine);
        let index = match manifest.index() {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!("Ignoring unreadable manifest, falling back to file names: {}", e);
                HashMap::new()
            }
        };

        for path in self.quarantined_files(&manifest, &mut report) {
            match self.classify(&path, &index) {
                Some(action) => self.reverse(&path, action, events, &mut report),
                None => {
                    tracing::warn!(path = %path.display(), "Unrecognised file left in quarantine");
                    report.ignored.push(path);
                }
            }
        }

        if self.dry_run {
            self.preview_clean_up(&mut report);
        } else {
            self.clean_up(&manifest, &mut report);
        }

        events.send(Event::Undo(UndoEvent::Completed {
            restored: report.restored.len(),
            removed: report.removed.len(),
        }));
        Ok(report)
    }

    fn quarantined_files(&self, manifest: &Manifest, report: &mut UndoReport) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.quarantine).sort_by_file_name() {
            match entry {
                Ok(entry) if entry.file_type().is_dir() => {}
                Ok(entry) if entry.path() == manifest.path() => {}
                Ok(entry) => files.push(entry.into_path()),
                Err(e) => {
                    let error = UndoError::Walk {
                        path: e.path().map(Path::to_path_buf).unwrap_or_default(),
                        reason: e.to_string(),
                    };
                    tracing::warn!("{}", error);
                    report.errors.push(UndoFailure {
                        path: e.path().map(Path::to_path_buf).unwrap_or_default(),
                        message: error.to_string(),
                    });
                }
            }
        }
        files
    }

    fn classify(&self, path: &Path, index: &HashMap<PathBuf, ManifestEntry>) -> Option<Action> {
        let relative = path.strip_prefix(&self.quarantine).ok()?;

        if let Some(entry) = index.get(relative) {
            return Some(match entry.role {
                Role::Kept => Action::RemoveCopy,
                Role::Discarded => Action::Restore(self.scan_root.join(&entry.original)),
            });
        }

        let file_name = relative.file_name()?.to_str()?;
        let parsed = parse_quarantine_name(file_name)?;
        Some(match parsed.role {
            Role::Kept => Action::RemoveCopy,
            Role::Discarded => {
                let dir = relative.parent().unwrap_or_else(|| Path::new(""));
                Action::Restore(self.scan_root.join(dir).join(parsed.original))
            }
        })
    }

    fn reverse(&self, path: &Path, action: Action, events: &EventSender, report: &mut UndoReport) {
        match action {
            Action::RemoveCopy => {
                if self.dry_run {
                    tracing::info!(path = %path.display(), "[dry-run] would remove kept copy");
                } else if let Err(e) = fs::remove_file(path) {
                    let error = UndoError::Remove {
                        path: path.to_path_buf(),
                        source: e,
                    };
                    return self.fail(path, error, events, report);
                }
                events.send(Event::Undo(UndoEvent::CopyRemoved {
                    path: path.to_path_buf(),
                }));
                report.removed.push(path.to_path_buf());
            }
            Action::Restore(target) => {
                if self.dry_run {
                    tracing::info!(
                        from = %path.display(),
                        to = %target.display(),
                        "[dry-run] would restore"
                    );
                } else if let Err(e) = restore(path, &target) {
                    let error = UndoError::Restore {
                        from: path.to_path_buf(),
                        to: target,
                        source: e,
                    };
                    return self.fail(path, error, events, report);
                } else {
                    tracing::info!(to = %target.display(), "Restored");
                }
                events.send(Event::Undo(UndoEvent::Restored {
                    from: path.to_path_buf(),
                    to: target.clone(),
                }));
                report.restored.push(RestoredFile {
                    from: path.to_path_buf(),
                    to: target,
                });
            }
        }
    }

    fn fail(&self, path: &Path, error: UndoError, events: &EventSender, report: &mut UndoReport) {
        tracing::error!("{}", error);
        events.send(Event::Undo(UndoEvent::Error {
            path: path.to_path_buf(),
            message: error.to_string(),
        }));
        report.errors.push(UndoFailure {
            path: path.to_path_buf(),
            message: error.to_string(),
        });
    }

    /// Unrecognised files would keep the directory alive
    fn preview_clean_up(&self, report: &mut UndoReport) {
        if report.ignored.is_empty() && report.errors.is_empty() {
            tracing::info!(path = %self.quarantine.display(), "[dry-run] would remove directory");
            report.quarantine_removed = true;
        } else {
            tracing::info!(
                path = %self.quarantine.display(),
                "[dry-run] directory would stay: {} unrecognised file(s)",
                report.ignored.len()
            );
        }
    }

    fn clean_up(&self, manifest: &Manifest, report: &mut UndoReport) {
        // Keep the manifest around while a failed restore may still need it
        if report.errors.is_empty() && manifest.exists() {
            if let Err(e) = fs::remove_file(manifest.path()) {
                tracing::warn!(path = %manifest.path().display(), "Could not remove manifest: {}", e);
            }
        }

        let dirs: Vec<PathBuf> = WalkDir::new(&self.quarantine)
            .contents_first(true)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_dir() && entry.depth() > 0)
            .map(|entry| entry.into_path())
            .collect();
        for dir in dirs {
            if let Err(e) = fs::remove_dir(&dir) {
                tracing::debug!(path = %dir.display(), "Leaving directory in place: {}", e);
            }
        }

        match fs::remove_dir(&self.quarantine) {
            Ok(()) => {
                tracing::info!(path = %self.quarantine.display(), "Removed quarantine directory");
                report.quarantine_removed = true;
            }
            Err(_) => {
                let error = UndoError::QuarantineNotEmpty {
                    path: self.quarantine.clone(),
                };
                tracing::warn!("{}", error);
                report.errors.push(UndoFailure {
                    path: self.quarantine.clone(),
                    message: error.to_string(),
                });
            }
        }
    }
}

fn restore(from: &Path, to: &Path) -> io::Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    // rename replaces a file at `to` by swapping the name, never writing through it
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    if fs::symlink_metadata(to).is_ok_and(|meta| !meta.is_dir()) {
        fs::remove_file(to)?;
    }
    move_file(from, to).map_err(io::Error::other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::quarantine::{pair_tag, quarantine_name};
    use chrono::Utc;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn write(path: &Path, contents: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    /// Lay out a quarantined pair the way the protocol does, without a manifest
    fn quarantine_pair(root: &Path, dir: &str, kept: &str, discarded: &str) -> (PathBuf, PathBuf) {
        let tag = pair_tag(kept, discarded);
        let base = root.join(DEFAULT_QUARANTINE_DIR).join(dir);
        let kept_copy = base.join(quarantine_name(&tag, Role::Kept, kept));
        let gone = base.join(quarantine_name(&tag, Role::Discarded, discarded));
        write(&root.join(kept), b"kept");
        write(&kept_copy, b"kept");
        write(&gone, discarded.as_bytes());
        (kept_copy, gone)
    }

    #[test]
    fn missing_quarantine_is_an_error() {
        let temp = TempDir::new().unwrap();
        let result = Undo::new(temp.path()).run();
        assert!(matches!(result, Err(UndoError::QuarantineMissing { .. })));
    }

    #[test]
    fn undo_by_name_restores_and_removes_quarantine() {
        let temp = TempDir::new().unwrap();
        let (kept_copy, _) = quarantine_pair(temp.path(), "", "a.jpg", "b.jpg");

        let report = Undo::new(temp.path()).run().unwrap();

        assert!(!kept_copy.exists());
        assert_eq!(fs::read(temp.path().join("b.jpg")).unwrap(), b"b.jpg");
        assert!(temp.path().join("a.jpg").exists());
        assert!(report.quarantine_removed);
        assert!(report.is_clean());
        assert!(!temp.path().join(DEFAULT_QUARANTINE_DIR).exists());
    }

    #[test]
    fn undo_restores_into_mirrored_subdirectory() {
        let temp = TempDir::new().unwrap();
        quarantine_pair(temp.path(), "2019/trip", "a.jpg", "b.jpg");

        let report = Undo::new(temp.path()).run().unwrap();

        assert_eq!(report.restored.len(), 1);
        assert_eq!(report.restored[0].to, temp.path().join("2019/trip/b.jpg"));
        assert!(temp.path().join("2019/trip/b.jpg").exists());
        assert!(report.quarantine_removed);
    }

    #[test]
    fn manifest_original_takes_precedence_over_name() {
        let temp = TempDir::new().unwrap();
        let quarantine = temp.path().join(DEFAULT_QUARANTINE_DIR);
        write(&quarantine.join("renamed_by_hand.jpg"), b"payload");
        Manifest::in_quarantine(&quarantine)
            .append(&[ManifestEntry {
                run_id: Uuid::new_v4(),
                recorded_at: Utc::now(),
                tag: "abcde".to_string(),
                role: Role::Discarded,
                quarantined: PathBuf::from("renamed_by_hand.jpg"),
                original: PathBuf::from("album/b.jpg"),
            }])
            .unwrap();

        let report = Undo::new(temp.path()).run().unwrap();

        assert_eq!(fs::read(temp.path().join("album/b.jpg")).unwrap(), b"payload");
        assert!(report.quarantine_removed);
    }

    #[test]
    fn unrecognised_files_keep_quarantine_alive() {
        let temp = TempDir::new().unwrap();
        quarantine_pair(temp.path(), "", "a.jpg", "b.jpg");
        let stray = temp.path().join(DEFAULT_QUARANTINE_DIR).join("notes.txt");
        write(&stray, b"mine");

        let report = Undo::new(temp.path()).run().unwrap();

        assert_eq!(report.ignored, vec![stray.clone()]);
        assert!(stray.exists());
        assert!(!report.quarantine_removed);
        assert!(report.errors[0].message.contains("left untouched"));
        assert!(temp.path().join("b.jpg").exists());
    }

    #[test]
    fn restore_overwrites_existing_file() {
        let temp = TempDir::new().unwrap();
        quarantine_pair(temp.path(), "", "a.jpg", "b.jpg");
        write(&temp.path().join("b.jpg"), b"newcomer");

        Undo::new(temp.path()).run().unwrap();

        assert_eq!(fs::read(temp.path().join("b.jpg")).unwrap(), b"b.jpg");
    }

    #[test]
    fn dry_run_reports_without_touching() {
        let temp = TempDir::new().unwrap();
        let (kept_copy, gone) = quarantine_pair(temp.path(), "", "a.jpg", "b.jpg");

        let report = Undo::new(temp.path()).dry_run(true).run().unwrap();

        assert_eq!(report.removed, vec![kept_copy.clone()]);
        assert_eq!(report.restored[0].from, gone);
        assert!(kept_copy.exists());
        assert!(gone.exists());
        assert!(!temp.path().join("b.jpg").exists());
        assert!(report.quarantine_removed);
        assert!(temp.path().join(DEFAULT_QUARANTINE_DIR).is_dir());
    }

    #[test]
    fn dry_run_reports_directory_kept_by_stray_file() {
        let temp = TempDir::new().unwrap();
        quarantine_pair(temp.path(), "", "a.jpg", "b.jpg");
        write(&temp.path().join(DEFAULT_QUARANTINE_DIR).join("notes.txt"), b"keep");

        let report = Undo::new(temp.path()).dry_run(true).run().unwrap();

        assert_eq!(report.ignored.len(), 1);
        assert!(!report.quarantine_removed);
    }

    #[test]
    fn second_undo_finds_nothing() {
        let temp = TempDir::new().unwrap();
        quarantine_pair(temp.path(), "", "a.jpg", "b.jpg");

        Undo::new(temp.path()).run().unwrap();
        let again = Undo::new(temp.path()).run();

        assert!(matches!(again, Err(UndoError::QuarantineMissing { .. })));
    }

    #[test]
    fn custom_quarantine_directory() {
        let temp = TempDir::new().unwrap();
        let tag = pair_tag("a.jpg", "b.jpg");
        let gone = temp
            .path()
            .join("held")
            .join(quarantine_name(&tag, Role::Discarded, "b.jpg"));
        write(&gone, b"b");

        let report = Undo::new(temp.path()).quarantine_dir("held").run().unwrap();

        assert!(temp.path().join("b.jpg").exists());
        assert!(report.quarantine_removed);
    }
}
