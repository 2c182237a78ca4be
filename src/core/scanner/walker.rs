//! Directory walking implementation using walkdir.

use super::filter::{is_hidden, ImageFilter};
use super::{ImageFile, ImageScanner, ScanResult};
use crate::error::ScanError;
use crate::events::{null_sender, Event, EventSender, ScanEvent};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Configuration for the directory scanner
#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    /// Whether to include hidden files and directories
    pub include_hidden: bool,
    /// Directories never descended into
    pub excluded_dirs: Vec<PathBuf>,
}

impl ScanConfig {
    /// Skip `dir` and everything below it
    pub fn exclude(mut self, dir: impl Into<PathBuf>) -> Self {
        self.excluded_dirs.push(dir.into());
        self
    }
}

/// Scanner implementation using the walkdir crate
pub struct WalkDirScanner {
    config: ScanConfig,
    filter: ImageFilter,
}

impl WalkDirScanner {
    /// Create a new scanner with the given configuration
    pub fn new(config: ScanConfig) -> Self {
        let filter = ImageFilter::new().with_hidden(config.include_hidden);
        Self { config, filter }
    }

    fn descend_into(&self, entry: &DirEntry, root: &Path) -> bool {
        if !entry.file_type().is_dir() || entry.path() == root {
            return true;
        }
        if !self.config.include_hidden && is_hidden(entry.path()) {
            return false;
        }
        !self
            .config
            .excluded_dirs
            .iter()
            .any(|excluded| entry.path() == excluded.as_path())
    }
}

impl ImageScanner for WalkDirScanner {
    fn scan(&self, root: &Path) -> Result<ScanResult, ScanError> {
        self.scan_with_events(root, &null_sender())
    }

    fn scan_with_events(
        &self,
        root: &Path,
        events: &EventSender,
    ) -> Result<ScanResult, ScanError> {
        if !root.is_dir() {
            return Err(ScanError::RootNotFound {
                path: root.to_path_buf(),
            });
        }

        events.send(Event::Scan(ScanEvent::Started {
            root: root.to_path_buf(),
        }));

        let mut files = Vec::new();
        let mut errors = Vec::new();

        let entries = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| self.descend_into(entry, root));

        for entry_result in entries {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    let error = if e.io_error().map(|io| io.kind())
                        == Some(std::io::ErrorKind::PermissionDenied)
                    {
                        ScanError::PermissionDenied { path: path.clone() }
                    } else {
                        ScanError::ReadDirectory {
                            path: path.clone(),
                            source: std::io::Error::other(e.to_string()),
                        }
                    };

                    tracing::warn!(path = %path.display(), "{}", error);
                    events.send(Event::Scan(ScanEvent::Error {
                        path,
                        message: error.to_string(),
                    }));
                    errors.push(error);
                    continue;
                }
            };

            if entry.file_type().is_dir() || !self.filter.should_include(entry.path()) {
                continue;
            }

            let path = entry.path();
            match fs::metadata(path) {
                Ok(metadata) if metadata.is_file() => {
                    let file = ImageFile {
                        path: path.to_path_buf(),
                        size: metadata.len(),
                        modified: metadata
                            .modified()
                            .unwrap_or(std::time::SystemTime::UNIX_EPOCH),
                        format: self.filter.get_format(path),
                    };

                    events.send(Event::Scan(ScanEvent::FileFound {
                        path: file.path.clone(),
                    }));
                    files.push(file);
                }
                Ok(_) => {}
                Err(e) => {
                    let error = ScanError::ReadDirectory {
                        path: path.to_path_buf(),
                        source: e,
                    };
                    tracing::warn!(path = %path.display(), "{}", error);
                    events.send(Event::Scan(ScanEvent::Error {
                        path: path.to_path_buf(),
                        message: error.to_string(),
                    }));
                    errors.push(error);
                }
            }
        }

        tracing::info!(root = %root.display(), files = files.len(), "Found {} files", files.len());
        events.send(Event::Scan(ScanEvent::Completed {
            total_files: files.len(),
        }));

        Ok(ScanResult { files, errors })
    }
}
