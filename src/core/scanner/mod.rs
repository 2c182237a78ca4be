//! # Scanner Module
//!
//! Discovers image files under a scan root.
//!
//! ## Supported Formats
//! - JPEG (.jpg, .jpeg)
//! - PNG (.png)
//! - GIF (.gif)
//! - WebP (.webp)
//! - BMP (.bmp)
//! - TIFF (.tiff, .tif)
//!
//! The walk is exhaustive and sorted by file name, so a given tree always
//! yields the same sequence. The quarantine directory is never descended into.
//!
//! ## Example
//! ```rust,ignore
//! use photo_quarantine::core::scanner::{ImageScanner, ScanConfig, WalkDirScanner};
//!
//! let scanner = WalkDirScanner::new(ScanConfig::default().exclude(root.join("duplicates")));
//! let files = scanner.scan(&root)?;
//! ```

mod filter;
mod walker;

pub use filter::ImageFilter;
pub use walker::{ScanConfig, WalkDirScanner};

use crate::error::ScanError;
use crate::events::EventSender;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A discovered image file, before decoding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageFile {
    /// Path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modified time
    pub modified: SystemTime,
    /// Format declared by the extension
    pub format: ImageFormat,
}

impl ImageFile {
    /// File name component, lossily converted
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Supported image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
    Bmp,
    Tiff,
    Unknown,
}

impl ImageFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => ImageFormat::Jpeg,
            "png" => ImageFormat::Png,
            "gif" => ImageFormat::Gif,
            "webp" => ImageFormat::WebP,
            "bmp" => ImageFormat::Bmp,
            "tiff" | "tif" => ImageFormat::Tiff,
            _ => ImageFormat::Unknown,
        }
    }

    /// Detect format from a path's extension
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(ImageFormat::Unknown)
    }

    /// Check if this format is supported
    pub fn is_supported(&self) -> bool {
        !matches!(self, ImageFormat::Unknown)
    }
}

/// Result of a scan operation
#[derive(Debug)]
pub struct ScanResult {
    /// Discovered image files in walk order
    pub files: Vec<ImageFile>,
    /// Entries that could not be read (non-fatal)
    pub errors: Vec<ScanError>,
}

/// Trait for image scanners
///
/// Implement this trait to create custom scanners (e.g., for testing).
pub trait ImageScanner: Send + Sync {
    /// Walk `root` and return discovered images
    fn scan(&self, root: &Path) -> Result<ScanResult, ScanError>;

    /// Walk `root` with progress reporting via events
    fn scan_with_events(&self, root: &Path, events: &EventSender)
        -> Result<ScanResult, ScanError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_format_from_extension_lowercase() {
        assert_eq!(ImageFormat::from_extension("jpg"), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_extension("jpeg"), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_extension("png"), ImageFormat::Png);
        assert_eq!(ImageFormat::from_extension("gif"), ImageFormat::Gif);
    }

    #[test]
    fn image_format_from_extension_uppercase() {
        assert_eq!(ImageFormat::from_extension("JPG"), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_extension("PNG"), ImageFormat::Png);
    }

    #[test]
    fn unknown_extension_returns_unknown() {
        assert_eq!(ImageFormat::from_extension("txt"), ImageFormat::Unknown);
        assert!(!ImageFormat::Unknown.is_supported());
        assert!(ImageFormat::Gif.is_supported());
    }

    #[test]
    fn image_file_name_is_last_component() {
        let file = ImageFile {
            path: PathBuf::from("/photos/trip/IMG_6652.jpg"),
            size: 10,
            modified: SystemTime::UNIX_EPOCH,
            format: ImageFormat::Jpeg,
        };
        assert_eq!(file.name(), "IMG_6652.jpg");
    }
}
