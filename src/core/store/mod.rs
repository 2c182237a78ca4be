//! # Store Module
//!
//! Remembers one image per visual cluster seen so far.
//!
//! A store maps fingerprint space to at most one retained [`ImageRecord`]
//! per cluster. The reconciler keeps the retained record pointed at the
//! highest-resolution file it has met in that cluster.
//!
//! ## Implementations
//! - [`ExactStore`] - hash map keyed by a bitwise-comparable fingerprint
//! - [`ThresholdStore`] - nearest neighbour within a distance cutoff
//!
//! Store operations never fail: a `None` from [`HashStore::query`] simply
//! means no duplicate is known yet.

mod exact;
mod threshold;

pub use exact::ExactStore;
pub use threshold::{ThresholdStore, SENSITIVITY_OFFSET};

use crate::core::scanner::ImageFile;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;

/// An image that decoded successfully
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Path at the time of the scan
    pub path: PathBuf,
    /// File name component of `path`
    pub name: String,
    pub size: u64,
    pub modified: SystemTime,
    pub width: u32,
    pub height: u32,
    /// `width * height`, the only tie-break criterion
    pub resolution: u64,
}

impl ImageRecord {
    /// Build a record for a scanned file and its decoded dimensions
    pub fn new(file: &ImageFile, width: u32, height: u32) -> Self {
        Self {
            path: file.path.clone(),
            name: file.name(),
            size: file.size,
            modified: file.modified,
            width,
            height,
            resolution: width as u64 * height as u64,
        }
    }
}

/// Cluster memory consulted for every decoded image
pub trait HashStore {
    /// The fingerprint shape this store indexes
    type Fingerprint;

    /// Insert or replace the retained record for the fingerprint's cluster
    fn add(&mut self, record: ImageRecord, fingerprint: &Self::Fingerprint);

    /// The retained record matching `fingerprint`, if any
    fn query(&self, fingerprint: &Self::Fingerprint) -> Option<&ImageRecord>;

    /// Remove the entry for `record`; absent entries are ignored
    fn delete(&mut self, record: &ImageRecord, fingerprint: &Self::Fingerprint);

    /// Number of retained records
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scanner::ImageFormat;

    #[test]
    fn record_resolution_is_pixel_count() {
        let file = ImageFile {
            path: PathBuf::from("/photos/a.jpg"),
            size: 42,
            modified: SystemTime::UNIX_EPOCH,
            format: ImageFormat::Jpeg,
        };

        let record = ImageRecord::new(&file, 800, 600);
        assert_eq!(record.name, "a.jpg");
        assert_eq!(record.resolution, 480_000);
        assert_eq!(record.size, 42);
    }

    #[test]
    fn resolution_does_not_overflow_u32() {
        let record = test_support::record("/big.tif", 70_000, 70_000);
        assert_eq!(record.resolution, 4_900_000_000);
    }
}
