//! # Hasher Module
//!
//! Turns image files into comparable fingerprints.
//!
//! ## Supported Algorithms
//! - **aHash (Average Hash)** - exact match on mean brightness
//! - **dHash (Difference Hash)** - exact match on brightness gradients
//! - **fmiq (Multi-resolution signature)** - nearest match within a sensitivity
//!
//! ## How It Works
//! 1. Decode the file (`zune-jpeg` fast path for JPEG)
//! 2. Downscale to a small grayscale grid (`fast_image_resize`)
//! 3. Derive the fingerprint from the grid
//!
//! ## Example
//! ```rust,ignore
//! use photo_quarantine::core::hasher::{fingerprint_file, AverageHasher};
//!
//! let (hash, decoded) = fingerprint_file(&AverageHasher::new(8), &file)?;
//! println!("{} at {}x{}", hash.to_hex(), decoded.0, decoded.1);
//! ```

mod algorithms;
pub mod decode;
pub mod resize;
mod traits;

pub use algorithms::{AverageHasher, DifferenceHasher, MultiresHasher, MultiresSignature};
pub use decode::DecodedImage;
pub use traits::{ExactHash, Fingerprint, Fingerprinter, HashAlgorithmKind};

use crate::core::scanner::ImageFile;
use crate::error::HashError;

/// Decode `file` and fingerprint it, returning the fingerprint and pixel dimensions
pub fn fingerprint_file<H: Fingerprinter>(
    hasher: &H,
    file: &ImageFile,
) -> Result<(H::Output, (u32, u32)), HashError> {
    let decoded = decode::decode(&file.path, file.format)?;
    let fingerprint = hasher.fingerprint(&decoded.image)?;
    Ok((fingerprint, (decoded.width, decoded.height)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scanner::ImageFormat;
    use image::{Rgb, RgbImage};
    use std::time::SystemTime;
    use tempfile::TempDir;

    #[test]
    fn fingerprint_file_reports_dimensions() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.png");
        RgbImage::from_fn(32, 16, |x, _| Rgb([(x * 8) as u8; 3]))
            .save(&path)
            .unwrap();

        let file = ImageFile {
            path,
            size: 0,
            modified: SystemTime::UNIX_EPOCH,
            format: ImageFormat::Png,
        };
        let (_, dims) = fingerprint_file(&DifferenceHasher::new(8), &file).unwrap();
        assert_eq!(dims, (32, 16));
    }

    #[test]
    fn fingerprint_file_missing_is_io_error() {
        let file = ImageFile {
            path: "/nonexistent/a.png".into(),
            size: 0,
            modified: SystemTime::UNIX_EPOCH,
            format: ImageFormat::Png,
        };
        let result = fingerprint_file(&AverageHasher::new(8), &file);
        assert!(matches!(result, Err(HashError::IoError { .. })));
    }
}
