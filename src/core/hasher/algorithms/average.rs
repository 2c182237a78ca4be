//! Average Hash (aHash) implementation.
//!
//! aHash works by:
//! 1. Resizing the image to hash_size x hash_size
//! 2. Converting to grayscale
//! 3. Computing the average brightness
//! 4. For each pixel: if brighter than average, set bit to 1, else 0
//!
//! Two images match only when every bit agrees.

use super::super::traits::{ExactHash, Fingerprinter, HashAlgorithmKind};
use crate::error::HashError;
use image::DynamicImage;
use image_hasher::{HashAlg, HasherConfig};

/// Average Hash (aHash) implementation
pub struct AverageHasher {
    hasher: image_hasher::Hasher,
}

impl AverageHasher {
    /// Create a new aHash hasher producing `hash_size * hash_size` bits
    pub fn new(hash_size: u32) -> Self {
        let hasher = HasherConfig::new()
            .hash_size(hash_size, hash_size)
            .hash_alg(HashAlg::Mean)
            .to_hasher();

        Self { hasher }
    }
}

impl Default for AverageHasher {
    fn default() -> Self {
        Self::new(8)
    }
}

impl Fingerprinter for AverageHasher {
    type Output = ExactHash;

    fn fingerprint(&self, image: &DynamicImage) -> Result<ExactHash, HashError> {
        let hash = self.hasher.hash_image(image);
        Ok(ExactHash::new(hash.as_bytes().to_vec()))
    }

    fn kind(&self) -> HashAlgorithmKind {
        HashAlgorithmKind::Average
    }
}
