//! Difference Hash (dHash) implementation.
//!
//! dHash compares each pixel of a downscaled grayscale image with its
//! neighbour, capturing the direction of brightness gradients rather than
//! absolute brightness.

use super::super::traits::{ExactHash, Fingerprinter, HashAlgorithmKind};
use crate::error::HashError;
use image::DynamicImage;
use image_hasher::{HashAlg, HasherConfig};

/// Difference Hash (dHash) implementation
pub struct DifferenceHasher {
    hasher: image_hasher::Hasher,
}

impl DifferenceHasher {
    /// Create a new dHash hasher
    pub fn new(hash_size: u32) -> Self {
        let hasher = HasherConfig::new()
            .hash_size(hash_size, hash_size)
            .hash_alg(HashAlg::Gradient)
            .to_hasher();

        Self { hasher }
    }
}

impl Default for DifferenceHasher {
    fn default() -> Self {
        Self::new(8)
    }
}

impl Fingerprinter for DifferenceHasher {
    type Output = ExactHash;

    fn fingerprint(&self, image: &DynamicImage) -> Result<ExactHash, HashError> {
        let hash = self.hasher.hash_image(image);
        Ok(ExactHash::new(hash.as_bytes().to_vec()))
    }

    fn kind(&self) -> HashAlgorithmKind {
        HashAlgorithmKind::Difference
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn gradient(width: u32, height: u32, reversed: bool) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |x, _| {
            let step = if reversed { width - 1 - x } else { x };
            let brightness = (step * 255 / (width - 1)) as u8;
            Rgb([brightness, brightness, brightness])
        }))
    }

    #[test]
    fn identical_images_produce_identical_hash() {
        let hasher = DifferenceHasher::default();
        let image = gradient(100, 100, false);

        assert_eq!(
            hasher.fingerprint(&image).unwrap(),
            hasher.fingerprint(&image).unwrap()
        );
    }

    #[test]
    fn opposite_gradients_differ() {
        let hasher = DifferenceHasher::default();

        let forward = hasher.fingerprint(&gradient(100, 100, false)).unwrap();
        let backward = hasher.fingerprint(&gradient(100, 100, true)).unwrap();

        assert_ne!(forward, backward);
    }

    #[test]
    fn kind_returns_difference() {
        assert_eq!(DifferenceHasher::default().kind(), HashAlgorithmKind::Difference);
    }
}
