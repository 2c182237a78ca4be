//! The fingerprint contract consumed by the hash stores.

use crate::error::HashError;
use image::DynamicImage;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A value derived from image content that can be compared to another of its kind.
///
/// Lower distance = more similar images. The scale is fingerprint-specific
/// and may be negative; stores only ever compare it against a threshold.
pub trait Fingerprint: Clone + Send + Sync + std::fmt::Debug {
    fn distance(&self, other: &Self) -> i64;
}

/// Computes a fingerprint from a decoded image
pub trait Fingerprinter: Send + Sync {
    /// The fingerprint shape this algorithm produces
    type Output: Fingerprint + Serialize + DeserializeOwned;

    /// Compute the fingerprint of an already-decoded image
    fn fingerprint(&self, image: &DynamicImage) -> Result<Self::Output, HashError>;

    /// Get the algorithm kind
    fn kind(&self) -> HashAlgorithmKind;
}

/// Available fingerprint algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithmKind {
    /// Average Hash (aHash), matched exactly
    Average,
    /// Difference Hash (dHash), matched exactly
    Difference,
    /// Multi-resolution wavelet signature, matched within a sensitivity
    Multiresolution,
}

impl HashAlgorithmKind {
    /// Stable identifier used in the cache
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithmKind::Average => "avg",
            HashAlgorithmKind::Difference => "diff",
            HashAlgorithmKind::Multiresolution => "fmiq",
        }
    }

    /// Whether this algorithm is served by the threshold store
    pub fn uses_threshold(&self) -> bool {
        matches!(self, HashAlgorithmKind::Multiresolution)
    }

    /// Get a human-readable description of the algorithm
    pub fn description(&self) -> &'static str {
        match self {
            HashAlgorithmKind::Average => {
                "Average Hash (aHash) - bit-identical match on average brightness"
            }
            HashAlgorithmKind::Difference => {
                "Difference Hash (dHash) - bit-identical match on brightness gradients"
            }
            HashAlgorithmKind::Multiresolution => {
                "Multi-resolution wavelet signature - nearest match within the sensitivity"
            }
        }
    }
}

impl std::fmt::Display for HashAlgorithmKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashAlgorithmKind::Average => write!(f, "aHash"),
            HashAlgorithmKind::Difference => write!(f, "dHash"),
            HashAlgorithmKind::Multiresolution => write!(f, "fmiq"),
        }
    }
}

/// Fixed-width hash compared by bitwise identity.
///
/// The exact store keys on this value directly; `distance` is the Hamming
/// distance and is only used when an exact hash is placed in a threshold store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExactHash {
    bytes: Vec<u8>,
}

impl ExactHash {
    /// Create a hash from raw bytes
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Get the raw hash bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Get the hash as a hexadecimal string
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl Fingerprint for ExactHash {
    fn distance(&self, other: &Self) -> i64 {
        let differing: u32 = self
            .bytes
            .iter()
            .zip(other.bytes.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum();
        let length_gap = self.bytes.len().abs_diff(other.bytes.len()) as u32 * 8;
        (differing + length_gap) as i64
    }
}
