//! Multi-resolution wavelet signature.
//!
//! Follows the "fast multiresolution image querying" idea:
//! 1. Downscale to 128x128 grayscale
//! 2. Run a standard 2D Haar wavelet decomposition
//! 3. Keep the average luminance and the positions and signs of the
//!    strongest coefficients
//!
//! Two signatures are compared with a signed score: a penalty for differing
//! luminance minus a bonus for every strong coefficient they share. Identical
//! images score well below zero, unrelated images score near or above it.
//! Completely flat images have no coefficients and never match anything.

use super::super::resize::resize_to_grayscale;
use super::super::traits::{Fingerprint, Fingerprinter, HashAlgorithmKind};
use crate::error::HashError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::f64::consts::SQRT_2;

/// Side length of the square the image is reduced to
pub const SIGNATURE_SIZE: usize = 128;

/// Number of coefficients kept per signature
pub const TOP_COEFFICIENTS: usize = 40;

/// Weight of the luminance term (index 0) and of matching coefficients per bin
const BIN_WEIGHTS: [f64; 6] = [5.00, 0.83, 1.01, 0.52, 0.47, 0.30];

/// Scores are reported as integers at this scale
const SCORE_SCALE: f64 = 10.0;

const NEGLIGIBLE: f64 = 1e-9;

/// Wavelet signature of an image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiresSignature {
    /// Average luminance in 0.0..=1.0
    luma: f64,
    /// Strongest coefficients as signed indices (`-i` for negative), sorted
    coefficients: Vec<i32>,
}

impl MultiresSignature {
    /// Average luminance in 0.0..=1.0
    pub fn luma(&self) -> f64 {
        self.luma
    }

    /// Number of retained coefficients
    pub fn coefficient_count(&self) -> usize {
        self.coefficients.len()
    }

    fn from_grid(grid: &mut [f64]) -> Self {
        let luma = grid.iter().sum::<f64>() / grid.len() as f64;
        haar_2d(grid, SIGNATURE_SIZE);

        let mut ranked: Vec<(usize, f64)> = grid
            .iter()
            .copied()
            .enumerate()
            .skip(1)
            .filter(|(_, value)| value.abs() > NEGLIGIBLE)
            .collect();
        ranked.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()).then(a.0.cmp(&b.0)));
        ranked.truncate(TOP_COEFFICIENTS);

        let mut coefficients: Vec<i32> = ranked
            .into_iter()
            .map(|(index, value)| {
                let index = index as i32;
                if value < 0.0 {
                    -index
                } else {
                    index
                }
            })
            .collect();
        coefficients.sort_unstable();

        Self { luma, coefficients }
    }
}

fn bin(signed_index: i32) -> usize {
    let index = signed_index.unsigned_abs() as usize;
    let (row, col) = (index / SIGNATURE_SIZE, index % SIGNATURE_SIZE);
    row.max(col).min(BIN_WEIGHTS.len() - 1)
}

impl Fingerprint for MultiresSignature {
    fn distance(&self, other: &Self) -> i64 {
        let mut score = BIN_WEIGHTS[0] * (self.luma - other.luma).abs();

        let (mut i, mut j) = (0, 0);
        while i < self.coefficients.len() && j < other.coefficients.len() {
            match self.coefficients[i].cmp(&other.coefficients[j]) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    score -= BIN_WEIGHTS[bin(self.coefficients[i])];
                    i += 1;
                    j += 1;
                }
            }
        }

        (score * SCORE_SCALE).round() as i64
    }
}

/// In-place full 1D Haar decomposition; `data.len()` must be a power of two
fn haar_1d(data: &mut [f64], scratch: &mut [f64]) {
    let mut len = data.len();
    while len > 1 {
        let half = len / 2;
        for i in 0..half {
            let (a, b) = (data[2 * i], data[2 * i + 1]);
            scratch[i] = (a + b) / SQRT_2;
            scratch[half + i] = (a - b) / SQRT_2;
        }
        data[..len].copy_from_slice(&scratch[..len]);
        len = half;
    }
}

/// Standard decomposition: every row fully, then every column fully
fn haar_2d(grid: &mut [f64], size: usize) {
    let mut scratch = vec![0.0; size];
    for row in grid.chunks_mut(size) {
        haar_1d(row, &mut scratch);
    }

    let mut column = vec![0.0; size];
    for col in 0..size {
        for row in 0..size {
            column[row] = grid[row * size + col];
        }
        haar_1d(&mut column, &mut scratch);
        for row in 0..size {
            grid[row * size + col] = column[row];
        }
    }
}

/// Produces [`MultiresSignature`]s
#[derive(Debug, Default)]
pub struct MultiresHasher;

impl MultiresHasher {
    pub fn new() -> Self {
        Self
    }
}

impl Fingerprinter for MultiresHasher {
    type Output = MultiresSignature;

    fn fingerprint(&self, image: &DynamicImage) -> Result<MultiresSignature, HashError> {
        let side = SIGNATURE_SIZE as u32;
        let gray = resize_to_grayscale(image, side, side)?;

        let mut grid: Vec<f64> = gray.pixels().map(|p| p[0] as f64 / 255.0).collect();
        Ok(MultiresSignature::from_grid(&mut grid))
    }

    fn kind(&self) -> HashAlgorithmKind {
        HashAlgorithmKind::Multiresolution
    }
}
