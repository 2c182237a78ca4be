//! Nearest-neighbour store for fingerprints with a distance metric.
//!
//! Queries scan every entry linearly and return the closest record whose
//! distance is within the threshold. On equal distance the entry inserted
//! first wins; replacing a record moves it to the end.

use super::{HashStore, ImageRecord};
use crate::core::hasher::Fingerprint;

/// Bias applied to a raw user sensitivity to obtain the store threshold.
///
/// A raw sensitivity of 0 gives a cutoff of -100 on the multi-resolution
/// score scale; larger values loosen the match.
pub const SENSITIVITY_OFFSET: i64 = -100;

/// Store matching fingerprints within a distance cutoff
#[derive(Debug)]
pub struct ThresholdStore<F> {
    threshold: i64,
    entries: Vec<(F, ImageRecord)>,
}

impl<F> ThresholdStore<F> {
    /// Create a store with an already-biased threshold
    pub fn new(threshold: i64) -> Self {
        Self {
            threshold,
            entries: Vec::new(),
        }
    }

    /// Create a store from a raw user sensitivity
    pub fn from_sensitivity(raw: i64) -> Self {
        Self::new(raw.saturating_add(SENSITIVITY_OFFSET))
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }
}

impl<F: Fingerprint> ThresholdStore<F> {
    fn nearest(&self, fingerprint: &F) -> Option<(usize, i64)> {
        let mut best: Option<(usize, i64)> = None;
        for (index, (stored, _)) in self.entries.iter().enumerate() {
            let distance = stored.distance(fingerprint);
            if distance > self.threshold {
                continue;
            }
            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((index, distance)),
            }
        }
        best
    }
}

impl<F: Fingerprint> HashStore for ThresholdStore<F> {
    type Fingerprint = F;

    fn add(&mut self, record: ImageRecord, fingerprint: &F) {
        self.entries.retain(|(_, stored)| stored.path != record.path);
        self.entries.push((fingerprint.clone(), record));
    }

    fn query(&self, fingerprint: &F) -> Option<&ImageRecord> {
        self.nearest(fingerprint)
            .map(|(index, _)| &self.entries[index].1)
    }

    fn delete(&mut self, record: &ImageRecord, _fingerprint: &F) {
        self.entries.retain(|(_, stored)| stored.path != record.path);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
