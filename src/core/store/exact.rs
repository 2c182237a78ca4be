//! Exact-match store keyed by the fingerprint value itself.

use super::{HashStore, ImageRecord};
use std::collections::HashMap;
use std::hash::Hash;

/// Store for fingerprints compared by bitwise identity
#[derive(Debug)]
pub struct ExactStore<F> {
    entries: HashMap<F, ImageRecord>,
}

impl<F> ExactStore<F> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<F> Default for ExactStore<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Eq + Hash + Clone> HashStore for ExactStore<F> {
    type Fingerprint = F;

    fn add(&mut self, record: ImageRecord, fingerprint: &F) {
        self.entries.insert(fingerprint.clone(), record);
    }

    fn query(&self, fingerprint: &F) -> Option<&ImageRecord> {
        self.entries.get(fingerprint)
    }

    fn delete(&mut self, record: &ImageRecord, fingerprint: &F) {
        // Only drop the key when it still points at this record
        if self
            .entries
            .get(fingerprint)
            .is_some_and(|stored| stored.path == record.path)
        {
            self.entries.remove(fingerprint);
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
