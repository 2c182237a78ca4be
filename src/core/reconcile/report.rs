//! Per-file decision log of a reconciliation run.

use super::Decision;
use crate::core::hasher::HashAlgorithmKind;
use crate::core::quarantine::QuarantineOutcome;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What happened to a single scanned file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DecisionKind {
    /// Unreadable or undecodable
    Skipped { reason: String },
    /// First member of a new cluster
    Inserted { resolution: u64 },
    /// Matched an earlier file
    Matched {
        decision: Decision,
        kept: PathBuf,
        kept_resolution: u64,
        discarded: PathBuf,
        discarded_resolution: u64,
        quarantine: QuarantineOutcome,
    },
}

/// One entry of the decision log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub path: PathBuf,
    #[serde(flatten)]
    pub kind: DecisionKind,
}

impl DecisionRecord {
    pub fn is_match(&self) -> bool {
        matches!(self.kind, DecisionKind::Matched { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.kind, DecisionKind::Skipped { .. })
    }

    pub fn quarantine(&self) -> Option<&QuarantineOutcome> {
        match &self.kind {
            DecisionKind::Matched { quarantine, .. } => Some(quarantine),
            _ => None,
        }
    }
}

/// Result of a full reconciliation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub root: PathBuf,
    pub quarantine: PathBuf,
    pub algorithm: HashAlgorithmKind,
    pub dry_run: bool,
    /// In scan order
    pub decisions: Vec<DecisionRecord>,
    /// Non-fatal problems met while enumerating the tree
    pub scan_errors: Vec<String>,
    pub cache_hits: usize,
    pub duration_ms: u64,
}

impl ReconcileReport {
    pub fn total_files(&self) -> usize {
        self.decisions.len()
    }

    pub fn matches(&self) -> usize {
        self.decisions.iter().filter(|d| d.is_match()).count()
    }

    pub fn skipped(&self) -> usize {
        self.decisions.iter().filter(|d| d.is_skipped()).count()
    }

    /// Pairs whose discarded file actually left the tree
    pub fn quarantined(&self) -> usize {
        self.decisions
            .iter()
            .filter_map(DecisionRecord::quarantine)
            .filter(|q| q.discarded_moved())
            .count()
    }

    /// Every copy or move failure, with the file it concerned
    pub fn failures(&self) -> Vec<(&Path, &str)> {
        self.decisions
            .iter()
            .filter_map(|d| d.quarantine().map(|q| (d.path.as_path(), q)))
            .flat_map(|(path, q)| q.errors().map(move |e| (path, e)))
            .collect()
    }

    pub fn is_clean(&self) -> bool {
        self.scan_errors.is_empty() && self.failures().is_empty()
    }
}
