//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by a reconcile or undo run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Directory walk events
    Scan(ScanEvent),
    /// Decode and fingerprint events
    Fingerprint(FingerprintEvent),
    /// Store lookup and quarantine events
    Reconcile(ReconcileEvent),
    /// Undo events
    Undo(UndoEvent),
    /// Pipeline-level events
    Pipeline(PipelineEvent),
}

/// Events during the directory walk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Walking has started
    Started { root: PathBuf },
    /// An image file was found
    FileFound { path: PathBuf },
    /// An entry could not be read, walking continues
    Error { path: PathBuf, message: String },
    /// Walking completed
    Completed { total_files: usize },
}

/// Events during decoding and fingerprinting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FingerprintEvent {
    /// Fingerprinting has started
    Started { total_files: usize },
    /// Progress update
    Progress(FingerprintProgress),
    /// A file could not be decoded and will be skipped
    Error { path: PathBuf, message: String },
    /// Fingerprinting completed
    Completed {
        total_fingerprinted: usize,
        cache_hits: usize,
    },
}

/// Progress information during fingerprinting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintProgress {
    /// Number of files processed so far
    pub completed: usize,
    /// Total number of files to process
    pub total: usize,
    /// File just processed
    pub current_path: PathBuf,
    /// Number of cache hits so far
    pub cache_hits: usize,
}

/// Events during reconciliation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReconcileEvent {
    /// Reconciliation has started
    Started { total_files: usize },
    /// One more file went through the store
    Progress { processed: usize, total: usize },
    /// A candidate matched a retained record
    Matched { candidate: PathBuf, incumbent: PathBuf },
    /// A pair was written to quarantine
    Quarantined { kept: PathBuf, discarded: PathBuf },
    /// A quarantine step failed, reconciliation continues
    Error { path: PathBuf, message: String },
    /// Reconciliation completed
    Completed { matches: usize },
}

/// Events during undo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UndoEvent {
    /// Undo has started
    Started { quarantine: PathBuf },
    /// A kept copy was removed
    CopyRemoved { path: PathBuf },
    /// A discarded file was moved back
    Restored { from: PathBuf, to: PathBuf },
    /// An entry could not be processed, undo continues
    Error { path: PathBuf, message: String },
    /// Undo completed
    Completed { restored: usize, removed: usize },
}

/// Pipeline-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Pipeline has started
    Started,
    /// Moving to a new phase
    PhaseChanged { phase: PipelinePhase },
    /// Pipeline completed successfully
    Completed { summary: PipelineSummary },
    /// Pipeline encountered a fatal error
    Error { message: String },
}

/// Phases of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    Scanning,
    Fingerprinting,
    Reconciling,
    Undoing,
}

/// Summary of a reconcile run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Image files discovered
    pub total_files: usize,
    /// Files that matched a retained record
    pub matches: usize,
    /// Files moved (or planned to be moved) into quarantine
    pub quarantined: usize,
    /// Files skipped as unsupported or corrupt
    pub skipped: usize,
    /// Whether the run left the filesystem untouched
    pub dry_run: bool,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Scanning => write!(f, "Scanning"),
            PipelinePhase::Fingerprinting => write!(f, "Fingerprinting"),
            PipelinePhase::Reconciling => write!(f, "Reconciling"),
            PipelinePhase::Undoing => write!(f, "Undoing"),
        }
    }
}
