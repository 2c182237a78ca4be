//! # Core Module
//!
//! The duplicate detection and reconciliation engine.
//!
//! ## Modules
//! - `scanner` - Discovers images under the scan root
//! - `hasher` - Decodes images and computes fingerprints
//! - `store` - Remembers the best image of every visual cluster
//! - `reconcile` - Decides which copy of a match stays in place
//! - `quarantine` - Moves the losing copy aside, reversibly
//! - `undo` - Reverses a quarantine
//! - `cache` - Persists fingerprints to avoid recomputation
//! - `pipeline` - Orchestrates the full workflow

pub mod cache;
pub mod hasher;
pub mod pipeline;
pub mod quarantine;
pub mod reconcile;
pub mod scanner;
pub mod store;
pub mod undo;

// Re-export commonly used types
pub use hasher::{ExactHash, Fingerprint, Fingerprinter, HashAlgorithmKind, MultiresSignature};
pub use pipeline::Pipeline;
pub use reconcile::{Decision, DecisionKind, DecisionRecord, ReconcileReport};
pub use scanner::ImageFile;
pub use store::{ExactStore, HashStore, ImageRecord, ThresholdStore};
pub use undo::{Undo, UndoReport};
