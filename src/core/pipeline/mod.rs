//! # Pipeline Module
//!
//! Orchestrates a full reconciliation run.
//!
//! ## Pipeline Stages
//! 1. **Scan** - Discover every image under the scan root
//! 2. **Fingerprint** - Decode and fingerprint each image (with caching)
//! 3. **Reconcile** - Feed fingerprints through the store in scan order and
//!    quarantine the lower-resolution file of every match
//!
//! ## Parallelism
//! Uses rayon for decoding and fingerprinting only. Stage 3 is strictly
//! sequential: the store and every filesystem mutation stay on one thread.

mod executor;

pub use executor::{Pipeline, PipelineBuilder, PipelineConfig};
