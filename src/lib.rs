//! # Photo Quarantine
//!
//! Finds visually duplicate images in a directory tree, keeps the
//! highest-resolution copy where it is and moves the others into a
//! quarantine directory that a single `--undo` reverses.
//!
//! ## Core Philosophy
//! - **Never delete** - Duplicates are moved aside, not removed
//! - **Resolution decides** - The copy with more pixels always stays
//! - **Fully reversible** - Every quarantine is recorded and can be undone
//!
//! ## Architecture
//! - `core` - The detection and reconciliation engine
//! - `events` - Event-driven progress reporting
//! - `error` - User-friendly error types

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{QuarantineAppError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point. `RUST_LOG`
/// takes precedence; otherwise `default_level` applies.
pub fn init_tracing(default_level: tracing_subscriber::filter::LevelFilter) {
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
