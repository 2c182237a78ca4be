//! # Error Module
//!
//! Error types for the duplicate photo quarantine.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Per-file errors are local** - only setup failures stop a run

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum QuarantineAppError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Hashing error: {0}")]
    Hash(#[from] HashError),

    #[error("Quarantine error: {0}")]
    Quarantine(#[from] QuarantineError),

    #[error("Undo error: {0}")]
    Undo(#[from] UndoError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to render report: {0}")]
    Output(#[from] serde_json::Error),
}

/// Errors that occur while enumerating the scan root
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    RootNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur while decoding or fingerprinting an image
#[derive(Error, Debug)]
pub enum HashError {
    #[error("Unsupported image format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Failed to decode image {path}: {reason}")]
    DecodeError { path: PathBuf, reason: String },

    #[error("Image is empty or corrupted: {path}")]
    EmptyImage { path: PathBuf },

    #[error("Hash computation failed: {0}")]
    ComputationFailed(String),

    #[error("Failed to open image file {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the quarantine protocol
#[derive(Error, Debug)]
pub enum QuarantineError {
    #[error("Could not create quarantine directory {path}: {source}")]
    CreateRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot copy non-regular source file {path}")]
    NonRegularSource { path: PathBuf },

    #[error("Cannot overwrite non-regular destination file {path}")]
    NonRegularDestination { path: PathBuf },

    #[error("Failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move {from} to {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to access manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed manifest entry: {0}")]
    ManifestFormat(#[from] serde_json::Error),
}

/// Errors raised while reversing a quarantine
#[derive(Error, Debug)]
pub enum UndoError {
    #[error("No quarantine directory at {path}")]
    QuarantineMissing { path: PathBuf },

    #[error("Failed to restore {from} to {to}: {source}")]
    Restore {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Quarantine directory {path} is not empty; remaining files were left untouched")]
    QuarantineNotEmpty { path: PathBuf },

    #[error("Failed to walk quarantine directory {path}: {reason}")]
    Walk { path: PathBuf, reason: String },
}

/// Errors that occur with the fingerprint cache
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to open cache database at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Database query failed: {0}")]
    QueryFailed(String),

    #[error("Cache corruption detected at {path}. Delete this file and try again.")]
    Corrupted { path: PathBuf },

    #[error("Failed to serialize fingerprint: {0}")]
    SerializationFailed(String),
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, QuarantineAppError>;
