//! Copy and move primitives for the quarantine.
//!
//! The kept file is linked or copied, never moved. The discarded file is
//! renamed, with a copy-verify-remove fallback when rename is not possible
//! (typically across filesystems).
//!
//! Neither primitive ever writes through an existing destination: a stale
//! copy is unlinked first, and a move onto an occupied name is refused.

use crate::error::QuarantineError;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;

/// How a kept file reached the quarantine
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyMethod {
    /// Destination already was the same file
    AlreadyPresent,
    HardLink,
    /// Full byte copy followed by a sync
    Copy,
}

/// Place a copy of `src` at `dst`.
///
/// Tries a hard link first and falls back to a synced byte copy. An
/// unrelated file already at `dst` is unlinked, not truncated, so any other
/// name sharing its inode keeps its contents.
pub fn copy_or_link(src: &Path, dst: &Path) -> Result<CopyMethod, QuarantineError> {
    let src_meta = fs::metadata(src).map_err(|e| QuarantineError::Copy {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    })?;
    if !src_meta.is_file() {
        return Err(QuarantineError::NonRegularSource {
            path: src.to_path_buf(),
        });
    }

    match fs::metadata(dst) {
        Ok(dst_meta) => {
            if !dst_meta.is_file() {
                return Err(QuarantineError::NonRegularDestination {
                    path: dst.to_path_buf(),
                });
            }
            if same_file(src, &src_meta, dst, &dst_meta) {
                return Ok(CopyMethod::AlreadyPresent);
            }
            tracing::debug!(path = %dst.display(), "Replacing stale copy");
            fs::remove_file(dst).map_err(|e| QuarantineError::Copy {
                from: src.to_path_buf(),
                to: dst.to_path_buf(),
                source: e,
            })?;
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(QuarantineError::Copy {
                from: src.to_path_buf(),
                to: dst.to_path_buf(),
                source: e,
            })
        }
    }

    if fs::hard_link(src, dst).is_ok() {
        return Ok(CopyMethod::HardLink);
    }

    copy_contents(src, dst).map_err(|e| QuarantineError::Copy {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    })?;
    Ok(CopyMethod::Copy)
}

fn copy_contents(src: &Path, dst: &Path) -> io::Result<()> {
    let mut reader = File::open(src)?;
    let mut writer = OpenOptions::new().write(true).create_new(true).open(dst)?;
    io::copy(&mut reader, &mut writer)?;
    writer.sync_all()
}

#[cfg(unix)]
fn same_file(_: &Path, a: &fs::Metadata, _: &Path, b: &fs::Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    a.dev() == b.dev() && a.ino() == b.ino()
}

#[cfg(not(unix))]
fn same_file(a: &Path, _: &fs::Metadata, b: &Path, _: &fs::Metadata) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Whether `a` and `b` name the same existing file
pub fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::metadata(a), fs::metadata(b)) {
        (Ok(a_meta), Ok(b_meta)) => same_file(a, &a_meta, b, &b_meta),
        _ => false,
    }
}

/// Move `src` to `dst`, removing it from its original location.
///
/// Fails with `AlreadyExists` when anything occupies `dst`.
pub fn move_file(src: &Path, dst: &Path) -> Result<(), QuarantineError> {
    if fs::symlink_metadata(dst).is_ok() {
        return Err(QuarantineError::Move {
            from: src.to_path_buf(),
            to: dst.to_path_buf(),
            source: io::Error::new(io::ErrorKind::AlreadyExists, "destination already exists"),
        });
    }

    let rename_error = match fs::rename(src, dst) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };

    if !src.is_file() {
        return Err(QuarantineError::Move {
            from: src.to_path_buf(),
            to: dst.to_path_buf(),
            source: rename_error,
        });
    }

    tracing::debug!(
        from = %src.display(),
        "rename failed ({}), falling back to copy",
        rename_error
    );

    copy_verify_remove(src, dst).map_err(|e| QuarantineError::Move {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    })
}

fn copy_verify_remove(src: &Path, dst: &Path) -> io::Result<()> {
    let source_size = fs::metadata(src)?.len();
    copy_contents(src, dst)?;

    // Never delete the source unless the copy is complete
    let dest_size = fs::metadata(dst)?.len();
    if dest_size != source_size {
        let _ = fs::remove_file(dst);
        return Err(io::Error::other(format!(
            "copy verification failed: source {} bytes, dest {} bytes",
            source_size, dest_size
        )));
    }

    if let Err(e) = fs::remove_file(src) {
        let _ = fs::remove_file(dst);
        return Err(e);
    }
    Ok(())
}
