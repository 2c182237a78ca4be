//! # Quarantine Module
//!
//! Moves the losing file of a duplicate pair out of the tree, reversibly.
//!
//! For a `(kept, discarded)` pair both files land in the quarantine
//! subdirectory that mirrors the discarded file's parent:
//! - `<tag>_KEPT_<kept name>` - a hard link or copy; the kept file stays put
//! - `<tag>_GONE_<discarded name>` - the discarded file itself, renamed
//!
//! When either name is already taken by an unrelated file, typically left
//! over from an earlier run that was never undone, a hex counter is appended
//! to the tag (`abcde1`, `abcde2`, ...) until both names are free. The
//! result still parses as `<tag>_<marker>_<name>`.
//!
//! Each step is attempted independently and a failure in one never aborts
//! the other. Only failing to create the quarantine root stops a run.

mod manifest;
mod naming;
mod transfer;

pub use manifest::{Manifest, ManifestEntry, MANIFEST_FILE};
pub use naming::{
    pair_tag, parse_quarantine_name, quarantine_name, ParsedName, Role, DISCARD_MARKER,
    KEEP_MARKER, TAG_LEN,
};
pub use transfer::{copy_or_link, is_same_file, move_file, CopyMethod};

use crate::core::store::ImageRecord;
use crate::error::QuarantineError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Quarantine directory name under the scan root
pub const DEFAULT_QUARANTINE_DIR: &str = "duplicates";

/// The quarantine directory, created on first use and at most once per run
#[derive(Debug)]
pub struct QuarantineRoot {
    path: PathBuf,
    ensured: bool,
}

impl QuarantineRoot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ensured: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_ensured(&self) -> bool {
        self.ensured
    }

    /// Create the directory if this run has not done so yet
    pub fn ensure(&mut self) -> Result<&Path, QuarantineError> {
        if !self.ensured {
            fs::create_dir_all(&self.path).map_err(|e| QuarantineError::CreateRoot {
                path: self.path.clone(),
                source: e,
            })?;
            tracing::info!(path = %self.path.display(), "Quarantine directory ready");
            self.ensured = true;
        }
        Ok(&self.path)
    }
}

/// Where both files of a pair go
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantinePlan {
    pub tag: String,
    pub kept: PathBuf,
    pub kept_copy: PathBuf,
    pub discarded: PathBuf,
    pub discarded_target: PathBuf,
}

/// What actually happened to a pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarantineOutcome {
    pub plan: QuarantinePlan,
    /// False in dry-run mode
    pub applied: bool,
    pub copy_method: Option<CopyMethod>,
    pub copy_error: Option<String>,
    pub move_error: Option<String>,
}

impl QuarantineOutcome {
    /// Whether the discarded file left the tree
    pub fn discarded_moved(&self) -> bool {
        self.applied && self.move_error.is_none()
    }

    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.copy_error
            .as_deref()
            .into_iter()
            .chain(self.move_error.as_deref())
    }
}

/// Applies the quarantine protocol for one run
#[derive(Debug)]
pub struct Quarantine {
    scan_root: PathBuf,
    root: QuarantineRoot,
    manifest: Manifest,
    run_id: Uuid,
    dry_run: bool,
}

impl Quarantine {
    pub fn new(
        scan_root: impl Into<PathBuf>,
        quarantine_root: impl Into<PathBuf>,
        dry_run: bool,
    ) -> Self {
        let root = QuarantineRoot::new(quarantine_root);
        let manifest = Manifest::in_quarantine(root.path());
        Self {
            scan_root: scan_root.into(),
            root,
            manifest,
            run_id: Uuid::new_v4(),
            dry_run,
        }
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn relative_to_scan_root<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.scan_root).unwrap_or(path)
    }

    /// Compute the default destinations without touching the filesystem
    pub fn plan(&self, kept: &ImageRecord, discarded: &ImageRecord) -> QuarantinePlan {
        let tag = pair_tag(&kept.name, &discarded.name);

        let relative_dir = discarded
            .path
            .parent()
            .and_then(|parent| parent.strip_prefix(&self.scan_root).ok())
            .unwrap_or_else(|| Path::new(""));
        let dir = self.root.path().join(relative_dir);

        QuarantinePlan {
            kept_copy: dir.join(quarantine_name(&tag, Role::Kept, &kept.name)),
            discarded_target: dir.join(quarantine_name(&tag, Role::Discarded, &discarded.name)),
            kept: kept.path.clone(),
            discarded: discarded.path.clone(),
            tag,
        }
    }

    /// Bump the tag until neither destination collides with an unrelated file
    fn disambiguate(
        &self,
        mut plan: QuarantinePlan,
        kept: &ImageRecord,
        discarded: &ImageRecord,
    ) -> QuarantinePlan {
        let base = plan.tag.clone();
        let dir = plan
            .discarded_target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut counter: u64 = 0;
        while collides(&plan) {
            counter += 1;
            plan.tag = format!("{}{:x}", base, counter);
            plan.kept_copy = dir.join(quarantine_name(&plan.tag, Role::Kept, &kept.name));
            plan.discarded_target =
                dir.join(quarantine_name(&plan.tag, Role::Discarded, &discarded.name));
        }

        if counter > 0 {
            tracing::debug!(tag = %plan.tag, "Quarantine name taken, using a suffixed tag");
        }
        plan
    }

    /// Quarantine a pair.
    ///
    /// Errors only when the quarantine root cannot be created; per-step
    /// failures are carried in the outcome.
    pub fn apply(
        &mut self,
        kept: &ImageRecord,
        discarded: &ImageRecord,
    ) -> Result<QuarantineOutcome, QuarantineError> {
        let plan = self.disambiguate(self.plan(kept, discarded), kept, discarded);

        if self.dry_run {
            tracing::info!(
                kept = %plan.kept.display(),
                discarded = %plan.discarded.display(),
                "[dry-run] would keep {} and quarantine {}",
                kept.name,
                discarded.name
            );
            return Ok(QuarantineOutcome {
                plan,
                applied: false,
                copy_method: None,
                copy_error: None,
                move_error: None,
            });
        }

        self.root.ensure()?;

        let mut outcome = QuarantineOutcome {
            plan,
            applied: true,
            copy_method: None,
            copy_error: None,
            move_error: None,
        };

        if let Some(dir) = outcome.plan.discarded_target.parent() {
            if let Err(e) = fs::create_dir_all(dir) {
                let error = QuarantineError::CreateDirectory {
                    path: dir.to_path_buf(),
                    source: e,
                };
                tracing::error!("{}", error);
                outcome.copy_error = Some(error.to_string());
                outcome.move_error = Some(error.to_string());
                return Ok(outcome);
            }
        }

        match copy_or_link(&outcome.plan.kept, &outcome.plan.kept_copy) {
            Ok(method) => {
                tracing::debug!(to = %outcome.plan.kept_copy.display(), ?method, "Copied kept file");
                outcome.copy_method = Some(method);
            }
            Err(e) => {
                tracing::error!("Error copying kept file: {}", e);
                outcome.copy_error = Some(e.to_string());
            }
        }

        match move_file(&outcome.plan.discarded, &outcome.plan.discarded_target) {
            Ok(()) => tracing::info!(
                from = %outcome.plan.discarded.display(),
                to = %outcome.plan.discarded_target.display(),
                "Quarantined duplicate"
            ),
            Err(e) => {
                tracing::error!("Error moving discarded file: {}", e);
                outcome.move_error = Some(e.to_string());
            }
        }

        self.record(&outcome);
        Ok(outcome)
    }

    fn record(&self, outcome: &QuarantineOutcome) {
        let now = Utc::now();
        let plan = &outcome.plan;
        let entry = |role: Role, quarantined: &Path, original: &Path| ManifestEntry {
            run_id: self.run_id,
            recorded_at: now,
            tag: plan.tag.clone(),
            role,
            quarantined: quarantined
                .strip_prefix(self.root.path())
                .unwrap_or(quarantined)
                .to_path_buf(),
            original: self.relative_to_scan_root(original).to_path_buf(),
        };

        let mut entries = Vec::with_capacity(2);
        if outcome.copy_method.is_some() {
            entries.push(entry(Role::Kept, &plan.kept_copy, &plan.kept));
        }
        if outcome.discarded_moved() {
            entries.push(entry(Role::Discarded, &plan.discarded_target, &plan.discarded));
        }

        if let Err(e) = self.manifest.append(&entries) {
            tracing::warn!("Could not update quarantine manifest: {}", e);
        }
    }
}

/// A discarded target must be free; a kept copy may already be the kept file
fn collides(plan: &QuarantinePlan) -> bool {
    fs::symlink_metadata(&plan.discarded_target).is_ok()
        || (fs::symlink_metadata(&plan.kept_copy).is_ok()
            && !is_same_file(&plan.kept, &plan.kept_copy))
}
