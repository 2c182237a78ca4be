//! Pipeline execution implementation.

use crate::core::cache::{CacheBackend, CacheEntry, CacheStats};
use crate::core::hasher::{
    fingerprint_file, AverageHasher, DifferenceHasher, Fingerprinter, HashAlgorithmKind,
    MultiresHasher,
};
use crate::core::quarantine::{Quarantine, DEFAULT_QUARANTINE_DIR};
use crate::core::reconcile::{ReconcileReport, Reconciler};
use crate::core::scanner::{ImageFile, ImageScanner, ScanConfig, WalkDirScanner};
use crate::core::store::{ExactStore, HashStore, ImageRecord, ThresholdStore};
use crate::error::{CacheError, QuarantineAppError};
use crate::events::{
    null_sender, Event, EventSender, FingerprintEvent, FingerprintProgress, PipelineEvent,
    PipelinePhase, PipelineSummary, ReconcileEvent,
};
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// Configuration for the pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Scan root
    pub root: PathBuf,
    /// Fingerprint algorithm; also selects the store
    pub algorithm: HashAlgorithmKind,
    /// Raw sensitivity for the threshold store (lower = stricter)
    pub sensitivity: i64,
    /// Decide and log, but leave the filesystem untouched
    pub dry_run: bool,
    /// Quarantine directory, relative to the scan root unless absolute
    pub quarantine_dir: PathBuf,
    /// Scanner configuration
    pub scan_config: ScanConfig,
    /// Drop cache entries for files that no longer exist after the run
    pub prune_cache: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            algorithm: HashAlgorithmKind::Average,
            sensitivity: 0,
            dry_run: false,
            quarantine_dir: PathBuf::from(DEFAULT_QUARANTINE_DIR),
            scan_config: ScanConfig::default(),
            prune_cache: false,
        }
    }
}

impl PipelineConfig {
    /// Absolute or root-relative location of the quarantine
    pub fn quarantine_root(&self) -> PathBuf {
        self.root.join(&self.quarantine_dir)
    }
}

/// Builder for pipeline configuration
pub struct PipelineBuilder {
    config: PipelineConfig,
    cache: Option<Box<dyn CacheBackend>>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            cache: None,
        }
    }

    /// Set the scan root
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.root = root.into();
        self
    }

    /// Set the fingerprint algorithm
    pub fn algorithm(mut self, algorithm: HashAlgorithmKind) -> Self {
        self.config.algorithm = algorithm;
        self
    }

    /// Set the raw sensitivity (threshold store only)
    pub fn sensitivity(mut self, sensitivity: i64) -> Self {
        self.config.sensitivity = sensitivity;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.config.dry_run = dry_run;
        self
    }

    /// Override the quarantine directory
    pub fn quarantine_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.quarantine_dir = dir.into();
        self
    }

    /// Set the cache backend
    pub fn cache(mut self, cache: Box<dyn CacheBackend>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set scanner configuration
    pub fn scan_config(mut self, config: ScanConfig) -> Self {
        self.config.scan_config = config;
        self
    }

    /// Prune cache entries for vanished files once the run completes
    pub fn prune_cache(mut self, prune: bool) -> Self {
        self.config.prune_cache = prune;
        self
    }

    /// Include hidden files
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.config.scan_config.include_hidden = include;
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Pipeline {
        Pipeline {
            config: self.config,
            cache: self.cache,
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of decoding and fingerprinting one file
type Fingerprinted<F> = Result<(F, (u32, u32)), String>;

/// The duplicate reconciliation pipeline
pub struct Pipeline {
    config: PipelineConfig,
    cache: Option<Box<dyn CacheBackend>>,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Drop every cached fingerprint; a no-op without a cache
    pub fn clear_cache(&self) -> Result<(), CacheError> {
        match &self.cache {
            Some(cache) => {
                cache.clear()?;
                tracing::info!("Fingerprint cache cleared");
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Statistics of the configured cache, if any
    pub fn cache_stats(&self) -> Option<Result<CacheStats, CacheError>> {
        self.cache.as_ref().map(|cache| cache.stats())
    }

    /// Run the pipeline without events
    pub fn run(&self) -> Result<ReconcileReport, QuarantineAppError> {
        self.run_with_events(&null_sender())
    }

    /// Run the pipeline with event reporting
    pub fn run_with_events(
        &self,
        events: &EventSender,
    ) -> Result<ReconcileReport, QuarantineAppError> {
        let result = match self.config.algorithm {
            HashAlgorithmKind::Average => {
                self.execute(ExactStore::new(), AverageHasher::default(), events)
            }
            HashAlgorithmKind::Difference => {
                self.execute(ExactStore::new(), DifferenceHasher::default(), events)
            }
            HashAlgorithmKind::Multiresolution => self.execute(
                ThresholdStore::from_sensitivity(self.config.sensitivity),
                MultiresHasher::new(),
                events,
            ),
        };

        if let Err(ref e) = result {
            events.send(Event::Pipeline(PipelineEvent::Error {
                message: e.to_string(),
            }));
        }
        result
    }

    fn execute<S, H>(
        &self,
        store: S,
        hasher: H,
        events: &EventSender,
    ) -> Result<ReconcileReport, QuarantineAppError>
    where
        H: Fingerprinter,
        S: HashStore<Fingerprint = H::Output>,
    {
        let start_time = Instant::now();
        let quarantine_root = self.config.quarantine_root();

        tracing::info!(
            root = %self.config.root.display(),
            algorithm = %self.config.algorithm,
            dry_run = self.config.dry_run,
            "Starting reconciliation"
        );
        events.send(Event::Pipeline(PipelineEvent::Started));

        // Phase 1: Scanning
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Scanning,
        }));

        let scan_config = self.config.scan_config.clone().exclude(&quarantine_root);
        let scan_result =
            WalkDirScanner::new(scan_config).scan_with_events(&self.config.root, events)?;
        let scan_errors: Vec<String> = scan_result.errors.iter().map(|e| e.to_string()).collect();
        let files = scan_result.files;

        // Phase 2: Fingerprinting
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Fingerprinting,
        }));
        let (fingerprints, cache_hits) = self.fingerprint_all(&hasher, &files, events);

        // Phase 3: Reconciling
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Reconciling,
        }));
        events.send(Event::Reconcile(ReconcileEvent::Started {
            total_files: files.len(),
        }));

        let quarantine = Quarantine::new(&self.config.root, &quarantine_root, self.config.dry_run);
        let mut reconciler = Reconciler::new(store, quarantine).with_events(events.clone());
        let total = files.len();

        for (processed, (file, fingerprinted)) in files.iter().zip(fingerprints).enumerate() {
            match fingerprinted {
                Ok((fingerprint, (width, height))) => {
                    let record = ImageRecord::new(file, width, height);
                    reconciler.process(record, &fingerprint)?;
                }
                Err(reason) => reconciler.skip(file.path.clone(), reason),
            }
            events.send(Event::Reconcile(ReconcileEvent::Progress {
                processed: processed + 1,
                total,
            }));
        }

        let decisions = reconciler.into_decisions();
        let report = ReconcileReport {
            root: self.config.root.clone(),
            quarantine: quarantine_root,
            algorithm: self.config.algorithm,
            dry_run: self.config.dry_run,
            decisions,
            scan_errors,
            cache_hits,
            duration_ms: start_time.elapsed().as_millis() as u64,
        };

        self.forget_quarantined(&report);
        if self.config.prune_cache {
            self.prune_cache();
        }

        events.send(Event::Reconcile(ReconcileEvent::Completed {
            matches: report.matches(),
        }));

        let summary = PipelineSummary {
            total_files: report.total_files(),
            matches: report.matches(),
            quarantined: if report.dry_run {
                report.matches()
            } else {
                report.quarantined()
            },
            skipped: report.skipped(),
            dry_run: report.dry_run,
            duration_ms: report.duration_ms,
        };
        tracing::info!(
            files = summary.total_files,
            matches = summary.matches,
            quarantined = summary.quarantined,
            skipped = summary.skipped,
            "Reconciliation complete"
        );
        events.send(Event::Pipeline(PipelineEvent::Completed { summary }));

        Ok(report)
    }

    /// Decode and fingerprint every file in parallel, preserving scan order
    fn fingerprint_all<H: Fingerprinter>(
        &self,
        hasher: &H,
        files: &[ImageFile],
        events: &EventSender,
    ) -> (Vec<Fingerprinted<H::Output>>, usize) {
        let total = files.len();
        events.send(Event::Fingerprint(FingerprintEvent::Started { total_files: total }));

        let algorithm = hasher.kind();
        let completed = AtomicUsize::new(0);
        let cache_hits = AtomicUsize::new(0);

        let results: Vec<(Fingerprinted<H::Output>, Option<CacheEntry>)> = files
            .par_iter()
            .map(|file| {
                let outcome = match self.cached::<H::Output>(file, algorithm) {
                    Some(hit) => {
                        cache_hits.fetch_add(1, Ordering::SeqCst);
                        (Ok(hit), None)
                    }
                    None => match fingerprint_file(hasher, file) {
                        Ok((fingerprint, dims)) => {
                            let entry = self
                                .cache
                                .as_ref()
                                .and_then(|_| CacheEntry::new(file, algorithm, &fingerprint, dims).ok());
                            (Ok((fingerprint, dims)), entry)
                        }
                        Err(e) => {
                            events.send(Event::Fingerprint(FingerprintEvent::Error {
                                path: file.path.clone(),
                                message: e.to_string(),
                            }));
                            (Err(e.to_string()), None)
                        }
                    },
                };

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                events.send(Event::Fingerprint(FingerprintEvent::Progress(
                    FingerprintProgress {
                        completed: done,
                        total,
                        current_path: file.path.clone(),
                        cache_hits: cache_hits.load(Ordering::SeqCst),
                    },
                )));
                outcome
            })
            .collect();

        let (fingerprints, fresh): (Vec<_>, Vec<_>) = results.into_iter().unzip();
        let fresh: Vec<CacheEntry> = fresh.into_iter().flatten().collect();

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set_batch(&fresh) {
                tracing::warn!("Could not update fingerprint cache: {}", e);
            }
        }

        let cache_hits = cache_hits.load(Ordering::SeqCst);
        let fingerprinted = fingerprints.iter().filter(|f| f.is_ok()).count();
        tracing::debug!(fingerprinted, cache_hits, "Fingerprinting complete");
        events.send(Event::Fingerprint(FingerprintEvent::Completed {
            total_fingerprinted: fingerprinted,
            cache_hits,
        }));

        (fingerprints, cache_hits)
    }

    fn cached<F: serde::de::DeserializeOwned>(
        &self,
        file: &ImageFile,
        algorithm: HashAlgorithmKind,
    ) -> Option<(F, (u32, u32))> {
        let cache = self.cache.as_ref()?;
        let entry = match cache.get(&file.path, algorithm, file.size, file.modified) {
            Ok(entry) => entry?,
            Err(e) => {
                tracing::warn!(path = %file.path.display(), "Cache lookup failed: {}", e);
                return None;
            }
        };
        match entry.fingerprint() {
            Ok(fingerprint) => Some((fingerprint, (entry.width, entry.height))),
            Err(e) => {
                tracing::debug!(path = %file.path.display(), "Ignoring unreadable cache entry: {}", e);
                None
            }
        }
    }

    fn prune_cache(&self) {
        let Some(cache) = &self.cache else {
            return;
        };
        match cache.prune_orphans() {
            Ok(pruned) => tracing::info!(pruned, "Pruned fingerprint cache"),
            Err(e) => tracing::warn!("Could not prune fingerprint cache: {}", e),
        }
    }

    /// Drop cache entries for files that left the tree
    fn forget_quarantined(&self, report: &ReconcileReport) {
        let Some(cache) = &self.cache else {
            return;
        };
        let moved = report
            .decisions
            .iter()
            .filter_map(|d| d.quarantine())
            .filter(|q| q.discarded_moved());
        for outcome in moved {
            if let Err(e) = cache.remove(&outcome.plan.discarded) {
                tracing::warn!("Could not update fingerprint cache: {}", e);
            }
        }
    }
}
