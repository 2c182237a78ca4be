//! # CLI Module
//!
//! Command-line interface for the duplicate photo quarantine.
//!
//! ## Usage
//! ```bash
//! # Quarantine duplicates under ~/Photos
//! photo-quarantine --path ~/Photos
//!
//! # See what would happen first
//! photo-quarantine --path ~/Photos --dryrun
//!
//! # Similarity matching with a looser cutoff
//! photo-quarantine --path ~/Photos --algo fmiq --sensitivity 20
//!
//! # Put everything back
//! photo-quarantine --path ~/Photos --undo
//! ```

use clap::{Parser, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use photo_quarantine::core::cache::SqliteCache;
use photo_quarantine::core::hasher::HashAlgorithmKind;
use photo_quarantine::core::pipeline::Pipeline;
use photo_quarantine::core::reconcile::{Decision, DecisionKind, ReconcileReport};
use photo_quarantine::core::undo::{Undo, UndoReport};
use photo_quarantine::error::{QuarantineAppError, Result};
use photo_quarantine::events::{
    Event, EventChannel, EventReceiver, FingerprintEvent, PipelineEvent, ReconcileEvent,
    ScanEvent, UndoEvent,
};
use std::path::{Component, Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing_subscriber::filter::LevelFilter;

/// Photo Quarantine - keep the sharpest copy, move the rest aside
#[derive(Parser, Debug)]
#[command(name = "photo-quarantine")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to scan
    #[arg(short, long, default_value = ".")]
    path: PathBuf,

    /// Fingerprint algorithm
    #[arg(short, long, default_value = "avg")]
    algo: Algorithm,

    /// Similarity cutoff for fmiq (lower = stricter, may be negative)
    #[arg(short, long, default_value_t = 0, allow_hyphen_values = true)]
    sensitivity: i64,

    /// Only report what would happen
    #[arg(long, visible_alias = "dry-run")]
    dryrun: bool,

    /// Restore every quarantined file
    #[arg(long)]
    undo: bool,

    /// Quarantine directory, relative to --path
    #[arg(long, default_value = "duplicates")]
    quarantine_dir: PathBuf,

    /// Output format
    #[arg(short, long, default_value = "pretty")]
    output: OutputFormat,

    /// Include hidden files and directories
    #[arg(long)]
    include_hidden: bool,

    /// Fingerprint cache database
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Empty the fingerprint cache before scanning
    #[arg(long, requires = "cache")]
    clear_cache: bool,

    /// Drop cache entries for files that no longer exist after scanning
    #[arg(long, requires = "cache")]
    prune_cache: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Algorithm {
    /// Average Hash - exact match
    Avg,
    /// Difference Hash - exact match
    Diff,
    /// Multi-resolution signature - nearest match within --sensitivity
    Fmiq,
}

impl From<Algorithm> for HashAlgorithmKind {
    fn from(algo: Algorithm) -> Self {
        match algo {
            Algorithm::Avg => HashAlgorithmKind::Average,
            Algorithm::Diff => HashAlgorithmKind::Difference,
            Algorithm::Fmiq => HashAlgorithmKind::Multiresolution,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Minimal output (paths only)
    Minimal,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    photo_quarantine::init_tracing(if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    });

    validate_quarantine_dir(&cli.quarantine_dir)?;

    if cli.undo {
        run_undo(&cli)
    } else {
        run_reconcile(&cli)
    }
}

/// The quarantine must be a real subdirectory, never the scan root itself
fn validate_quarantine_dir(dir: &Path) -> Result<()> {
    let has_name = dir
        .components()
        .any(|c| matches!(c, Component::Normal(_)));
    let escapes = dir.is_absolute() || dir.components().any(|c| matches!(c, Component::ParentDir));
    if !has_name || escapes {
        return Err(QuarantineAppError::Config(format!(
            "--quarantine-dir must name a subdirectory of --path, got {:?}",
            dir
        )));
    }
    Ok(())
}

fn print_header(term: &Term, cli: &Cli) {
    term.write_line(&format!(
        "{} {}",
        style("Photo Quarantine").bold().cyan(),
        style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
    ))
    .ok();
    if cli.dryrun {
        term.write_line(&format!(
            "{}",
            style("Dry run: nothing will be moved").yellow()
        ))
        .ok();
    }
    term.write_line("").ok();
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );
    pb
}

/// Drive a progress bar from events until the sender side is dropped
fn spawn_progress(
    receiver: EventReceiver,
    progress: Option<ProgressBar>,
    verbose: bool,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress else {
                continue;
            };
            match event {
                Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => {
                    pb.set_position(0);
                    pb.set_message(format!("{}", phase));
                }
                Event::Scan(ScanEvent::Completed { total_files }) => {
                    pb.set_length(total_files as u64);
                }
                Event::Fingerprint(FingerprintEvent::Progress(p)) => {
                    pb.set_position(p.completed as u64);
                    if verbose {
                        pb.set_message(format!(
                            "{} (cache: {})",
                            p.current_path.file_name().unwrap_or_default().to_string_lossy(),
                            p.cache_hits
                        ));
                    }
                }
                Event::Reconcile(ReconcileEvent::Progress { processed, .. }) => {
                    pb.set_position(processed as u64);
                }
                Event::Reconcile(ReconcileEvent::Matched { candidate, .. }) if verbose => {
                    pb.println(format!(
                        "  {} {}",
                        style("≈").yellow(),
                        candidate.display()
                    ));
                }
                Event::Undo(UndoEvent::Restored { to, .. }) if verbose => {
                    pb.println(format!("  {} {}", style("↩").green(), to.display()));
                }
                Event::Pipeline(PipelineEvent::Completed { .. })
                | Event::Pipeline(PipelineEvent::Error { .. })
                | Event::Undo(UndoEvent::Completed { .. }) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
        if let Some(pb) = progress {
            pb.finish_and_clear();
        }
    })
}

fn run_reconcile(cli: &Cli) -> Result<()> {
    let term = Term::stderr();
    let pretty = matches!(cli.output, OutputFormat::Pretty);
    let algorithm: HashAlgorithmKind = cli.algo.into();

    if pretty {
        print_header(&term, cli);
    }
    if !algorithm.uses_threshold() && cli.sensitivity != 0 {
        tracing::warn!("--sensitivity only applies to --algo fmiq; ignoring it");
    }

    let mut builder = Pipeline::builder()
        .root(&cli.path)
        .algorithm(algorithm)
        .sensitivity(cli.sensitivity)
        .dry_run(cli.dryrun)
        .quarantine_dir(&cli.quarantine_dir)
        .include_hidden(cli.include_hidden)
        .prune_cache(cli.prune_cache);

    if let Some(cache_path) = &cli.cache {
        match SqliteCache::open(cache_path) {
            Ok(cache) => builder = builder.cache(Box::new(cache)),
            Err(e) => tracing::warn!("Continuing without cache: {}", e),
        }
    }

    let pipeline = builder.build();
    if cli.clear_cache {
        if let Err(e) = pipeline.clear_cache() {
            tracing::warn!("Could not clear cache: {}", e);
        }
    }

    let (sender, receiver) = EventChannel::new();
    let progress = pretty.then(progress_bar);
    let event_thread = spawn_progress(receiver, progress, cli.verbose);

    let result = pipeline.run_with_events(&sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();

    let report = result?;
    match cli.output {
        OutputFormat::Pretty => {
            print_pretty_reconcile(&term, &report, cli.verbose);
            print_cache_stats(&term, &pipeline);
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Minimal => print_minimal_reconcile(&report),
    }

    Ok(())
}

fn print_pretty_reconcile(term: &Term, report: &ReconcileReport, verbose: bool) {
    term.write_line(&format!("{} Scan Complete", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} images scanned in {:.1}s ({})",
        style(report.total_files()).cyan(),
        report.duration_ms as f64 / 1000.0,
        report.algorithm
    ))
    .ok();
    term.write_line(&format!(
        "  {} duplicates found",
        style(report.matches()).cyan()
    ))
    .ok();

    if report.dry_run {
        term.write_line(&format!(
            "  {} would be quarantined",
            style(report.matches()).yellow()
        ))
        .ok();
    } else {
        term.write_line(&format!(
            "  {} quarantined in {}",
            style(report.quarantined()).yellow(),
            report.quarantine.display()
        ))
        .ok();
    }

    if report.skipped() > 0 {
        term.write_line(&format!(
            "  {} skipped (unsupported or corrupt)",
            style(report.skipped()).dim()
        ))
        .ok();
    }
    if report.cache_hits > 0 {
        term.write_line(&format!("  {} cache hits", style(report.cache_hits).dim()))
            .ok();
    }
    term.write_line("").ok();

    for record in &report.decisions {
        match &record.kind {
            DecisionKind::Matched {
                decision,
                kept,
                kept_resolution,
                discarded,
                discarded_resolution,
                quarantine,
            } => {
                let replaced = if *decision == Decision::CandidateWins {
                    style(" (replaces earlier copy)").dim().to_string()
                } else {
                    String::new()
                };
                term.write_line(&format!(
                    "  {} {} {}{}",
                    style("★").green(),
                    kept.display(),
                    style(format!("{} px", kept_resolution)).dim(),
                    replaced
                ))
                .ok();
                term.write_line(&format!(
                    "    {} {} {} → {}",
                    style("○").dim(),
                    discarded.display(),
                    style(format!("{} px", discarded_resolution)).dim(),
                    quarantine.plan.discarded_target.display()
                ))
                .ok();
                for error in quarantine.errors() {
                    term.write_line(&format!("    {} {}", style("✗").red(), error))
                        .ok();
                }
            }
            DecisionKind::Skipped { reason } if verbose => {
                term.write_line(&format!(
                    "  {} {} {}",
                    style("-").dim(),
                    record.path.display(),
                    style(reason).dim()
                ))
                .ok();
            }
            _ => {}
        }
    }

    for error in &report.scan_errors {
        term.write_line(&format!("  {} {}", style("✗").red(), error)).ok();
    }

    if report.matches() == 0 {
        term.write_line(&format!("  {} No duplicates found!", style("🎉").green()))
            .ok();
    } else if !report.dry_run {
        term.write_line("").ok();
        term.write_line(&format!(
            "{}",
            style(format!(
                "Nothing was deleted. Run with --path {} --undo to put everything back.",
                report.root.display()
            ))
            .dim()
        ))
        .ok();
    }
}

fn print_cache_stats(term: &Term, pipeline: &Pipeline) {
    match pipeline.cache_stats() {
        Some(Ok(stats)) => {
            term.write_line(&format!(
                "{}",
                style(format!(
                    "Cache: {} fingerprints ({} bytes)",
                    stats.total_entries, stats.total_size_bytes
                ))
                .dim()
            ))
            .ok();
        }
        Some(Err(e)) => tracing::warn!("Could not read cache statistics: {}", e),
        None => {}
    }
}

fn print_minimal_reconcile(report: &ReconcileReport) {
    for record in &report.decisions {
        if let DecisionKind::Matched { discarded, .. } = &record.kind {
            println!("{}", discarded.display());
        }
    }
}

fn run_undo(cli: &Cli) -> Result<()> {
    let term = Term::stderr();
    let pretty = matches!(cli.output, OutputFormat::Pretty);

    if pretty {
        print_header(&term, cli);
    }

    let undo = Undo::new(&cli.path)
        .quarantine_dir(&cli.quarantine_dir)
        .dry_run(cli.dryrun);

    let (sender, receiver) = EventChannel::new();
    let progress = pretty.then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_message("Undoing");
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    });
    let event_thread = spawn_progress(receiver, progress, cli.verbose);

    let result = undo.run_with_events(&sender);
    drop(sender);
    event_thread.join().ok();

    let report = result?;
    match cli.output {
        OutputFormat::Pretty => print_pretty_undo(&term, &report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Minimal => {
            for restored in &report.restored {
                println!("{}", restored.to.display());
            }
        }
    }

    Ok(())
}

fn print_pretty_undo(term: &Term, report: &UndoReport) {
    let verb = if report.dry_run { "would be" } else { "were" };

    term.write_line(&format!("{} Undo Complete", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();
    term.write_line(&format!(
        "  {} files {} restored",
        style(report.restored.len()).cyan(),
        verb
    ))
    .ok();
    term.write_line(&format!(
        "  {} kept copies {} removed",
        style(report.removed.len()).cyan(),
        verb
    ))
    .ok();

    for restored in &report.restored {
        term.write_line(&format!("    {} {}", style("↩").green(), restored.to.display()))
            .ok();
    }
    for ignored in &report.ignored {
        term.write_line(&format!(
            "    {} {} (not a quarantine file, left in place)",
            style("?").yellow(),
            ignored.display()
        ))
        .ok();
    }
    for failure in &report.errors {
        term.write_line(&format!("    {} {}", style("✗").red(), failure.message))
            .ok();
    }

    if report.quarantine_removed {
        term.write_line("").ok();
        term.write_line(&format!(
            "  {} {} {}",
            style("✓").green(),
            if report.dry_run { "would remove" } else { "removed" },
            report.quarantine.display()
        ))
        .ok();
    }
}
