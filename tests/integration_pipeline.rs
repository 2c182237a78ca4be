//! Integration tests for the reconcile pipeline.
//!
//! These tests run the whole scan, fingerprint and quarantine flow against
//! real directories and check what ends up on disk.

use assert_fs::prelude::*;
use assert_fs::TempDir;
use image::{Rgb, RgbImage};
use photo_quarantine::core::cache::SqliteCache;
use photo_quarantine::core::hasher::HashAlgorithmKind;
use photo_quarantine::core::pipeline::Pipeline;
use photo_quarantine::core::quarantine::pair_tag;
use photo_quarantine::core::reconcile::{Decision, DecisionKind};
use photo_quarantine::QuarantineAppError;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

/// Left half black, right half white; every algorithm sees the same picture at any size
fn split_image(path: &Path, width: u32, height: u32) {
    RgbImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    })
    .save(path)
    .unwrap();
}

/// Top half black, bottom half white
fn flipped_image(path: &Path, width: u32, height: u32) {
    RgbImage::from_fn(width, height, |_, y| {
        if y < height / 2 {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    })
    .save(path)
    .unwrap();
}

/// Smooth luminance waves; rescaled copies share their strongest wavelet coefficients
fn wave_image(path: &Path, width: u32, height: u32) {
    RgbImage::from_fn(width, height, |x, y| {
        let fx = x as f64 / width as f64;
        let fy = y as f64 / height as f64;
        let v = 128.0 + 70.0 * (fx * 7.0).sin() + 45.0 * (fy * 5.0 + fx * 2.0).cos();
        Rgb([v.clamp(0.0, 255.0) as u8; 3])
    })
    .save(path)
    .unwrap();
}

#[test]
fn pipeline_handles_empty_directory() {
    let temp = TempDir::new().unwrap();

    let report = Pipeline::builder().root(temp.path()).build().run().unwrap();

    assert_eq!(report.total_files(), 0);
    assert_eq!(report.matches(), 0);
    temp.child("duplicates").assert(predicate::path::missing());
}

#[test]
fn pipeline_rejects_missing_root() {
    let result = Pipeline::builder()
        .root("/nonexistent/path/that/does/not/exist")
        .build()
        .run();

    assert!(matches!(result, Err(QuarantineAppError::Scan(_))));
}

#[test]
fn corrupt_files_are_skipped_not_fatal() {
    let temp = TempDir::new().unwrap();
    temp.child("corrupt.jpg")
        .write_binary(b"this is not a valid image file")
        .unwrap();
    split_image(temp.child("a.png").path(), 64, 48);

    let report = Pipeline::builder().root(temp.path()).build().run().unwrap();

    assert_eq!(report.total_files(), 2);
    assert_eq!(report.skipped(), 1);
    assert_eq!(report.matches(), 0);
    temp.child("corrupt.jpg").assert(predicate::path::exists());
}

#[test]
fn smaller_duplicate_is_quarantined_next_to_a_copy_of_the_keeper() {
    let temp = TempDir::new().unwrap();
    split_image(temp.child("a.png").path(), 800, 600);
    split_image(temp.child("b.png").path(), 400, 300);
    let b_bytes = fs::read(temp.child("b.png").path()).unwrap();

    let report = Pipeline::builder().root(temp.path()).build().run().unwrap();

    assert_eq!(report.matches(), 1);
    assert_eq!(report.quarantined(), 1);
    assert!(report.is_clean());

    let tag = pair_tag("a.png", "b.png");
    temp.child("a.png").assert(predicate::path::is_file());
    temp.child("b.png").assert(predicate::path::missing());
    temp.child(format!("duplicates/{}_KEPT_a.png", tag))
        .assert(predicate::path::is_file());
    let gone = fs::read(temp.child(format!("duplicates/{}_GONE_b.png", tag)).path()).unwrap();
    assert_eq!(gone, b_bytes);
}

#[test]
fn larger_later_file_replaces_the_retained_one() {
    let temp = TempDir::new().unwrap();
    split_image(temp.child("a_small.png").path(), 200, 150);
    split_image(temp.child("b_large.png").path(), 800, 600);

    let report = Pipeline::builder().root(temp.path()).build().run().unwrap();

    let matched = report
        .decisions
        .iter()
        .find_map(|d| match &d.kind {
            DecisionKind::Matched {
                decision,
                kept,
                discarded,
                ..
            } => Some((*decision, kept.clone(), discarded.clone())),
            _ => None,
        })
        .unwrap();

    assert_eq!(matched.0, Decision::CandidateWins);
    assert!(matched.1.ends_with("b_large.png"));
    assert!(matched.2.ends_with("a_small.png"));

    let tag = pair_tag("b_large.png", "a_small.png");
    temp.child("b_large.png").assert(predicate::path::is_file());
    temp.child("a_small.png").assert(predicate::path::missing());
    temp.child(format!("duplicates/{}_GONE_a_small.png", tag))
        .assert(predicate::path::is_file());
}

#[test]
fn quarantine_mirrors_the_discarded_files_folder() {
    let temp = TempDir::new().unwrap();
    split_image(temp.child("a.png").path(), 800, 600);
    temp.child("trip").create_dir_all().unwrap();
    split_image(temp.child("trip/b.png").path(), 400, 300);

    Pipeline::builder().root(temp.path()).build().run().unwrap();

    let tag = pair_tag("a.png", "b.png");
    temp.child(format!("duplicates/trip/{}_GONE_b.png", tag))
        .assert(predicate::path::is_file());
    temp.child(format!("duplicates/trip/{}_KEPT_a.png", tag))
        .assert(predicate::path::is_file());
    temp.child("trip/b.png").assert(predicate::path::missing());
}

#[test]
fn different_pictures_are_left_alone() {
    let temp = TempDir::new().unwrap();
    split_image(temp.child("a.png").path(), 800, 600);
    flipped_image(temp.child("b.png").path(), 800, 600);

    let report = Pipeline::builder().root(temp.path()).build().run().unwrap();

    assert_eq!(report.matches(), 0);
    temp.child("b.png").assert(predicate::path::is_file());
    temp.child("duplicates").assert(predicate::path::missing());
}

#[test]
fn dry_run_reports_without_touching_the_tree() {
    let temp = TempDir::new().unwrap();
    split_image(temp.child("a.png").path(), 800, 600);
    split_image(temp.child("b.png").path(), 400, 300);

    let report = Pipeline::builder()
        .root(temp.path())
        .dry_run(true)
        .build()
        .run()
        .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.matches(), 1);
    assert_eq!(report.quarantined(), 0);
    temp.child("a.png").assert(predicate::path::is_file());
    temp.child("b.png").assert(predicate::path::is_file());
    temp.child("duplicates").assert(predicate::path::missing());
}

#[test]
fn second_run_ignores_the_quarantine_directory() {
    let temp = TempDir::new().unwrap();
    split_image(temp.child("a.png").path(), 800, 600);
    split_image(temp.child("b.png").path(), 400, 300);

    Pipeline::builder().root(temp.path()).build().run().unwrap();
    let again = Pipeline::builder().root(temp.path()).build().run().unwrap();

    assert_eq!(again.total_files(), 1);
    assert_eq!(again.matches(), 0);
}

#[test]
fn sqlite_cache_is_reused_between_runs() {
    let temp = TempDir::new().unwrap();
    let photos = temp.child("photos");
    photos.create_dir_all().unwrap();
    split_image(photos.child("a.png").path(), 800, 600);
    split_image(photos.child("b.png").path(), 400, 300);
    let db = temp.child("fingerprints.db");

    let run = || {
        Pipeline::builder()
            .root(photos.path())
            .algorithm(HashAlgorithmKind::Difference)
            .dry_run(true)
            .cache(Box::new(SqliteCache::open(db.path()).unwrap()))
            .build()
            .run()
            .unwrap()
    };

    let first = run();
    let second = run();

    assert_eq!(first.cache_hits, 0);
    assert_eq!(second.cache_hits, 2);
    assert_eq!(first.matches(), second.matches());
    db.assert(predicate::path::is_file());
}

#[test]
fn fmiq_quarantines_a_rescaled_copy_at_default_sensitivity() {
    let temp = TempDir::new().unwrap();
    wave_image(temp.child("a.png").path(), 800, 600);
    wave_image(temp.child("b.png").path(), 400, 300);

    let report = Pipeline::builder()
        .root(temp.path())
        .algorithm(HashAlgorithmKind::Multiresolution)
        .sensitivity(0)
        .build()
        .run()
        .unwrap();

    assert_eq!(report.matches(), 1);
    assert_eq!(report.quarantined(), 1);
    let tag = pair_tag("a.png", "b.png");
    temp.child("a.png").assert(predicate::path::is_file());
    temp.child(format!("duplicates/{}_GONE_b.png", tag))
        .assert(predicate::path::is_file());
}

#[test]
fn fmiq_strict_sensitivity_matches_nothing() {
    let temp = TempDir::new().unwrap();
    wave_image(temp.child("a.png").path(), 800, 600);
    wave_image(temp.child("b.png").path(), 400, 300);

    let report = Pipeline::builder()
        .root(temp.path())
        .algorithm(HashAlgorithmKind::Multiresolution)
        .sensitivity(-1000)
        .build()
        .run()
        .unwrap();

    assert_eq!(report.matches(), 0);
    temp.child("b.png").assert(predicate::path::is_file());
    temp.child("duplicates").assert(predicate::path::missing());
}

#[test]
fn fmiq_signatures_survive_the_sqlite_cache() {
    let temp = TempDir::new().unwrap();
    let photos = temp.child("photos");
    photos.create_dir_all().unwrap();
    wave_image(photos.child("a.png").path(), 800, 600);
    wave_image(photos.child("b.png").path(), 400, 300);
    let db = temp.child("fingerprints.db");

    let run = || {
        Pipeline::builder()
            .root(photos.path())
            .algorithm(HashAlgorithmKind::Multiresolution)
            .dry_run(true)
            .cache(Box::new(SqliteCache::open(db.path()).unwrap()))
            .build()
            .run()
            .unwrap()
    };

    let first = run();
    let second = run();

    assert_eq!(first.cache_hits, 0);
    assert_eq!(second.cache_hits, 2);
    assert_eq!(first.matches(), 1);
    assert_eq!(second.matches(), 1);
}
