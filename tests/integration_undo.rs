//! Integration tests for reversing a quarantine.

use assert_fs::prelude::*;
use assert_fs::TempDir;
use image::{Rgb, RgbImage};
use photo_quarantine::core::pipeline::Pipeline;
use photo_quarantine::core::quarantine::{pair_tag, MANIFEST_FILE};
use photo_quarantine::core::undo::Undo;
use photo_quarantine::error::UndoError;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

fn split_image(path: &Path, width: u32, height: u32) {
    RgbImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgb([20, 20, 20])
        } else {
            Rgb([235, 235, 235])
        }
    })
    .save(path)
    .unwrap();
}

#[test]
fn undo_restores_every_file_and_removes_the_quarantine() {
    let temp = TempDir::new().unwrap();
    split_image(temp.child("a.png").path(), 800, 600);
    temp.child("trip").create_dir_all().unwrap();
    split_image(temp.child("trip/b.png").path(), 400, 300);
    split_image(temp.child("trip/c.png").path(), 200, 150);

    let a_before = fs::read(temp.child("a.png").path()).unwrap();
    let b_before = fs::read(temp.child("trip/b.png").path()).unwrap();
    let c_before = fs::read(temp.child("trip/c.png").path()).unwrap();

    let report = Pipeline::builder().root(temp.path()).build().run().unwrap();
    assert_eq!(report.quarantined(), 2);
    temp.child("duplicates").child(MANIFEST_FILE).assert(predicate::path::is_file());

    let undone = Undo::new(temp.path()).run().unwrap();

    assert!(undone.is_clean());
    assert_eq!(undone.restored.len(), 2);
    assert_eq!(undone.removed.len(), 2);
    assert!(undone.quarantine_removed);

    temp.child("duplicates").assert(predicate::path::missing());
    assert_eq!(fs::read(temp.child("a.png").path()).unwrap(), a_before);
    assert_eq!(fs::read(temp.child("trip/b.png").path()).unwrap(), b_before);
    assert_eq!(fs::read(temp.child("trip/c.png").path()).unwrap(), c_before);
}

#[test]
fn undo_works_from_file_names_when_the_manifest_is_gone() {
    let temp = TempDir::new().unwrap();
    split_image(temp.child("a.png").path(), 800, 600);
    split_image(temp.child("b.png").path(), 400, 300);
    let b_before = fs::read(temp.child("b.png").path()).unwrap();

    Pipeline::builder().root(temp.path()).build().run().unwrap();
    fs::remove_file(temp.child("duplicates").child(MANIFEST_FILE).path()).unwrap();

    let undone = Undo::new(temp.path()).run().unwrap();

    assert!(undone.is_clean());
    temp.child("b.png").assert(predicate::path::is_file());
    assert_eq!(fs::read(temp.child("b.png").path()).unwrap(), b_before);
    temp.child("duplicates").assert(predicate::path::missing());
}

#[test]
fn stray_files_keep_the_quarantine_directory() {
    let temp = TempDir::new().unwrap();
    split_image(temp.child("a.png").path(), 800, 600);
    split_image(temp.child("b.png").path(), 400, 300);

    Pipeline::builder().root(temp.path()).build().run().unwrap();
    temp.child("duplicates/notes.txt").write_str("keep me").unwrap();

    let undone = Undo::new(temp.path()).run().unwrap();

    assert!(!undone.quarantine_removed);
    assert_eq!(undone.ignored.len(), 1);
    temp.child("b.png").assert(predicate::path::is_file());
    temp.child("duplicates/notes.txt").assert("keep me");
}

#[test]
fn dry_run_undo_leaves_the_quarantine_in_place() {
    let temp = TempDir::new().unwrap();
    split_image(temp.child("a.png").path(), 800, 600);
    split_image(temp.child("b.png").path(), 400, 300);

    Pipeline::builder().root(temp.path()).build().run().unwrap();
    let tag = pair_tag("a.png", "b.png");

    let preview = Undo::new(temp.path()).dry_run(true).run().unwrap();

    assert_eq!(preview.restored.len(), 1);
    assert!(preview.quarantine_removed);
    temp.child("b.png").assert(predicate::path::missing());
    temp.child(format!("duplicates/{}_GONE_b.png", tag))
        .assert(predicate::path::is_file());
}

#[test]
fn undo_without_a_quarantine_is_an_error() {
    let temp = TempDir::new().unwrap();

    let result = Undo::new(temp.path()).run();

    assert!(matches!(result, Err(UndoError::QuarantineMissing { .. })));
}
