//! Test fixtures for group round-trip tests
//!
//! `tests/fixtures/group` is a small config group with two environments:
//! - `app.json`: shared name/debug/features/db.pool, per-env port and db.host
//! - `db/pool.yaml`: nested YAML with per-env timeout and retry.enabled
//! - `logging.yaml`: identical in both environments
//! - `canary.json`: only present in envA

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use carver::Tree;
use serde_json::Value;
use tempfile::TempDir;
use walkdir::WalkDir;

/// Path to the fixture group
pub fn group_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/group")
}

/// Copy the fixture group into a fresh scratch directory
pub fn scratch_group() -> TempDir {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    copy_tree(&group_path(), tmp.path());
    tmp
}

/// Recursively copy `src` into `dest`
pub fn copy_tree(src: &Path, dest: &Path) {
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry.expect("Failed to walk fixture");
        let target = dest.join(entry.path().strip_prefix(src).unwrap());
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).unwrap();
        } else {
            fs::create_dir_all(target.parent().unwrap()).unwrap();
            fs::copy(entry.path(), &target).unwrap();
        }
    }
}

/// Write a file, creating parent directories
pub fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Load a document relative to `root`
pub fn load(root: &Path, rel: &str) -> Tree {
    carver::document::load_path(&root.join(rel))
        .unwrap_or_else(|e| panic!("Failed to load {}: {}", rel, e))
}

/// Unwrap a JSON object literal into a tree
pub fn tree(value: Value) -> Tree {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {}", other),
    }
}
