// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use stagehand::{ChangeSetBuilder, OrderedChanges, RawChange, SourceTree};
use std::fs;
use tempfile::TempDir;

/// Build an ordered change set from `(kind, path)` pairs, with no excludes.
pub fn ordered(raw: &[(&str, &str)]) -> OrderedChanges {
    let builder = ChangeSetBuilder::new::<&str>(&[]).unwrap();
    let (set, _) = builder.build(raw.iter().map(|(kind, path)| RawChange::new(*kind, *path)));
    OrderedChanges::from_working_set(set)
}

/// Create a working tree holding `files`; a path ending in `/` is a directory.
///
/// Returns (TempDir, SourceTree) - keep the TempDir alive to prevent cleanup.
pub fn working_tree(files: &[(&str, &str)]) -> (TempDir, SourceTree) {
    let dir = TempDir::new().unwrap();
    for (path, content) in files {
        let full = dir.path().join(path);
        if path.ends_with('/') {
            fs::create_dir_all(&full).unwrap();
        } else {
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(&full, content).unwrap();
        }
    }
    let source = SourceTree::new(dir.path());
    (dir, source)
}
