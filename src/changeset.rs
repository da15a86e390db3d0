// src/changeset.rs

//! Change set builder
//!
//! Turns the raw change list from change discovery into a `WorkingSet`:
//! paths are normalized, and unknown change kinds, invalid paths, excluded
//! paths and duplicates are dropped (and counted). The rest is kept in
//! input order. Ordering happens afterwards, in
//! `crate::order`.

use crate::change::{Change, RawChange};
use crate::error::{Error, Result};
use crate::path::normalize;
use glob::Pattern;
use std::collections::HashSet;
use tracing::{info, warn};

/// Changes selected for deployment, in input order
///
/// No two entries share a path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingSet {
    changes: Vec<Change>,
}

impl WorkingSet {
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Change> {
        self.changes.iter()
    }

    /// Convert back to raw changes (e.g. to feed another builder)
    pub fn to_raw(&self) -> Vec<RawChange> {
        self.changes.iter().map(RawChange::from).collect()
    }

    pub(crate) fn into_changes(self) -> Vec<Change> {
        self.changes
    }
}

/// Counts of entries dropped while building a working set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    /// Entries whose kind is not added/modified/deleted
    pub unknown_kind: usize,
    /// Entries whose path is empty or climbs out of the root
    pub invalid_path: usize,
    /// Entries matching an exclude pattern
    pub excluded: usize,
    /// Entries repeating a path already in the set
    pub duplicates: usize,
}

impl FilterStats {
    pub fn dropped(&self) -> usize {
        self.unknown_kind + self.invalid_path + self.excluded + self.duplicates
    }
}

/// Builds working sets from raw change lists
#[derive(Debug, Clone, Default)]
pub struct ChangeSetBuilder {
    excludes: Vec<Pattern>,
}

impl ChangeSetBuilder {
    /// Create a builder with the given exclude globs
    ///
    /// Patterns use fnmatch semantics: `*` also matches `/`.
    pub fn new<S: AsRef<str>>(excludes: &[S]) -> Result<Self> {
        let excludes = excludes
            .iter()
            .map(|pat| {
                Pattern::new(pat.as_ref()).map_err(|e| Error::InvalidPattern {
                    pattern: pat.as_ref().to_string(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { excludes })
    }

    /// First exclude pattern matching the path, if any
    pub fn excluded_by(&self, path: &str) -> Option<&Pattern> {
        self.excludes.iter().find(|pattern| pattern.matches(path))
    }

    /// Filter a raw change list into a working set
    pub fn build<I>(&self, raw: I) -> (WorkingSet, FilterStats)
    where
        I: IntoIterator<Item = RawChange>,
    {
        let mut stats = FilterStats::default();
        let mut seen = HashSet::new();
        let mut changes = Vec::new();

        for entry in raw {
            let Some(kind) = entry.change_kind() else {
                warn!(
                    "Skipping changed file with type: {} ({})",
                    entry.kind, entry.path
                );
                stats.unknown_kind += 1;
                continue;
            };

            let path = match normalize(&entry.path) {
                Ok(path) => path,
                Err(e) => {
                    warn!("Skipping changed file with invalid path: {}", e);
                    stats.invalid_path += 1;
                    continue;
                }
            };

            if let Some(pattern) = self.excluded_by(&path) {
                info!(
                    "Skipping excluded file: {} (matches '{}')",
                    path,
                    pattern.as_str()
                );
                stats.excluded += 1;
                continue;
            }

            if !seen.insert(path.clone()) {
                warn!("Skipping duplicate change for {}", path);
                stats.duplicates += 1;
                continue;
            }

            changes.push(Change::new(kind, path));
        }

        info!("{} change(s) to push", changes.len());

        (WorkingSet { changes }, stats)
    }
}
