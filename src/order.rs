// src/order.rs

//! Change ordering
//!
//! Changes are applied added-first, then modified, then deleted. Additions
//! and modifications go in ascending path order so parent directories are
//! created before their children; deletions go in descending path order so
//! children are removed before their parents.
//!
//! `OrderedChanges` can only be built here, which is what lets the phase
//! engines require an ordered sequence instead of trusting the caller.

use crate::change::{Change, ChangeKind};
use crate::changeset::WorkingSet;
use std::cmp::Ordering;

/// Partition rank of a change kind
fn rank(kind: ChangeKind) -> u8 {
    match kind {
        ChangeKind::Added => 0,
        ChangeKind::Modified => 1,
        ChangeKind::Deleted => 2,
    }
}

/// Compare two changes by application order
pub fn compare(a: &Change, b: &Change) -> Ordering {
    match (a.kind(), b.kind()) {
        (ChangeKind::Added, ChangeKind::Added) | (ChangeKind::Modified, ChangeKind::Modified) => {
            a.path().cmp(b.path())
        }
        (ChangeKind::Deleted, ChangeKind::Deleted) => b.path().cmp(a.path()),
        (ka, kb) => rank(ka).cmp(&rank(kb)),
    }
}

/// A working set sorted into application order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedChanges {
    changes: Vec<Change>,
}

impl OrderedChanges {
    /// Sort a working set into application order
    pub fn from_working_set(set: WorkingSet) -> Self {
        let mut changes = set.into_changes();
        // Stable, so equal keys keep input order (paths are unique anyway)
        changes.sort_by(compare);
        Self { changes }
    }

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
}

impl From<WorkingSet> for OrderedChanges {
    fn from(set: WorkingSet) -> Self {
        Self::from_working_set(set)
    }
}

impl<'a> IntoIterator for &'a OrderedChanges {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}
