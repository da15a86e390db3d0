// src/deploy/commit.rs

//! Commit phase
//!
//! Promotes staged content into live paths:
//! - added directories are created, added files moved out of the push area
//! - deleted entries are copied into the revert area, then removed
//! - modified entries are moved into the revert area and replaced
//!
//! An entry that is missing or already present where commit expects
//! otherwise is skipped with a warning and left out of the applied
//! record. Any other target failure aborts the phase.

use crate::change::{Change, ChangeKind};
use crate::error::Result;
use crate::layout::StagingLayout;
use crate::order::OrderedChanges;
use crate::progress::{Phase, ProgressTracker};
use crate::source::SourceTree;
use crate::target::{Target, TargetError};
use std::fmt;
use tracing::{debug, info, warn};

use super::{AppliedChange, AppliedRecord};

/// Why commit left a change out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The destination was already taken
    AlreadyExists(String),
    /// An entry the change relies on was missing
    NotFound(String),
    /// Modified directories have no content to replace
    Directory,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyExists(path) => write!(f, "{} already exists", path),
            Self::NotFound(path) => write!(f, "{} not found", path),
            Self::Directory => write!(f, "modified entry is a directory"),
        }
    }
}

/// What commit did with one change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied,
    Skipped(SkipReason),
}

/// Result of the commit phase
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub outcomes: Vec<(Change, CommitOutcome)>,
}

impl CommitReport {
    pub fn applied(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| *outcome == CommitOutcome::Applied)
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.applied()
    }

    /// Outcome recorded for a path
    pub fn outcome(&self, path: &str) -> Option<&CommitOutcome> {
        self.outcomes
            .iter()
            .find(|(change, _)| change.path() == path)
            .map(|(_, outcome)| outcome)
    }
}

/// Convert an item-level failure into a skip, propagate anything else
fn skip_on_item_error(err: TargetError) -> Result<SkipReason> {
    match err {
        TargetError::AlreadyExists(path) => Ok(SkipReason::AlreadyExists(path)),
        TargetError::NotFound(path) => Ok(SkipReason::NotFound(path)),
        other => Err(other.into()),
    }
}

pub(super) fn commit_changes(
    target: &dyn Target,
    source: &SourceTree,
    layout: &StagingLayout,
    changes: &OrderedChanges,
    progress: &dyn ProgressTracker,
    applied: &mut AppliedRecord,
) -> Result<CommitReport> {
    let mut report = CommitReport::default();
    progress.start(Phase::Committing, changes.len() as u64);

    for (index, change) in changes.iter().enumerate() {
        let result = match change.kind() {
            ChangeKind::Added => commit_added(target, source, layout, change)?,
            ChangeKind::Deleted => commit_deleted(target, layout, change)?,
            ChangeKind::Modified => commit_modified(target, source, layout, change)?,
        };

        let outcome = match result {
            Ok(entry) => {
                debug!("Committed {}", change);
                applied.push(entry);
                CommitOutcome::Applied
            }
            Err(reason) => {
                warn!("Skipping {}: {}", change, reason);
                CommitOutcome::Skipped(reason)
            }
        };
        report.outcomes.push((change.clone(), outcome));

        progress.set_position(index as u64 + 1);
    }

    progress.finish();
    info!(
        "Committed {} change(s), skipped {}",
        report.applied(),
        report.skipped()
    );

    Ok(report)
}

/// Outer `Result` is fatal, inner one is a per-item skip
type ItemResult = Result<std::result::Result<AppliedChange, SkipReason>>;

fn commit_added(
    target: &dyn Target,
    source: &SourceTree,
    layout: &StagingLayout,
    change: &Change,
) -> ItemResult {
    let path = change.path();
    let is_dir = source.is_dir(path)?;

    let result = if is_dir {
        target.create_dir(path)
    } else {
        target.rename(&layout.push_path(path), path)
    };

    match result {
        Ok(()) => Ok(Ok(AppliedChange {
            change: change.clone(),
            is_dir,
            backed_up: false,
        })),
        Err(e) => skip_on_item_error(e).map(Err),
    }
}

fn commit_deleted(target: &dyn Target, layout: &StagingLayout, change: &Change) -> ItemResult {
    let path = change.path();

    let is_dir = match target.is_directory(path) {
        Ok(is_dir) => is_dir,
        Err(TargetError::NotFound(_)) => {
            // Already gone; recorded so revert knows there is nothing to restore
            debug!("{} is not on the target, nothing to delete", path);
            return Ok(Ok(AppliedChange {
                change: change.clone(),
                is_dir: false,
                backed_up: false,
            }));
        }
        Err(e) => return Err(e.into()),
    };

    if let Err(e) = target.copy(path, &layout.revert_path(path)) {
        // Never remove what could not be backed up
        return skip_on_item_error(e).map(Err);
    }

    let deleted = if is_dir {
        target.delete_dir(path)
    } else {
        target.delete(path)
    };
    match deleted {
        Ok(()) => {}
        Err(TargetError::NotFound(_)) => debug!("{} vanished before it was deleted", path),
        Err(e) => return Err(e.into()),
    }

    Ok(Ok(AppliedChange {
        change: change.clone(),
        is_dir,
        backed_up: true,
    }))
}

fn commit_modified(
    target: &dyn Target,
    source: &SourceTree,
    layout: &StagingLayout,
    change: &Change,
) -> ItemResult {
    let path = change.path();

    if source.is_dir(path)? {
        return Ok(Err(SkipReason::Directory));
    }

    let revert_path = layout.revert_path(path);
    let mut backed_up = false;

    if target.has(path)? {
        if let Err(e) = target.rename(path, &revert_path) {
            return skip_on_item_error(e).map(Err);
        }
        backed_up = true;
    }

    if let Err(e) = target.rename(&layout.push_path(path), path) {
        // Put the original back so the live path is never left empty
        if backed_up {
            if let Err(restore_err) = target.rename(&revert_path, path) {
                warn!("Could not restore {} after failed replace: {}", path, restore_err);
            }
        }
        return skip_on_item_error(e).map(Err);
    }

    Ok(Ok(AppliedChange {
        change: change.clone(),
        is_dir: false,
        backed_up,
    }))
}
