// src/deploy/revert.rs

//! Revert phase
//!
//! Undoes an applied record using the backups commit left in the revert
//! area. Entries are undone in reverse commit order, so a deleted
//! directory is back before anything that was inside it, and an added
//! child is gone before its added parent.
//!
//! Revert is best effort: a failing entry is logged and the rest are
//! still attempted. Nothing outside the applied record is touched.

use crate::change::ChangeKind;
use crate::layout::StagingLayout;
use crate::progress::{Phase, ProgressTracker};
use crate::target::{Target, TargetError, TargetResult};
use tracing::{debug, info, warn};

use super::{AppliedChange, AppliedRecord};

/// Result of reverting an applied record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevertReport {
    /// Entries restored to their previous state
    pub reverted: usize,
    /// Entries that could not be restored, with the reason
    pub failed: Vec<(String, String)>,
}

impl RevertReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Undo applied entries newest first, so a deleted directory is restored
/// before anything that was removed from inside it
pub(super) fn revert_changes(
    target: &dyn Target,
    layout: &StagingLayout,
    applied: &AppliedRecord,
    progress: &dyn ProgressTracker,
) -> RevertReport {
    let mut report = RevertReport::default();
    progress.start(Phase::Reverting, applied.len() as u64);

    for (index, entry) in applied.changes().iter().rev().enumerate() {
        match revert_entry(target, layout, entry) {
            Ok(()) => {
                debug!("Reverted {}", entry.change);
                report.reverted += 1;
            }
            Err(e) => {
                warn!("Could not revert {}: {}", entry.change, e);
                report
                    .failed
                    .push((entry.change.path().to_string(), e.to_string()));
            }
        }

        progress.set_position(index as u64 + 1);
    }

    progress.finish();
    info!(
        "Reverted {} of {} change(s)",
        report.reverted,
        applied.len()
    );

    report
}

fn revert_entry(
    target: &dyn Target,
    layout: &StagingLayout,
    entry: &AppliedChange,
) -> TargetResult<()> {
    let path = entry.change.path();

    match entry.change.kind() {
        ChangeKind::Added => remove(target, path, entry.is_dir),
        ChangeKind::Deleted | ChangeKind::Modified => {
            if !entry.backed_up {
                // Nothing was there before commit
                return match entry.change.kind() {
                    ChangeKind::Modified => remove(target, path, false),
                    _ => Ok(()),
                };
            }

            let backup = layout.revert_path(path);
            if !target.has(&backup)? {
                return Err(TargetError::NotFound(backup));
            }

            // Clear the replacement so the backup can move back in
            if target.has(path)? {
                remove(target, path, entry.is_dir)?;
            }
            target.rename(&backup, path)
        }
    }
}

/// Delete an entry, as a directory or a file
fn remove(target: &dyn Target, path: &str, is_dir: bool) -> TargetResult<()> {
    let result = if is_dir {
        target.delete_dir(path)
    } else {
        target.delete(path)
    };

    match result {
        // Already gone is as good as removed
        Err(TargetError::NotFound(_)) => Ok(()),
        other => other,
    }
}
