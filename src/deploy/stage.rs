// src/deploy/stage.rs

//! Staging phase
//!
//! Uploads added and modified content into the push area and checks every
//! change against the live tree. Live paths are never touched here.
//!
//! A conflict is a change that does not match what the target holds: an
//! added path that already exists, or a modified or deleted path that does
//! not. Conflicts are warnings; commit decides what happens to the item.

use crate::change::{Change, ChangeKind};
use crate::error::Result;
use crate::layout::StagingLayout;
use crate::order::OrderedChanges;
use crate::progress::{Phase, ProgressTracker};
use crate::source::SourceTree;
use crate::target::{Target, TargetError};
use tracing::{debug, info, warn};

/// Result of the staging phase
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    /// Number of conflict warnings
    pub conflicts: usize,
    /// Paths that raised a conflict warning
    pub conflict_paths: Vec<String>,
    /// Entries written to the push area
    pub staged: usize,
}

impl StageReport {
    fn conflict(&mut self, change: &Change, reason: &str) {
        warn!("Conflict: {} {}", change.path(), reason);
        self.conflicts += 1;
        self.conflict_paths.push(change.path().to_string());
    }
}

pub(super) fn stage_changes(
    target: &dyn Target,
    source: &SourceTree,
    layout: &StagingLayout,
    changes: &OrderedChanges,
    progress: &dyn ProgressTracker,
) -> Result<StageReport> {
    let mut report = StageReport::default();
    progress.start(Phase::Staging, changes.len() as u64);

    for (index, change) in changes.iter().enumerate() {
        let path = change.path();
        let exists = target.has(path)?;

        match change.kind() {
            ChangeKind::Added => {
                if exists {
                    report.conflict(change, "already exists on the target");
                }
                if source.is_dir(path)? {
                    stage_dir(target, &layout.push_path(path))?;
                } else {
                    upload(target, source, layout, path)?;
                }
                report.staged += 1;
            }
            ChangeKind::Modified => {
                if !exists {
                    report.conflict(change, "does not exist on the target");
                }
                if source.is_dir(path)? {
                    warn!("Skipping modified directory {}", path);
                } else {
                    upload(target, source, layout, path)?;
                    report.staged += 1;
                }
            }
            ChangeKind::Deleted => {
                if !exists {
                    report.conflict(change, "does not exist on the target");
                }
            }
        }

        progress.set_position(index as u64 + 1);
    }

    progress.finish();
    info!(
        "Staged {} of {} change(s), {} conflict(s)",
        report.staged,
        changes.len(),
        report.conflicts
    );

    Ok(report)
}

/// Create an empty directory in the push area
fn stage_dir(target: &dyn Target, push_path: &str) -> Result<()> {
    match target.create_dir(push_path) {
        // Already created as the parent of an earlier upload
        Ok(()) | Err(TargetError::AlreadyExists(_)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Stream a working tree file into the push area
fn upload(
    target: &dyn Target,
    source: &SourceTree,
    layout: &StagingLayout,
    path: &str,
) -> Result<()> {
    let mut file = source.open(path)?;
    let push_path = layout.push_path(path);
    debug!("Uploading {} to {}", path, push_path);
    target.write_stream(&push_path, &mut file)?;
    Ok(())
}
