// src/deploy/mod.rs

//! Deployment engine
//!
//! A deployment applies one ordered change set to a target in phases:
//!
//! ```text
//! NEW -> PREPARED -> STAGED -> COMMITTED -> FINISHED
//!            \          \          \
//!             +----------+----------+--> FAILED (fatal error)
//!
//! any state --revert--> REVERTED
//! ```
//!
//! - **prepare**: fresh temporary root with push and revert areas
//! - **stage**: upload new and modified content into the push area
//! - **commit**: promote staged content, backing up what it replaces
//! - **permissions**: apply permission rules to committed paths
//! - **finish**: record the revision and remove the temporary root
//!
//! Commit appends every change it actually applied to an `AppliedRecord`.
//! Reverting walks that record backwards and undoes each entry with the
//! backups left in the revert area. The engine never reverts on its own:
//! a fatal error leaves the deployment `Failed` and the caller decides.
//!
//! Plan mode wraps the target in a `DryRunTarget`, so planning runs the
//! exact same code as applying.

mod commit;
mod permissions;
mod revert;
mod stage;

pub use commit::{CommitOutcome, CommitReport, SkipReason};
pub use permissions::{PermissionOutcome, PermissionReport};
pub use revert::RevertReport;
pub use stage::StageReport;

use crate::change::{Change, Revision};
use crate::error::{Error, Result};
use crate::layout::StagingLayout;
use crate::order::OrderedChanges;
use crate::permission::PermissionRules;
use crate::progress::{ProgressTracker, SilentProgress};
use crate::revision::RevisionTracker;
use crate::source::SourceTree;
use crate::target::{DryRunTarget, Target};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Whether a deployment changes the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeployMode {
    /// Dry run: every check and warning, no mutation
    #[default]
    Plan,
    /// Real run
    Apply,
}

impl DeployMode {
    pub fn is_plan(&self) -> bool {
        *self == Self::Plan
    }
}

impl fmt::Display for DeployMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plan => write!(f, "plan"),
            Self::Apply => write!(f, "apply"),
        }
    }
}

/// Deployment configuration
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    pub mode: DeployMode,
    pub layout: StagingLayout,
    pub permissions: PermissionRules,
}

impl DeployOptions {
    pub fn new(mode: DeployMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn with_layout(mut self, layout: StagingLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_permissions(mut self, permissions: PermissionRules) -> Self {
        self.permissions = permissions;
        self
    }
}

/// Deployment state machine phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployState {
    /// Created, nothing touched
    New,
    /// Temporary root ready
    Prepared,
    /// Content uploaded to the push area
    Staged,
    /// Live paths changed
    Committed,
    /// Revision recorded, temporary root removed
    Finished,
    /// Applied changes undone
    Reverted,
    /// A phase hit a fatal error
    Failed,
}

impl fmt::Display for DeployState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One change that commit applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedChange {
    pub change: Change,
    /// The entry is a directory
    pub is_dir: bool,
    /// The previous entry was saved in the revert area
    pub backed_up: bool,
}

/// Changes applied by commit, in commit order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedRecord {
    changes: Vec<AppliedChange>,
}

impl AppliedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, applied: AppliedChange) {
        self.changes.push(applied);
    }

    pub fn changes(&self) -> &[AppliedChange] {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AppliedChange> {
        self.changes.iter()
    }

    /// True if a change to this path was applied
    pub fn contains(&self, path: &str) -> bool {
        self.changes.iter().any(|c| c.change.path() == path)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the record to a local file
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load a record written by `save`
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}

/// Summary of a complete run
#[derive(Debug, Clone)]
pub struct DeployReport {
    pub mode: DeployMode,
    pub previous_revision: Option<Revision>,
    pub revision: Revision,
    pub stage: StageReport,
    pub commit: CommitReport,
    pub permissions: PermissionReport,
    /// Whether the temporary root was removed
    pub cleaned_up: bool,
}

/// A single deployment run against one target
pub struct Deployment {
    target: Box<dyn Target>,
    source: SourceTree,
    mode: DeployMode,
    layout: StagingLayout,
    rules: PermissionRules,
    progress: Arc<dyn ProgressTracker>,
    revision: RevisionTracker,
    applied: AppliedRecord,
    state: DeployState,
}

impl Deployment {
    /// Create a deployment; in plan mode the target is wrapped in a `DryRunTarget`
    pub fn new<T: Target + 'static>(target: T, source: SourceTree, options: DeployOptions) -> Self {
        let target: Box<dyn Target> = match options.mode {
            DeployMode::Plan => Box::new(DryRunTarget::new(target)),
            DeployMode::Apply => Box::new(target),
        };

        Self {
            target,
            source,
            mode: options.mode,
            revision: RevisionTracker::new(options.layout.marker()),
            layout: options.layout,
            rules: options.permissions,
            progress: Arc::new(SilentProgress::new()),
            applied: AppliedRecord::new(),
            state: DeployState::New,
        }
    }

    /// Set the progress tracker
    pub fn with_progress(mut self, progress: Arc<dyn ProgressTracker>) -> Self {
        self.progress = progress;
        self
    }

    /// Seed the applied record, e.g. one saved by an aborted run
    pub fn with_applied(mut self, applied: AppliedRecord) -> Self {
        self.applied = applied;
        self
    }

    pub fn state(&self) -> DeployState {
        self.state
    }

    pub fn mode(&self) -> DeployMode {
        self.mode
    }

    pub fn layout(&self) -> &StagingLayout {
        &self.layout
    }

    pub fn target(&self) -> &dyn Target {
        self.target.as_ref()
    }

    /// Changes applied so far
    pub fn applied(&self) -> &AppliedRecord {
        &self.applied
    }

    /// Last deployed revision according to the marker
    pub fn current_revision(&mut self) -> Result<Option<Revision>> {
        self.revision.read(self.target.as_ref())
    }

    /// Use a known revision instead of reading the marker
    pub fn set_current_revision(&mut self, revision: Option<Revision>) {
        self.revision.set(revision);
    }

    fn require_state(&self, expected: DeployState, operation: &str) -> Result<()> {
        if self.state != expected {
            return Err(Error::InvalidState {
                operation: operation.to_string(),
                state: self.state.to_string(),
            });
        }
        Ok(())
    }

    /// Move to `Failed` if a phase errored
    fn track<R>(&mut self, result: Result<R>) -> Result<R> {
        if result.is_err() {
            self.state = DeployState::Failed;
        }
        result
    }

    /// Create the temporary root, removing one left by an earlier run
    pub fn prepare(&mut self) -> Result<()> {
        self.require_state(DeployState::New, "prepare")?;

        let result = self.layout.prepare(self.target.as_ref());
        self.track(result)?;

        self.state = DeployState::Prepared;
        Ok(())
    }

    /// Upload new and modified content into the push area
    pub fn stage(&mut self, changes: &OrderedChanges) -> Result<StageReport> {
        self.require_state(DeployState::Prepared, "stage")?;

        let result = stage::stage_changes(
            self.target.as_ref(),
            &self.source,
            &self.layout,
            changes,
            self.progress.as_ref(),
        );
        let report = self.track(result)?;

        self.state = DeployState::Staged;
        Ok(report)
    }

    /// Promote staged content into live paths
    pub fn commit(&mut self, changes: &OrderedChanges) -> Result<CommitReport> {
        self.require_state(DeployState::Staged, "commit")?;

        let result = commit::commit_changes(
            self.target.as_ref(),
            &self.source,
            &self.layout,
            changes,
            self.progress.as_ref(),
            &mut self.applied,
        );
        let report = self.track(result)?;

        self.state = DeployState::Committed;
        Ok(report)
    }

    /// Apply permission rules to the changed paths
    pub fn apply_permissions(&mut self, changes: &OrderedChanges) -> Result<PermissionReport> {
        self.require_state(DeployState::Committed, "set permissions for")?;

        let result = permissions::apply_permissions(
            self.target.as_ref(),
            &self.source,
            &self.rules,
            changes,
            self.progress.as_ref(),
        );
        self.track(result)
    }

    /// Record the deployed revision in the marker
    pub fn write_revision(&mut self, revision: &Revision) -> Result<()> {
        self.require_state(DeployState::Committed, "record revision for")?;

        let result = self.revision.write(self.target.as_ref(), revision);
        self.track(result)
    }

    /// Remove the temporary root and mark the deployment finished
    ///
    /// Returns whether cleanup succeeded; a failure is only a warning.
    pub fn finish(&mut self) -> Result<bool> {
        self.require_state(DeployState::Committed, "finish")?;

        let cleaned = self.cleanup();
        self.state = DeployState::Finished;
        Ok(cleaned)
    }

    /// Remove the temporary root without changing state
    pub fn cleanup(&self) -> bool {
        self.layout.cleanup(self.target.as_ref())
    }

    /// Undo everything in the applied record
    ///
    /// Best effort: per-entry failures are reported, not raised. Allowed
    /// from any state.
    pub fn revert(&mut self) -> RevertReport {
        let report = revert::revert_changes(
            self.target.as_ref(),
            &self.layout,
            &self.applied,
            self.progress.as_ref(),
        );

        self.state = DeployState::Reverted;
        report
    }

    /// Run every phase in order
    ///
    /// Stops at the first fatal error, leaving the deployment `Failed`
    /// with its applied record intact for the caller to revert or save.
    pub fn run(&mut self, changes: &OrderedChanges, revision: &Revision) -> Result<DeployReport> {
        let previous_revision = self.current_revision()?;
        match &previous_revision {
            Some(previous) => info!("Deploying {} over {} ({})", revision, previous, self.mode),
            None => info!("Deploying {} to an empty target ({})", revision, self.mode),
        }

        self.prepare()?;
        let stage = self.stage(changes)?;
        if stage.conflicts > 0 {
            warn!("{} conflict(s) found while staging", stage.conflicts);
        }

        let commit = self.commit(changes)?;
        let permissions = self.apply_permissions(changes)?;
        self.write_revision(revision)?;
        let cleaned_up = self.finish()?;

        info!(
            "Deployed {}: {} applied, {} skipped",
            revision,
            commit.applied(),
            commit.skipped()
        );

        Ok(DeployReport {
            mode: self.mode,
            previous_revision,
            revision: revision.clone(),
            stage,
            commit,
            permissions,
            cleaned_up,
        })
    }
}

impl fmt::Debug for Deployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deployment")
            .field("mode", &self.mode)
            .field("state", &self.state)
            .field("layout", &self.layout)
            .field("applied", &self.applied.len())
            .finish()
    }
}
