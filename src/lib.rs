// src/lib.rs

//! Stagehand
//!
//! Staged, reversible deployment of source-control changes to a storage
//! target.
//!
//! # Architecture
//!
//! - Change sets: raw `A`/`M`/`D` changes are filtered by exclude globs and
//!   put in a safe apply order (adds, then modifies, then deletes deepest
//!   first)
//! - Staging: new content is uploaded into a temporary area on the target
//!   before any live path is touched
//! - Commit: staged content is promoted and everything it replaces is
//!   backed up, so the deployment can be reverted
//! - Targets: storage backends behind the `Target` trait; plan mode wraps
//!   any target in a `DryRunTarget`
//! - Revisions: the deployed revision is recorded in a marker file on the
//!   target

pub mod change;
pub mod changeset;
pub mod config;
pub mod deploy;
mod error;
pub mod layout;
pub mod order;
pub mod path;
pub mod permission;
pub mod progress;
pub mod revision;
pub mod source;
pub mod target;

pub use change::{parse_name_status, Change, ChangeKind, RawChange, Revision};
pub use changeset::{ChangeSetBuilder, FilterStats, WorkingSet};
pub use config::{parse_profile_file, parse_profile_string, ConfigError, Profile};
pub use deploy::{
    AppliedChange, AppliedRecord, DeployMode, DeployOptions, DeployReport, DeployState,
    Deployment, RevertReport,
};
pub use error::{Error, Result};
pub use layout::StagingLayout;
pub use order::OrderedChanges;
pub use permission::{PermissionRule, PermissionRules, Resolution};
pub use progress::{
    CallbackProgress, LogProgress, Phase, ProgressEvent, ProgressTracker, SilentProgress,
};
pub use revision::RevisionTracker;
pub use source::SourceTree;
pub use target::{
    DryRunTarget, LocalTarget, MemoryTarget, Permission, Target, TargetError, Visibility,
    VisibilityModel,
};
