// src/layout.rs

//! Staging layout on the target
//!
//! ```text
//! <target root>/
//!   .stagehand.rev          revision marker
//!   .stagehand.tmp/         temporary root, one run only
//!     push/<path>           staged content for added/modified entries
//!     revert/<path>         backups of entries replaced or deleted
//! ```
//!
//! Both areas mirror the live tree's relative paths.

use crate::error::{Error, Result};
use crate::path::join;
use crate::target::Target;
use tracing::{debug, info, warn};

/// Default temporary root
pub const TMP_DIR: &str = ".stagehand.tmp";

/// Default push area name under the temporary root
pub const PUSH_DIR: &str = "push";

/// Default revert area name under the temporary root
pub const REVERT_DIR: &str = "revert";

/// Default revision marker
pub const REV_FILE: &str = ".stagehand.rev";

/// Fixed paths used by a deployment on the target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingLayout {
    tmp_root: String,
    push_root: String,
    revert_root: String,
    marker: String,
}

impl Default for StagingLayout {
    fn default() -> Self {
        Self::new(TMP_DIR, PUSH_DIR, REVERT_DIR, REV_FILE)
    }
}

impl StagingLayout {
    /// Layout with custom names
    pub fn new(tmp_root: &str, push: &str, revert: &str, marker: &str) -> Self {
        let tmp_root = tmp_root.trim_matches('/').to_string();
        Self {
            push_root: join(&tmp_root, push),
            revert_root: join(&tmp_root, revert),
            tmp_root,
            marker: marker.trim_matches('/').to_string(),
        }
    }

    pub fn tmp_root(&self) -> &str {
        &self.tmp_root
    }

    pub fn push_root(&self) -> &str {
        &self.push_root
    }

    pub fn revert_root(&self) -> &str {
        &self.revert_root
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Location of a change path in the push area
    pub fn push_path(&self, path: &str) -> String {
        join(&self.push_root, path)
    }

    /// Location of a change path in the revert area
    pub fn revert_path(&self, path: &str) -> String {
        join(&self.revert_root, path)
    }

    /// Create a fresh temporary root with empty push and revert areas
    ///
    /// A temporary root left over from an earlier run is deleted first.
    /// Failing to delete it is fatal: staging on top of stale content
    /// would mix two runs.
    pub fn prepare<T: Target + ?Sized>(&self, target: &T) -> Result<()> {
        if target.has(&self.tmp_root)? {
            info!("Deleting leftover temporary directory {}", self.tmp_root);
            target
                .delete_dir(&self.tmp_root)
                .map_err(|source| Error::TempDirCleanup {
                    path: self.tmp_root.clone(),
                    source,
                })?;
        }

        target.create_dir(&self.tmp_root)?;
        target.create_dir(&self.push_root)?;
        target.create_dir(&self.revert_root)?;
        debug!("Prepared staging layout under {}", self.tmp_root);

        Ok(())
    }

    /// Remove the temporary root
    ///
    /// Never fails the run; a leftover root is cleaned up by the next
    /// `prepare`. Returns whether the removal succeeded.
    pub fn cleanup<T: Target + ?Sized>(&self, target: &T) -> bool {
        match target.delete_dir(&self.tmp_root) {
            Ok(()) => {
                debug!("Removed temporary directory {}", self.tmp_root);
                true
            }
            Err(e) => {
                warn!(
                    "Could not delete temporary directory {}: {}",
                    self.tmp_root, e
                );
                false
            }
        }
    }
}
