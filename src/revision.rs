// src/revision.rs

//! Revision marker
//!
//! The target keeps the last deployed revision in a single text file at
//! the root. A missing marker means nothing has been deployed yet.

use crate::change::Revision;
use crate::error::{Error, Result};
use crate::target::{Target, TargetError};
use tracing::{debug, info};

/// Reads and writes the revision marker, caching what it read
#[derive(Debug, Clone)]
pub struct RevisionTracker {
    marker: String,
    cached: Option<Option<Revision>>,
}

impl RevisionTracker {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            cached: None,
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Last deployed revision, `None` if the marker does not exist
    ///
    /// The marker is read once; later calls return the cached value.
    pub fn read<T: Target + ?Sized>(&mut self, target: &T) -> Result<Option<Revision>> {
        if let Some(cached) = &self.cached {
            return Ok(cached.clone());
        }

        let revision = match target.read(&self.marker) {
            Ok(content) => Some(Revision::parse(&content)?),
            Err(TargetError::NotFound(_)) => {
                debug!("No revision marker at {}", self.marker);
                None
            }
            Err(e) => return Err(Error::RevisionRead(e)),
        };

        self.cached = Some(revision.clone());
        Ok(revision)
    }

    /// Set the revision without reading the marker
    pub fn set(&mut self, revision: Option<Revision>) {
        self.cached = Some(revision);
    }

    /// Record a deployed revision in the marker
    ///
    /// Updates the marker if it exists, creates it otherwise.
    pub fn write<T: Target + ?Sized>(&mut self, target: &T, revision: &Revision) -> Result<()> {
        if target.has(&self.marker)? {
            target.update(&self.marker, revision.as_str())?;
        } else {
            target.write(&self.marker, revision.as_str())?;
        }

        info!("Revision marker set to {}", revision);
        self.cached = Some(Some(revision.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{DryRunTarget, MemoryTarget};

    fn rev(s: &str) -> Revision {
        Revision::parse(s).unwrap()
    }

    #[test]
    fn test_read_missing_marker() {
        let target = MemoryTarget::new();
        let mut tracker = RevisionTracker::new(".stagehand.rev");
        assert_eq!(tracker.read(&target).unwrap(), None);
    }

    #[test]
    fn test_read_trims_marker() {
        let target = MemoryTarget::new().with_file(".stagehand.rev", "abc123\n");
        let mut tracker = RevisionTracker::new(".stagehand.rev");
        assert_eq!(tracker.read(&target).unwrap(), Some(rev("abc123")));
    }

    #[test]
    fn test_read_failure_is_fatal() {
        let target = MemoryTarget::new().with_file(".stagehand.rev", "abc123");
        target.fail_on(".stagehand.rev");

        let mut tracker = RevisionTracker::new(".stagehand.rev");
        let err = tracker.read(&target).unwrap_err();
        assert!(matches!(err, Error::RevisionRead(_)));
    }

    #[test]
    fn test_read_is_cached() {
        let target = MemoryTarget::new().with_file(".stagehand.rev", "one");
        let mut tracker = RevisionTracker::new(".stagehand.rev");
        tracker.read(&target).unwrap();

        target.update(".stagehand.rev", "two").unwrap();
        assert_eq!(tracker.read(&target).unwrap(), Some(rev("one")));
    }

    #[test]
    fn test_set_overrides_marker() {
        let target = MemoryTarget::new();
        let mut tracker = RevisionTracker::new(".stagehand.rev");
        tracker.set(Some(rev("known")));
        assert_eq!(tracker.read(&target).unwrap(), Some(rev("known")));
    }

    #[test]
    fn test_write_creates_then_updates() {
        let target = MemoryTarget::new();
        let mut tracker = RevisionTracker::new(".stagehand.rev");

        tracker.write(&target, &rev("first")).unwrap();
        assert_eq!(target.read(".stagehand.rev").unwrap(), "first");

        tracker.write(&target, &rev("second")).unwrap();
        assert_eq!(target.read(".stagehand.rev").unwrap(), "second");
        assert_eq!(tracker.read(&target).unwrap(), Some(rev("second")));
    }

    #[test]
    fn test_write_is_noop_in_plan_mode() {
        let target = DryRunTarget::new(MemoryTarget::new());
        let mut tracker = RevisionTracker::new(".stagehand.rev");

        tracker.write(&target, &rev("planned")).unwrap();
        assert!(target.inner().paths().is_empty());
    }
}
