// src/target/dry_run.rs

//! Plan-mode decorator
//!
//! Wraps a target so that every read goes to the real backend and every
//! mutation is logged and reported as successful without touching it.
//! Running the normal phases against a `DryRunTarget` is plan mode: the
//! same checks, warnings and progress, no changes.

use super::{Permission, Target, TargetResult, Visibility, VisibilityModel};
use std::io::Read;
use tracing::debug;

/// Target decorator that suppresses all mutations
#[derive(Debug, Clone)]
pub struct DryRunTarget<T> {
    inner: T,
}

impl<T: Target> DryRunTarget<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// The wrapped target
    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Target> Target for DryRunTarget<T> {
    fn visibility_model(&self) -> VisibilityModel {
        self.inner.visibility_model()
    }

    fn has(&self, path: &str) -> TargetResult<bool> {
        self.inner.has(path)
    }

    fn is_directory(&self, path: &str) -> TargetResult<bool> {
        self.inner.is_directory(path)
    }

    fn read(&self, path: &str) -> TargetResult<String> {
        self.inner.read(path)
    }

    fn write(&self, path: &str, _contents: &str) -> TargetResult<()> {
        debug!("[dry run] write {}", path);
        Ok(())
    }

    fn update(&self, path: &str, _contents: &str) -> TargetResult<()> {
        debug!("[dry run] update {}", path);
        Ok(())
    }

    fn write_stream(&self, path: &str, _reader: &mut dyn Read) -> TargetResult<()> {
        debug!("[dry run] upload {}", path);
        Ok(())
    }

    fn rename(&self, from: &str, to: &str) -> TargetResult<()> {
        debug!("[dry run] move {} -> {}", from, to);
        Ok(())
    }

    fn copy(&self, from: &str, to: &str) -> TargetResult<()> {
        debug!("[dry run] copy {} -> {}", from, to);
        Ok(())
    }

    fn delete(&self, path: &str) -> TargetResult<()> {
        debug!("[dry run] delete {}", path);
        Ok(())
    }

    fn delete_dir(&self, path: &str) -> TargetResult<()> {
        debug!("[dry run] delete directory {}", path);
        Ok(())
    }

    fn create_dir(&self, path: &str) -> TargetResult<()> {
        debug!("[dry run] create directory {}", path);
        Ok(())
    }

    fn set_visibility(&self, path: &str, visibility: Visibility) -> TargetResult<()> {
        debug!("[dry run] set {} {}", path, visibility);
        Ok(())
    }

    fn visibility(&self, path: &str) -> TargetResult<Visibility> {
        self.inner.visibility(path)
    }

    fn public_mode(&self) -> Option<u32> {
        self.inner.public_mode()
    }

    fn set_public_mode(&self, mode: u32) -> TargetResult<()> {
        debug!("[dry run] set public mode {:04o}", mode);
        Ok(())
    }

    fn apply_permission(&self, path: &str, permission: Permission) -> TargetResult<()> {
        debug!("[dry run] set {} {}", path, permission);
        Ok(())
    }
}
