// src/source.rs

//! Local working tree
//!
//! The change list names paths relative to the working tree the revision
//! was checked out into. Staging reads new and modified content from here.

use crate::error::{Error, Result};
use crate::path::safe_join;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// Read-only view of the local working tree
#[derive(Debug, Clone)]
pub struct SourceTree {
    base: PathBuf,
}

impl SourceTree {
    pub fn new<P: AsRef<Path>>(base: P) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Absolute location of a change path
    pub fn resolve(&self, path: &str) -> Result<PathBuf> {
        safe_join(&self.base, path)
    }

    /// True if the path is a directory in the working tree
    pub fn is_dir(&self, path: &str) -> Result<bool> {
        Ok(self.resolve(path)?.is_dir())
    }

    /// Open a file for reading
    ///
    /// The handle is closed when dropped, whether or not the upload that
    /// consumes it succeeds.
    pub fn open(&self, path: &str) -> Result<File> {
        let full = self.resolve(path)?;
        File::open(&full).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::SourceNotFound(full),
            _ => Error::Io(e),
        })
    }
}
