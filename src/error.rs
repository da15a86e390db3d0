// src/error.rs

//! Error types for stagehand
//!
//! `Error` covers everything that aborts a deployment run. Per-item problems
//! (conflicts, skipped commits, invalid permission specs) are not errors:
//! they are reported as values by the phase that hit them.

use crate::target::TargetError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for stagehand operations
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal deployment error
#[derive(Error, Debug)]
pub enum Error {
    /// Unhandled storage backend failure
    #[error("Target error: {0}")]
    Target(#[from] TargetError),

    /// Local I/O failure (reading the working tree)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A changed file is missing from the local working tree
    #[error("File not found in working tree: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// Revision marker content could not be parsed
    #[error("Invalid revision: {0}")]
    InvalidRevision(String),

    /// Glob pattern failed to compile
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Path rejected by sanitization
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Path traversal attempt
    #[error("Path traversal detected: {0}")]
    PathTraversal(String),

    /// Malformed change list input
    #[error("Invalid change list at line {line}: {message}")]
    InvalidChangeList { line: usize, message: String },

    /// Profile configuration problem
    #[error("Configuration error: {0}")]
    Config(String),

    /// A leftover temporary directory could not be removed before staging
    #[error(
        "Could not delete existing temporary directory '{path}' on the target: \
         delete it manually before trying to push again ({source})"
    )]
    TempDirCleanup {
        path: String,
        #[source]
        source: TargetError,
    },

    /// Reading the revision marker failed for a reason other than absence
    #[error("Error while getting revision from target: {0}")]
    RevisionRead(#[source] TargetError),

    /// Phase invoked out of order
    #[error("Cannot {operation} deployment in state {state}")]
    InvalidState { operation: String, state: String },

    /// Applied record (de)serialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
