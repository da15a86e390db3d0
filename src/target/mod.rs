// src/target/mod.rs

//! Deployment targets
//!
//! A target is the hierarchical store being deployed to. Every path handed
//! to a target is relative to its root and `/`-separated; adapters
//! normalize it with [`crate::path::normalize`] before touching storage.
//!
//! Three implementations ship with the crate:
//! - [`LocalTarget`]: a directory on local disk
//! - [`MemoryTarget`]: an in-memory tree, used by tests and embedders
//! - [`DryRunTarget`]: a decorator that passes reads through and turns
//!   every mutation into a no-op, which is how plan mode works
//!
//! All methods take `&self`; adapters that mutate state use interior
//! mutability so a target can be shared behind an `Arc`.

mod dry_run;
mod local;
mod memory;

pub use dry_run::DryRunTarget;
pub use local::{LocalTarget, DEFAULT_PRIVATE_MODE, DEFAULT_PUBLIC_MODE};
pub use memory::MemoryTarget;

use std::fmt;
use std::io::Read;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Result type for target operations
pub type TargetResult<T> = std::result::Result<T, TargetError>;

/// Storage-level failure reported by a target
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("{0}")]
    Backend(String),
}

impl TargetError {
    /// True for failures that concern a single entry rather than the backend
    ///
    /// Commit and revert skip the item on these instead of aborting.
    pub fn is_item_level(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::AlreadyExists(_))
    }
}

/// Coarse access level of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Private => write!(f, "private"),
        }
    }
}

/// What kind of permissions a target can express
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityModel {
    /// Only `public` and `private`
    Binary,
    /// `public`, `private` and numeric modes through the public-mode override
    Numeric,
}

/// A resolved permission for one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Visibility(Visibility),
    /// Unix-style mode bits, only valid on `Numeric` targets
    Mode(u32),
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Visibility(v) => write!(f, "{}", v),
            Self::Mode(mode) => write!(f, "{:04o}", mode),
        }
    }
}

/// A hierarchical store that deployments are applied to
pub trait Target: Send + Sync {
    /// Which permissions this target can express
    fn visibility_model(&self) -> VisibilityModel;

    /// Check whether an entry (file or directory) exists
    fn has(&self, path: &str) -> TargetResult<bool>;

    /// Whether an existing entry is a directory; `NotFound` if it is missing
    fn is_directory(&self, path: &str) -> TargetResult<bool>;

    /// Read a file as text
    fn read(&self, path: &str) -> TargetResult<String>;

    /// Create a file; fails with `AlreadyExists` if the path is taken
    fn write(&self, path: &str, contents: &str) -> TargetResult<()>;

    /// Overwrite an existing file; fails with `NotFound` if it is missing
    fn update(&self, path: &str, contents: &str) -> TargetResult<()>;

    /// Stream content into a file, creating or overwriting it
    fn write_stream(&self, path: &str, reader: &mut dyn Read) -> TargetResult<()>;

    /// Move an entry; fails with `AlreadyExists` if `to` is taken
    fn rename(&self, from: &str, to: &str) -> TargetResult<()>;

    /// Copy an entry (recursively for directories)
    fn copy(&self, from: &str, to: &str) -> TargetResult<()>;

    /// Delete a file
    fn delete(&self, path: &str) -> TargetResult<()>;

    /// Delete a directory and everything under it
    fn delete_dir(&self, path: &str) -> TargetResult<()>;

    /// Create a directory and any missing parents
    fn create_dir(&self, path: &str) -> TargetResult<()>;

    fn set_visibility(&self, path: &str, visibility: Visibility) -> TargetResult<()>;

    fn visibility(&self, path: &str) -> TargetResult<Visibility>;

    /// Mode that `Visibility::Public` currently maps to, if the target has one
    fn public_mode(&self) -> Option<u32>;

    /// Change the mode `Visibility::Public` maps to
    fn set_public_mode(&self, mode: u32) -> TargetResult<()>;

    /// Apply a resolved permission to an entry
    ///
    /// A numeric mode is applied by temporarily pointing the public mode at
    /// it and setting the entry public. The saved public mode is restored
    /// whether or not setting the visibility succeeded.
    fn apply_permission(&self, path: &str, permission: Permission) -> TargetResult<()> {
        match permission {
            Permission::Visibility(visibility) => self.set_visibility(path, visibility),
            Permission::Mode(mode) => {
                let Some(saved) = self.public_mode() else {
                    return Err(TargetError::Unsupported(format!(
                        "numeric mode {:04o} for {}",
                        mode, path
                    )));
                };

                debug!("Overriding public mode {:04o} -> {:04o} for {}", saved, mode, path);
                self.set_public_mode(mode)?;
                let applied = self.set_visibility(path, Visibility::Public);
                let restored = self.set_public_mode(saved);
                debug!("Restored public mode {:04o}", saved);

                applied.and(restored)
            }
        }
    }
}

macro_rules! forward_target {
    ($($ty:ty),+) => {$(
        impl<T: Target + ?Sized> Target for $ty {
            fn visibility_model(&self) -> VisibilityModel {
                (**self).visibility_model()
            }
            fn has(&self, path: &str) -> TargetResult<bool> {
                (**self).has(path)
            }
            fn is_directory(&self, path: &str) -> TargetResult<bool> {
                (**self).is_directory(path)
            }
            fn read(&self, path: &str) -> TargetResult<String> {
                (**self).read(path)
            }
            fn write(&self, path: &str, contents: &str) -> TargetResult<()> {
                (**self).write(path, contents)
            }
            fn update(&self, path: &str, contents: &str) -> TargetResult<()> {
                (**self).update(path, contents)
            }
            fn write_stream(&self, path: &str, reader: &mut dyn Read) -> TargetResult<()> {
                (**self).write_stream(path, reader)
            }
            fn rename(&self, from: &str, to: &str) -> TargetResult<()> {
                (**self).rename(from, to)
            }
            fn copy(&self, from: &str, to: &str) -> TargetResult<()> {
                (**self).copy(from, to)
            }
            fn delete(&self, path: &str) -> TargetResult<()> {
                (**self).delete(path)
            }
            fn delete_dir(&self, path: &str) -> TargetResult<()> {
                (**self).delete_dir(path)
            }
            fn create_dir(&self, path: &str) -> TargetResult<()> {
                (**self).create_dir(path)
            }
            fn set_visibility(&self, path: &str, visibility: Visibility) -> TargetResult<()> {
                (**self).set_visibility(path, visibility)
            }
            fn visibility(&self, path: &str) -> TargetResult<Visibility> {
                (**self).visibility(path)
            }
            fn public_mode(&self) -> Option<u32> {
                (**self).public_mode()
            }
            fn set_public_mode(&self, mode: u32) -> TargetResult<()> {
                (**self).set_public_mode(mode)
            }
            fn apply_permission(&self, path: &str, permission: Permission) -> TargetResult<()> {
                (**self).apply_permission(path, permission)
            }
        }
    )+};
}

forward_target!(&T, Box<T>, Arc<T>);

/// Normalize a path for a target, mapping rejection to a backend error
pub(crate) fn target_path(path: &str) -> TargetResult<String> {
    crate::path::normalize(path).map_err(|e| TargetError::Backend(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_level_errors() {
        assert!(TargetError::NotFound("a".into()).is_item_level());
        assert!(TargetError::AlreadyExists("a".into()).is_item_level());
        assert!(!TargetError::Backend("boom".into()).is_item_level());
        assert!(!TargetError::Unsupported("chmod".into()).is_item_level());
    }

    #[test]
    fn test_permission_display() {
        assert_eq!(Permission::Mode(0o644).to_string(), "0644");
        assert_eq!(
            Permission::Visibility(Visibility::Private).to_string(),
            "private"
        );
    }

    #[test]
    fn test_apply_mode_restores_public_mode() {
        let target = MemoryTarget::with_modes(0o755, 0o700).with_file("a.txt", "x");

        target
            .apply_permission("a.txt", Permission::Mode(0o640))
            .unwrap();

        assert_eq!(target.mode("a.txt"), Some(0o640));
        assert_eq!(target.public_mode(), Some(0o755));
    }

    #[test]
    fn test_apply_mode_restores_after_failure() {
        let target = MemoryTarget::with_modes(0o755, 0o700).with_file("a.txt", "x");
        target.fail_on("a.txt");

        let result = target.apply_permission("a.txt", Permission::Mode(0o600));

        assert!(result.is_err());
        assert_eq!(target.public_mode(), Some(0o755));
    }

    #[test]
    fn test_apply_mode_unsupported_on_binary_target() {
        let target = MemoryTarget::new().with_file("a.txt", "x");
        let err = target
            .apply_permission("a.txt", Permission::Mode(0o644))
            .unwrap_err();
        assert!(matches!(err, TargetError::Unsupported(_)));
    }

    #[test]
    fn test_forwarding_through_arc_and_box() {
        let shared = Arc::new(MemoryTarget::new());
        shared.write("a.txt", "hello").unwrap();

        let boxed: Box<dyn Target> = Box::new(Arc::clone(&shared));
        assert_eq!(boxed.read("a.txt").unwrap(), "hello");
        assert!((&*boxed).has("a.txt").unwrap());
    }
}
