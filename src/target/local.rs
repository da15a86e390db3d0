// src/target/local.rs

//! Local-disk target
//!
//! Deploys into a directory on the local filesystem. Paths are sanitized
//! against the root before use, so a change list can never reach outside
//! it. Missing parent directories are created on write and rename.
//!
//! On Unix the target supports numeric modes: `Visibility::Public` maps to
//! the current public mode (default `0755`) and `Visibility::Private` to
//! the private mode (default `0700`).

use super::{Target, TargetError, TargetResult, Visibility, VisibilityModel};
use crate::path::safe_join;
use std::fs::{self, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::debug;
use walkdir::WalkDir;

/// Default mode for public entries
pub const DEFAULT_PUBLIC_MODE: u32 = 0o755;

/// Default mode for private entries
pub const DEFAULT_PRIVATE_MODE: u32 = 0o700;

/// Target rooted at a local directory
#[derive(Debug)]
pub struct LocalTarget {
    root: PathBuf,
    public_mode: AtomicU32,
    private_mode: u32,
}

impl LocalTarget {
    /// Create a target rooted at `root`
    ///
    /// The directory is not touched here. A missing root reads as empty and
    /// is created by the first mutation, so plan runs never create it.
    pub fn new<P: AsRef<Path>>(root: P) -> crate::Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.exists() {
            debug!("Target root {:?} does not exist yet", root);
        }

        Ok(Self {
            root,
            public_mode: AtomicU32::new(DEFAULT_PUBLIC_MODE),
            private_mode: DEFAULT_PRIVATE_MODE,
        })
    }

    /// Override the public and private modes
    pub fn with_modes(self, public_mode: u32, private_mode: u32) -> Self {
        self.public_mode.store(public_mode, Ordering::SeqCst);
        Self {
            private_mode,
            ..self
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> TargetResult<PathBuf> {
        safe_join(&self.root, path).map_err(|e| TargetError::Backend(e.to_string()))
    }

    /// Existence check that distinguishes "missing" from real I/O errors
    fn exists(&self, path: &str, full: &Path) -> TargetResult<bool> {
        match fs::symlink_metadata(full) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(path, e)),
        }
    }

    fn metadata(&self, path: &str, full: &Path) -> TargetResult<fs::Metadata> {
        fs::symlink_metadata(full).map_err(|e| io_error(path, e))
    }

    fn create_parent(&self, path: &str, full: &Path) -> TargetResult<()> {
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(path, e))?;
        }
        Ok(())
    }

    /// Recursively copy a directory tree
    fn copy_tree(&self, path: &str, from: &Path, to: &Path) -> TargetResult<()> {
        for entry in WalkDir::new(from) {
            let entry = entry.map_err(|e| TargetError::Backend(format!("{}: {}", path, e)))?;
            let relative = entry
                .path()
                .strip_prefix(from)
                .map_err(|e| TargetError::Backend(format!("{}: {}", path, e)))?;
            let dest = to.join(relative);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&dest).map_err(|e| io_error(path, e))?;
            } else {
                fs::copy(entry.path(), &dest).map_err(|e| io_error(path, e))?;
            }
        }
        Ok(())
    }
}

/// Map an I/O error to the target error taxonomy
fn io_error(path: &str, err: io::Error) -> TargetError {
    match err.kind() {
        io::ErrorKind::NotFound => TargetError::NotFound(path.to_string()),
        io::ErrorKind::AlreadyExists => TargetError::AlreadyExists(path.to_string()),
        _ => TargetError::Backend(format!("{}: {}", path, err)),
    }
}

impl Target for LocalTarget {
    fn visibility_model(&self) -> VisibilityModel {
        if cfg!(unix) {
            VisibilityModel::Numeric
        } else {
            VisibilityModel::Binary
        }
    }

    fn has(&self, path: &str) -> TargetResult<bool> {
        let full = self.resolve(path)?;
        self.exists(path, &full)
    }

    fn is_directory(&self, path: &str) -> TargetResult<bool> {
        let full = self.resolve(path)?;
        Ok(self.metadata(path, &full)?.is_dir())
    }

    fn read(&self, path: &str) -> TargetResult<String> {
        let full = self.resolve(path)?;
        fs::read_to_string(&full).map_err(|e| io_error(path, e))
    }

    fn write(&self, path: &str, contents: &str) -> TargetResult<()> {
        let full = self.resolve(path)?;
        self.create_parent(path, &full)?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full)
            .map_err(|e| io_error(path, e))?;
        io::Write::write_all(&mut file, contents.as_bytes()).map_err(|e| io_error(path, e))
    }

    fn update(&self, path: &str, contents: &str) -> TargetResult<()> {
        let full = self.resolve(path)?;
        if !self.exists(path, &full)? {
            return Err(TargetError::NotFound(path.to_string()));
        }
        fs::write(&full, contents).map_err(|e| io_error(path, e))
    }

    fn write_stream(&self, path: &str, reader: &mut dyn Read) -> TargetResult<()> {
        let full = self.resolve(path)?;
        self.create_parent(path, &full)?;

        let mut file = fs::File::create(&full).map_err(|e| io_error(path, e))?;
        io::copy(reader, &mut file).map_err(|e| io_error(path, e))?;
        Ok(())
    }

    fn rename(&self, from: &str, to: &str) -> TargetResult<()> {
        let from_full = self.resolve(from)?;
        let to_full = self.resolve(to)?;

        if !self.exists(from, &from_full)? {
            return Err(TargetError::NotFound(from.to_string()));
        }
        // fs::rename silently replaces files, so check first
        if self.exists(to, &to_full)? {
            return Err(TargetError::AlreadyExists(to.to_string()));
        }

        self.create_parent(to, &to_full)?;
        fs::rename(&from_full, &to_full).map_err(|e| io_error(from, e))
    }

    fn copy(&self, from: &str, to: &str) -> TargetResult<()> {
        let from_full = self.resolve(from)?;
        let to_full = self.resolve(to)?;

        let meta = self.metadata(from, &from_full)?;
        if self.exists(to, &to_full)? {
            return Err(TargetError::AlreadyExists(to.to_string()));
        }
        self.create_parent(to, &to_full)?;

        if meta.is_dir() {
            self.copy_tree(from, &from_full, &to_full)
        } else {
            fs::copy(&from_full, &to_full)
                .map(|_| ())
                .map_err(|e| io_error(from, e))
        }
    }

    fn delete(&self, path: &str) -> TargetResult<()> {
        let full = self.resolve(path)?;
        if self.metadata(path, &full)?.is_dir() {
            return Err(TargetError::Backend(format!("{} is a directory", path)));
        }
        fs::remove_file(&full).map_err(|e| io_error(path, e))
    }

    fn delete_dir(&self, path: &str) -> TargetResult<()> {
        let full = self.resolve(path)?;
        if !self.metadata(path, &full)?.is_dir() {
            return Err(TargetError::Backend(format!("{} is not a directory", path)));
        }
        fs::remove_dir_all(&full).map_err(|e| io_error(path, e))
    }

    fn create_dir(&self, path: &str) -> TargetResult<()> {
        let full = self.resolve(path)?;
        if self.exists(path, &full)? {
            return Err(TargetError::AlreadyExists(path.to_string()));
        }
        fs::create_dir_all(&full).map_err(|e| io_error(path, e))
    }

    #[cfg(unix)]
    fn set_visibility(&self, path: &str, visibility: Visibility) -> TargetResult<()> {
        use std::os::unix::fs::PermissionsExt;

        let full = self.resolve(path)?;
        let mode = match visibility {
            Visibility::Public => self.public_mode.load(Ordering::SeqCst),
            Visibility::Private => self.private_mode,
        };
        debug!("chmod {:04o} {}", mode, path);
        fs::set_permissions(&full, fs::Permissions::from_mode(mode))
            .map_err(|e| io_error(path, e))
    }

    #[cfg(not(unix))]
    fn set_visibility(&self, path: &str, visibility: Visibility) -> TargetResult<()> {
        let full = self.resolve(path)?;
        let mut perms = self.metadata(path, &full)?.permissions();
        perms.set_readonly(visibility == Visibility::Private);
        fs::set_permissions(&full, perms).map_err(|e| io_error(path, e))
    }

    #[cfg(unix)]
    fn visibility(&self, path: &str) -> TargetResult<Visibility> {
        use std::os::unix::fs::PermissionsExt;

        let full = self.resolve(path)?;
        let mode = self.metadata(path, &full)?.permissions().mode() & 0o7777;
        if mode == self.private_mode {
            Ok(Visibility::Private)
        } else {
            Ok(Visibility::Public)
        }
    }

    #[cfg(not(unix))]
    fn visibility(&self, path: &str) -> TargetResult<Visibility> {
        let full = self.resolve(path)?;
        if self.metadata(path, &full)?.permissions().readonly() {
            Ok(Visibility::Private)
        } else {
            Ok(Visibility::Public)
        }
    }

    fn public_mode(&self) -> Option<u32> {
        match self.visibility_model() {
            VisibilityModel::Numeric => Some(self.public_mode.load(Ordering::SeqCst)),
            VisibilityModel::Binary => None,
        }
    }

    fn set_public_mode(&self, mode: u32) -> TargetResult<()> {
        match self.visibility_model() {
            VisibilityModel::Numeric => {
                self.public_mode.store(mode, Ordering::SeqCst);
                Ok(())
            }
            VisibilityModel::Binary => Err(TargetError::Unsupported(
                "public mode override".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn target() -> (TempDir, LocalTarget) {
        let dir = TempDir::new().unwrap();
        let target = LocalTarget::new(dir.path()).unwrap();
        (dir, target)
    }

    #[test]
    fn test_write_and_read() {
        let (dir, target) = target();

        target.write("a/b.txt", "hello").unwrap();

        assert_eq!(target.read("a/b.txt").unwrap(), "hello");
        assert!(dir.path().join("a/b.txt").is_file());
        assert!(matches!(
            target.write("a/b.txt", "again"),
            Err(TargetError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let (_dir, target) = target();
        assert!(matches!(
            target.read(".stagehand.rev"),
            Err(TargetError::NotFound(_))
        ));
    }

    #[test]
    fn test_rename_refuses_to_overwrite() {
        let (_dir, target) = target();
        target.write("push/a.txt", "new").unwrap();
        target.write("a.txt", "old").unwrap();

        assert!(matches!(
            target.rename("push/a.txt", "a.txt"),
            Err(TargetError::AlreadyExists(_))
        ));
        assert_eq!(target.read("a.txt").unwrap(), "old");
    }

    #[test]
    fn test_rename_creates_parents() {
        let (_dir, target) = target();
        target.write("a.txt", "a").unwrap();

        target.rename("a.txt", "tmp/revert/a.txt").unwrap();

        assert!(!target.has("a.txt").unwrap());
        assert_eq!(target.read("tmp/revert/a.txt").unwrap(), "a");
    }

    #[test]
    fn test_copy_directory_recursively() {
        let (_dir, target) = target();
        target.write("site/css/app.css", "body {}").unwrap();
        target.write("site/index.html", "<html>").unwrap();

        target.copy("site", "backup/site").unwrap();

        assert_eq!(target.read("backup/site/css/app.css").unwrap(), "body {}");
        assert_eq!(target.read("backup/site/index.html").unwrap(), "<html>");
        assert!(target.has("site/index.html").unwrap());
    }

    #[test]
    fn test_delete_kinds() {
        let (_dir, target) = target();
        target.write("d/f.txt", "f").unwrap();

        assert!(target.is_directory("d").unwrap());
        assert!(!target.is_directory("d/f.txt").unwrap());
        assert!(matches!(
            target.is_directory("nope"),
            Err(TargetError::NotFound(_))
        ));
        assert!(target.delete("d").is_err());
        assert!(target.delete_dir("d/f.txt").is_err());
        target.delete_dir("d").unwrap();
        assert!(!target.has("d").unwrap());
    }

    #[test]
    fn test_missing_root_created_on_first_write() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("site");
        let target = LocalTarget::new(&root).unwrap();

        assert!(!root.exists());
        assert!(!target.has("index.html").unwrap());
        assert!(!root.exists());

        target.create_dir(".stagehand.tmp").unwrap();
        assert!(root.join(".stagehand.tmp").is_dir());
    }

    #[test]
    fn test_path_traversal_rejected() {
        let (_dir, target) = target();
        assert!(target.write("../escape.txt", "x").is_err());
        assert!(target.has("a/../../etc/passwd").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_numeric_modes() {
        use crate::target::Permission;
        use std::os::unix::fs::PermissionsExt;

        let (dir, target) = target();
        target.write("logs/app.log", "").unwrap();

        target
            .apply_permission("logs/app.log", Permission::Mode(0o600))
            .unwrap();

        let mode = fs::metadata(dir.path().join("logs/app.log"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(target.public_mode(), Some(DEFAULT_PUBLIC_MODE));

        target.set_visibility("logs/app.log", Visibility::Private).unwrap();
        assert_eq!(target.visibility("logs/app.log").unwrap(), Visibility::Private);
    }
}
