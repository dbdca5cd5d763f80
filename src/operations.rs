//! Filesystem operation abstractions for dependency injection.
//!
//! Provides the [`FileSystemOps`] trait so that configurators and identity
//! handlers can be unit-tested without touching the real filesystem.
//! Production code uses [`SystemFileSystemOps`]; tests use
//! `MockFileSystemOps`.

use std::io;
use std::path::Path;

/// Abstraction over the filesystem writes performed while provisioning.
pub trait FileSystemOps: Send + Sync + std::fmt::Debug {
    /// Returns `true` if `path` exists on the filesystem.
    fn exists(&self, path: &Path) -> bool;

    /// Returns `true` if `path` is an existing directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Create `path` and all missing parents.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Replace the contents of `path`, creating parent directories first.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    fn write(&self, path: &Path, contents: &str) -> io::Result<()>;

    /// Read `path` into a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Create `path` as an empty file if it does not exist yet.
    ///
    /// Existing contents are left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    fn touch(&self, path: &Path) -> io::Result<()>;

    /// Set the Unix permission bits of `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the permissions cannot be changed.
    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()>;
}

/// Production [`FileSystemOps`] implementation that delegates to [`std::fs`].
#[derive(Debug, Default)]
pub struct SystemFileSystemOps;

impl FileSystemOps for SystemFileSystemOps {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn touch(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map(drop)
    }

    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt as _;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
    }
}

/// In-memory [`FileSystemOps`] for unit tests.
///
/// Records every file written, directory created, and mode change so tests
/// can assert on rendered artifacts without a temporary directory.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockFileSystemOps {
    files: std::sync::Mutex<std::collections::BTreeMap<std::path::PathBuf, String>>,
    dirs: std::sync::Mutex<Vec<std::path::PathBuf>>,
    modes: std::sync::Mutex<Vec<(std::path::PathBuf, u32)>>,
}

#[cfg(test)]
#[allow(clippy::expect_used)]
impl MockFileSystemOps {
    /// Create an empty mock with nothing on disk.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate `path` with `contents`.
    #[must_use]
    pub fn with_file(self, path: impl Into<std::path::PathBuf>, contents: &str) -> Self {
        self.files
            .lock()
            .expect("mock files poisoned")
            .insert(path.into(), contents.to_string());
        self
    }

    /// Contents last written to `path`, if any.
    #[must_use]
    pub fn file(&self, path: &Path) -> Option<String> {
        self.files
            .lock()
            .expect("mock files poisoned")
            .get(path)
            .cloned()
    }

    /// Directories created so far, in creation order.
    #[must_use]
    pub fn created_dirs(&self) -> Vec<std::path::PathBuf> {
        self.dirs.lock().expect("mock dirs poisoned").clone()
    }

    /// Mode changes applied so far, in order.
    #[must_use]
    pub fn mode_changes(&self) -> Vec<(std::path::PathBuf, u32)> {
        self.modes.lock().expect("mock modes poisoned").clone()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
impl FileSystemOps for MockFileSystemOps {
    fn exists(&self, path: &Path) -> bool {
        self.files
            .lock()
            .expect("mock files poisoned")
            .contains_key(path)
            || self
                .dirs
                .lock()
                .expect("mock dirs poisoned")
                .iter()
                .any(|d| d == path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.dirs
            .lock()
            .expect("mock dirs poisoned")
            .iter()
            .any(|d| d == path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.dirs
            .lock()
            .expect("mock dirs poisoned")
            .push(path.to_path_buf());
        Ok(())
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        self.files
            .lock()
            .expect("mock files poisoned")
            .insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.file(path)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    fn touch(&self, path: &Path) -> io::Result<()> {
        self.files
            .lock()
            .expect("mock files poisoned")
            .entry(path.to_path_buf())
            .or_default();
        Ok(())
    }

    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()> {
        self.modes
            .lock()
            .expect("mock modes poisoned")
            .push((path.to_path_buf(), mode));
        Ok(())
    }
}
