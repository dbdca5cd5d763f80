use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::config::{HostSettings, Layout};
use crate::error::ExecutionError;
use crate::exec::Executor;
use crate::logging::Log;
use crate::operations::{FileSystemOps, SystemFileSystemOps};

/// Shared context for plan execution.
pub struct Context {
    /// Host-wide settings rendered into channel configurations.
    pub settings: HostSettings,
    /// Where rendered artifacts and home directories live.
    pub layout: Layout,
    /// Logger for output and action recording.
    pub log: Arc<dyn Log>,
    /// Command executor (for testing or real system calls).
    pub executor: Arc<dyn Executor>,
    /// Filesystem operation abstraction (injectable for testing).
    pub fs_ops: Arc<dyn FileSystemOps>,
    /// Log intended changes instead of applying them.
    pub dry_run: bool,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("settings", &self.settings)
            .field("layout", &self.layout)
            .field("log", &"<dyn Log>")
            .field("executor", &"<dyn Executor>")
            .field("fs_ops", &"<dyn FileSystemOps>")
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl Context {
    /// Creates a context that writes to the real filesystem.
    #[must_use]
    pub fn new(
        settings: HostSettings,
        layout: Layout,
        log: Arc<dyn Log>,
        executor: Arc<dyn Executor>,
        dry_run: bool,
    ) -> Self {
        Self {
            settings,
            layout,
            log,
            executor,
            fs_ops: Arc::new(SystemFileSystemOps),
            dry_run,
        }
    }

    /// Replace the [`FileSystemOps`] implementation.
    ///
    /// Used in tests to inject a `MockFileSystemOps` so configurators can be
    /// exercised without touching the real filesystem.
    #[must_use]
    pub fn with_fs_ops(mut self, fs_ops: Arc<dyn FileSystemOps>) -> Self {
        self.fs_ops = fs_ops;
        self
    }

    /// Write a rendered artifact, or describe it in dry-run mode.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::Io`] if the file cannot be written.
    pub fn write_file(&self, path: &Path, contents: &str) -> Result<()> {
        if self.dry_run {
            self.log.dry_run(&format!(
                "would write {} ({} bytes)",
                path.display(),
                contents.len()
            ));
            self.log.debug(contents);
            return Ok(());
        }
        self.fs_ops
            .write(path, contents)
            .map_err(|source| io_error(path, source))?;
        self.log.debug(&format!("wrote {}", path.display()));
        Ok(())
    }

    /// Create a directory and its parents.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::Io`] if the directory cannot be created.
    pub fn ensure_dir(&self, path: &Path) -> Result<()> {
        if self.dry_run {
            self.log
                .dry_run(&format!("would create directory {}", path.display()));
            return Ok(());
        }
        self.fs_ops
            .create_dir_all(path)
            .map_err(|source| io_error(path, source))?;
        Ok(())
    }

    /// Create an empty file unless it already exists.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::Io`] if the file cannot be created.
    pub fn touch(&self, path: &Path) -> Result<()> {
        if self.dry_run {
            self.log.dry_run(&format!("would create {}", path.display()));
            return Ok(());
        }
        self.fs_ops
            .touch(path)
            .map_err(|source| io_error(path, source))?;
        Ok(())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ExecutionError {
    ExecutionError::Io {
        path: path.display().to_string(),
        source,
    }
}
