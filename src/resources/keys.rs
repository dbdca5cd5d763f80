//! Key material bootstrapped once per host: SSH host keys and the FTPS certificate.
use std::path::{Path, PathBuf};

use anyhow::Result;

use super::{Applicable, Resource, ResourceChange, ResourceError, ResourceState};
use crate::error::ExecutionError;
use crate::exec::Executor;
use crate::operations::FileSystemOps;

/// Mode applied to private key files.
pub const PRIVATE_KEY_MODE: u32 = 0o600;

fn io_error(path: &Path, source: std::io::Error) -> ExecutionError {
    ExecutionError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn create_parent(fs_ops: &dyn FileSystemOps, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs_ops
            .create_dir_all(parent)
            .map_err(|e| io_error(parent, e))?;
    }
    Ok(())
}

fn file_state(fs_ops: &dyn FileSystemOps, paths: &[&Path]) -> ResourceState {
    if let Some(dir) = paths.iter().find(|p| fs_ops.is_dir(p)) {
        return ResourceState::Invalid {
            reason: format!("{} is a directory", dir.display()),
        };
    }
    if paths.iter().all(|p| fs_ops.exists(p)) {
        ResourceState::Correct
    } else {
        ResourceState::Missing
    }
}

fn tighten(fs_ops: &dyn FileSystemOps, description: &str, path: &Path) -> Result<()> {
    if !fs_ops.exists(path) {
        return Err(ResourceError::NotGenerated {
            resource: description.to_string(),
            path: path.display().to_string(),
        }
        .into());
    }
    fs_ops
        .set_mode(path, PRIVATE_KEY_MODE)
        .map_err(|e| io_error(path, e))?;
    Ok(())
}

/// An SSH host key pair generated with `ssh-keygen`.
#[derive(Debug)]
pub struct SshHostKey<'a> {
    algorithm: &'static str,
    bits: Option<u32>,
    path: PathBuf,
    executor: &'a dyn Executor,
    fs_ops: &'a dyn FileSystemOps,
}

impl<'a> SshHostKey<'a> {
    /// An SSH host key of type `algorithm` stored at `path`.
    #[must_use]
    pub const fn new(
        algorithm: &'static str,
        bits: Option<u32>,
        path: PathBuf,
        executor: &'a dyn Executor,
        fs_ops: &'a dyn FileSystemOps,
    ) -> Self {
        Self {
            algorithm,
            bits,
            path,
            executor,
            fs_ops,
        }
    }
}

impl Applicable for SshHostKey<'_> {
    fn description(&self) -> String {
        format!("ssh {} host key", self.algorithm)
    }

    fn apply(&self) -> Result<ResourceChange> {
        create_parent(self.fs_ops, &self.path)?;
        let path = self.path.to_string_lossy();
        let bits = self.bits.map(|b| b.to_string());
        let mut args = vec!["-q", "-t", self.algorithm];
        if let Some(bits) = &bits {
            args.extend(["-b", bits.as_str()]);
        }
        args.extend(["-f", &*path, "-N", ""]);
        self.executor.run("ssh-keygen", &args)?;
        tighten(self.fs_ops, &self.description(), &self.path)?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for SshHostKey<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        Ok(file_state(self.fs_ops, &[&self.path]))
    }
}

/// A self-signed TLS certificate and its private key, generated with `openssl`.
#[derive(Debug)]
pub struct TlsCertificate<'a> {
    certificate: PathBuf,
    private_key: PathBuf,
    common_name: &'a str,
    executor: &'a dyn Executor,
    fs_ops: &'a dyn FileSystemOps,
}

impl<'a> TlsCertificate<'a> {
    /// A self-signed certificate for `common_name`.
    #[must_use]
    pub const fn new(
        certificate: PathBuf,
        private_key: PathBuf,
        common_name: &'a str,
        executor: &'a dyn Executor,
        fs_ops: &'a dyn FileSystemOps,
    ) -> Self {
        Self {
            certificate,
            private_key,
            common_name,
            executor,
            fs_ops,
        }
    }
}

impl Applicable for TlsCertificate<'_> {
    fn description(&self) -> String {
        format!("self-signed certificate for {}", self.common_name)
    }

    fn apply(&self) -> Result<ResourceChange> {
        create_parent(self.fs_ops, &self.certificate)?;
        create_parent(self.fs_ops, &self.private_key)?;
        let subject = format!("/CN={}", self.common_name);
        let key = self.private_key.to_string_lossy();
        let cert = self.certificate.to_string_lossy();
        self.executor.run(
            "openssl",
            &[
                "req", "-x509", "-nodes", "-newkey", "rsa:2048", "-days", "3650", "-subj",
                &subject, "-keyout", &key, "-out", &cert,
            ],
        )?;
        tighten(self.fs_ops, &self.description(), &self.private_key)?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for TlsCertificate<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        Ok(file_state(
            self.fs_ops,
            &[&self.certificate, &self.private_key],
        ))
    }
}
