//! External process capability: one-shot commands and long-lived daemons.
//!
//! Every OS side effect of the engine (account creation, credential
//! registration, key generation, daemon launch) goes through the
//! [`Executor`] trait so tests can inject a recording fake instead of
//! touching the host.

use std::io::{Read, Write as _};
use std::process::{Child, Command, Output, Stdio};

use anyhow::{Context as _, Result};

use crate::error::ExecutionError;

/// Result of a command execution.
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Whether the command exited with status 0.
    pub success: bool,
    /// Exit code, or `None` when terminated by a signal.
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

impl ExecResult {
    /// Convert a non-zero exit into [`ExecutionError::CommandFailed`].
    ///
    /// # Errors
    ///
    /// Returns an error when `success` is `false`.
    pub fn checked(self, program: &str) -> Result<Self> {
        if self.success {
            return Ok(self);
        }
        Err(ExecutionError::CommandFailed {
            program: program.to_string(),
            code: self.code,
            stderr: self.stderr.trim().to_string(),
        }
        .into())
    }
}

/// Exit status of a spawned process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitInfo {
    /// Whether the process exited with status 0.
    pub success: bool,
    /// Exit code, or `None` when terminated by a signal.
    pub code: Option<i32>,
}

/// Handle to a spawned process whose output is consumed as a stream.
pub trait ProcessHandle: Send + std::fmt::Debug {
    /// Program name the process was started from.
    fn program(&self) -> &str;

    /// Take ownership of the standard output stream (once).
    fn take_stdout(&mut self) -> Option<Box<dyn Read + Send>>;

    /// Take ownership of the standard error stream (once).
    fn take_stderr(&mut self) -> Option<Box<dyn Read + Send>>;

    /// Block until the process exits.
    ///
    /// # Errors
    ///
    /// Returns an error if the exit status cannot be collected.
    fn wait(&mut self) -> Result<ExitInfo>;
}

/// Abstraction over process execution, injectable for tests.
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Run a command to completion. Fails if the command exits non-zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be started or exits non-zero.
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Run a command with `input` piped to its standard input.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be started or exits non-zero.
    fn run_with_input(&self, program: &str, args: &[&str], input: &str) -> Result<ExecResult>;

    /// Run a command, allowing failure (returns result without bailing).
    ///
    /// # Errors
    ///
    /// Returns an error only if the command cannot be started.
    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Check if a program is available on `PATH`.
    fn which(&self, program: &str) -> bool;

    /// Start a process with piped stdout/stderr and return immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be started.
    fn spawn(&self, program: &str, args: &[&str]) -> Result<Box<dyn ProcessHandle>>;
}

/// Production [`Executor`] backed by [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

fn spawn_error(program: &str, source: std::io::Error) -> anyhow::Error {
    ExecutionError::Spawn {
        program: program.to_string(),
        source,
    }
    .into()
}

impl Executor for SystemExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        self.run_unchecked(program, args)?.checked(program)
    }

    fn run_with_input(&self, program: &str, args: &[&str], input: &str) -> Result<ExecResult> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(program, e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .with_context(|| format!("writing stdin of {program}"))?;
        }

        let output = child
            .wait_with_output()
            .with_context(|| format!("waiting for {program}"))?;
        ExecResult::from(output).checked(program)
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| spawn_error(program, e))?;
        Ok(ExecResult::from(output))
    }

    fn which(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }

    fn spawn(&self, program: &str, args: &[&str]) -> Result<Box<dyn ProcessHandle>> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(program, e))?;
        Ok(Box::new(SystemProcess {
            program: program.to_string(),
            child,
        }))
    }
}

/// A child process started by [`SystemExecutor::spawn`].
#[derive(Debug)]
pub struct SystemProcess {
    program: String,
    child: Child,
}

impl ProcessHandle for SystemProcess {
    fn program(&self) -> &str {
        &self.program
    }

    fn take_stdout(&mut self) -> Option<Box<dyn Read + Send>> {
        self.child
            .stdout
            .take()
            .map(|s| Box::new(s) as Box<dyn Read + Send>)
    }

    fn take_stderr(&mut self) -> Option<Box<dyn Read + Send>> {
        self.child
            .stderr
            .take()
            .map(|s| Box::new(s) as Box<dyn Read + Send>)
    }

    fn wait(&mut self) -> Result<ExitInfo> {
        let status = self
            .child
            .wait()
            .with_context(|| format!("waiting for {}", self.program))?;
        Ok(ExitInfo {
            success: status.success(),
            code: status.code(),
        })
    }
}
