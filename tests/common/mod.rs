// Shared helpers for integration tests.
//
// Provides configuration fixtures and a fake executor that records every
// command, emulates the key-generation tools by creating the files they would
// write, and gives spawned daemons a scripted stdout.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};

use sharehost::config::{Config, HostSettings, Layout};
use sharehost::engine::Context;
use sharehost::exec::{ExecResult, Executor, ExitInfo, ProcessHandle};
use sharehost::logging::{Log, MemoryLog};

/// Scenario A: one group, one user with a password, one rw SMB share.
pub const FAMILY_DOCS: &str = r#"{
    "groups": [{"name": "family", "id": 5000}],
    "users": [{"name": "alice", "id": 5001, "groups": ["family"], "password": "s3cret"}],
    "shares": [{
        "name": "docs",
        "path": "/data/docs",
        "channels": ["smb"],
        "permissions": [{"mode": "rw", "users": ["alice"]}]
    }]
}"#;

/// Every channel at once, mixing named, group and guest entries.
pub const ALL_CHANNELS: &str = r#"{
    "groups": [{"name": "family", "id": 5000}, {"name": "media", "id": 5100}],
    "users": [
        {"name": "alice", "id": 5001, "groups": ["family", "media"], "password": "s3cret"},
        {"name": "bob", "id": 5002, "groups": ["family"]}
    ],
    "workgroup": "HOME",
    "visible": true,
    "shares": [
        {
            "name": "docs",
            "path": "/data/docs",
            "channels": ["smb", "ftp", "sftp"],
            "permissions": [
                {"mode": "rw", "users": ["alice"]},
                {"mode": "ro", "groups": ["family"]}
            ],
            "recycle": true
        },
        {
            "name": "public",
            "path": "/data/public",
            "channels": ["nfs", "webdav", "smb", "ftp"],
            "visible": true,
            "permissions": [{"mode": "ro", "guest": true}]
        }
    ]
}"#;

#[must_use]
pub fn config(json: &str) -> Config {
    serde_json::from_str(json).expect("fixture config parses")
}

/// One recorded executor call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub program: String,
    pub args: Vec<String>,
    pub input: Option<String>,
}

impl Call {
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Executor double for whole-plan runs.
///
/// `ssh-keygen -f <path>` and `openssl ... -keyout <key> -out <cert>` create
/// their output files so key bootstrapping completes against a real root.
#[derive(Debug, Default)]
pub struct FakeExecutor {
    calls: Mutex<Vec<Call>>,
    failing: HashSet<String>,
    outputs: HashMap<String, String>,
}

impl FakeExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call of `program` exit with status 1.
    #[must_use]
    pub fn failing(mut self, program: &str) -> Self {
        self.failing.insert(program.to_string());
        self
    }

    /// Script the stdout of spawned `program` processes.
    #[must_use]
    pub fn with_output(mut self, program: &str, stdout: &str) -> Self {
        self.outputs.insert(program.to_string(), stdout.to_string());
        self
    }

    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls poisoned").clone()
    }

    #[must_use]
    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(Call::command_line).collect()
    }

    /// Programs called, in order.
    #[must_use]
    pub fn programs(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.program).collect()
    }

    fn record(&self, program: &str, args: &[&str], input: Option<&str>) {
        self.calls.lock().expect("calls poisoned").push(Call {
            program: program.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
            input: input.map(String::from),
        });
    }

    fn outcome(&self, program: &str, args: &[&str]) -> ExecResult {
        let success = !self.failing.contains(program);
        if success {
            for flag in ["-f", "-keyout", "-out"] {
                let target = args
                    .iter()
                    .position(|a| *a == flag)
                    .and_then(|i| args.get(i + 1));
                if let Some(target) = target
                    && matches!(program, "ssh-keygen" | "openssl")
                {
                    std::fs::write(target, "generated").expect("write generated key");
                }
            }
        }
        ExecResult {
            stdout: String::new(),
            stderr: if success { String::new() } else { "boom".to_string() },
            success,
            code: Some(i32::from(!success)),
        }
    }
}

impl Executor for FakeExecutor {
    fn run(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        self.record(program, args, None);
        self.outcome(program, args).checked(program)
    }

    fn run_with_input(&self, program: &str, args: &[&str], input: &str) -> anyhow::Result<ExecResult> {
        self.record(program, args, Some(input));
        self.outcome(program, args).checked(program)
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        self.record(program, args, None);
        Ok(self.outcome(program, args))
    }

    fn which(&self, _: &str) -> bool {
        true
    }

    fn spawn(&self, program: &str, args: &[&str]) -> anyhow::Result<Box<dyn ProcessHandle>> {
        self.record(program, args, None);
        let success = !self.failing.contains(program);
        Ok(Box::new(FakeProcess {
            program: program.to_string(),
            stdout: Some(self.outputs.get(program).cloned().unwrap_or_default()),
            success,
        }))
    }
}

/// A process that has already finished, with a fixed stdout.
#[derive(Debug)]
pub struct FakeProcess {
    program: String,
    stdout: Option<String>,
    success: bool,
}

impl ProcessHandle for FakeProcess {
    fn program(&self) -> &str {
        &self.program
    }

    fn take_stdout(&mut self) -> Option<Box<dyn Read + Send>> {
        self.stdout
            .take()
            .map(|s| Box::new(Cursor::new(s.into_bytes())) as Box<dyn Read + Send>)
    }

    fn take_stderr(&mut self) -> Option<Box<dyn Read + Send>> {
        None
    }

    fn wait(&mut self) -> anyhow::Result<ExitInfo> {
        Ok(ExitInfo {
            success: self.success,
            code: Some(i32::from(!self.success)),
        })
    }
}

/// A host rooted in a temporary directory.
#[derive(Debug)]
pub struct TestHost {
    pub root: tempfile::TempDir,
    pub exec: Arc<FakeExecutor>,
    pub log: Arc<MemoryLog>,
}

impl TestHost {
    #[must_use]
    pub fn new(exec: FakeExecutor) -> Self {
        Self {
            root: tempfile::tempdir().expect("create temp dir"),
            exec: Arc::new(exec),
            log: Arc::new(MemoryLog::new()),
        }
    }

    #[must_use]
    pub fn layout(&self) -> Layout {
        Layout::new(self.root.path())
    }

    /// Execution context for `config` over the real filesystem under the root.
    #[must_use]
    pub fn context(&self, config: &Config, dry_run: bool) -> Context {
        Context::new(
            HostSettings::from_config(config, "nas"),
            self.layout(),
            Arc::clone(&self.log) as Arc<dyn Log>,
            Arc::clone(&self.exec) as Arc<dyn Executor>,
            dry_run,
        )
    }

    /// Read a rendered artifact relative to the root.
    #[must_use]
    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.root.path().join(relative))
            .unwrap_or_else(|e| panic!("reading {relative}: {e}"))
    }

    #[must_use]
    pub fn exists(&self, relative: &str) -> bool {
        self.root.path().join(relative).exists()
    }
}
