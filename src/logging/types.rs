//! Core logging types: action entries, status, and the [`Log`] trait.
use crate::channels::{AuthEvent, Channel};

/// Plan action result for summary reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionEntry {
    /// Human-readable action description.
    pub name: String,
    /// Final status of the action.
    pub status: ActionStatus,
    /// Optional detail message (e.g., error description).
    pub message: Option<String>,
}

/// Status of a completed plan action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
    /// Action completed successfully.
    Ok,
    /// Action ran in dry-run mode; no changes were applied.
    DryRun,
    /// Action failed; the rest of the plan was abandoned.
    Failed,
}

/// Which output stream of a daemon a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

impl OutputStream {
    /// Lowercase stream name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

/// Abstraction over logging backends.
///
/// [`Logger`](super::logger::Logger) forwards to `tracing`;
/// [`MemoryLog`](super::memory::MemoryLog) keeps entries in memory so that
/// handler code can be exercised without a subscriber.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a dry-run action message.
    fn dry_run(&self, msg: &str);
    /// Record a plan action result for the summary.
    fn record_action(&self, name: &str, status: ActionStatus, message: Option<&str>);
    /// Forward one line of supervised daemon output.
    fn daemon_output(&self, channel: Channel, daemon: &str, stream: OutputStream, line: &str);
    /// Report an authentication attempt recognised in daemon output.
    fn auth_event(&self, event: &AuthEvent);
}
