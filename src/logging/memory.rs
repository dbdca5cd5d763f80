//! In-memory [`Log`] backend.
use std::sync::{Mutex, PoisonError};

use super::types::{ActionEntry, ActionStatus, Log, OutputStream};
use crate::channels::{AuthEvent, Channel};

/// A single captured log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    /// A stage header.
    Stage(String),
    /// An informational message.
    Info(String),
    /// A debug message.
    Debug(String),
    /// A warning.
    Warn(String),
    /// An error.
    Error(String),
    /// An action skipped by a dry run.
    DryRun(String),
    /// A line of forwarded daemon output.
    Daemon {
        /// Channel the daemon serves.
        channel: Channel,
        /// Daemon label.
        daemon: String,
        /// Stream the line was read from.
        stream: OutputStream,
        /// The line, without its terminator.
        line: String,
    },
    /// A recognised authentication attempt.
    Auth(AuthEvent),
}

impl LogEntry {
    /// Text of the entry, for substring assertions.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Stage(m)
            | Self::Info(m)
            | Self::Debug(m)
            | Self::Warn(m)
            | Self::Error(m)
            | Self::DryRun(m) => m.clone(),
            Self::Daemon { line, .. } => line.clone(),
            Self::Auth(event) => event.to_string(),
        }
    }
}

/// Captures every entry in memory, in arrival order.
///
/// Daemon output arrives from forwarding threads, so every accessor returns a
/// snapshot copy.
#[derive(Debug, Default)]
pub struct MemoryLog {
    entries: Mutex<Vec<LogEntry>>,
    actions: Mutex<Vec<ActionEntry>>,
}

impl MemoryLog {
    /// An empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, entry: LogEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    /// Every record, in order.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Every recorded action outcome, in order.
    #[must_use]
    pub fn actions(&self) -> Vec<ActionEntry> {
        self.actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Messages logged through [`Log::warn`].
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                LogEntry::Warn(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    /// Messages logged through [`Log::dry_run`].
    #[must_use]
    pub fn dry_runs(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                LogEntry::DryRun(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    /// Forwarded daemon lines as `(channel, daemon, line)`.
    #[must_use]
    pub fn daemon_lines(&self) -> Vec<(Channel, String, String)> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                LogEntry::Daemon {
                    channel,
                    daemon,
                    line,
                    ..
                } => Some((channel, daemon, line)),
                _ => None,
            })
            .collect()
    }

    /// Authentication events, in order.
    #[must_use]
    pub fn auth_events(&self) -> Vec<AuthEvent> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                LogEntry::Auth(event) => Some(event),
                _ => None,
            })
            .collect()
    }

    /// Whether any entry's text contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.entries().iter().any(|e| e.text().contains(needle))
    }
}

impl Log for MemoryLog {
    fn stage(&self, msg: &str) {
        self.push(LogEntry::Stage(msg.to_string()));
    }

    fn info(&self, msg: &str) {
        self.push(LogEntry::Info(msg.to_string()));
    }

    fn debug(&self, msg: &str) {
        self.push(LogEntry::Debug(msg.to_string()));
    }

    fn warn(&self, msg: &str) {
        self.push(LogEntry::Warn(msg.to_string()));
    }

    fn error(&self, msg: &str) {
        self.push(LogEntry::Error(msg.to_string()));
    }

    fn dry_run(&self, msg: &str) {
        self.push(LogEntry::DryRun(msg.to_string()));
    }

    fn record_action(&self, name: &str, status: ActionStatus, message: Option<&str>) {
        self.actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ActionEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
    }

    fn daemon_output(&self, channel: Channel, daemon: &str, stream: OutputStream, line: &str) {
        self.push(LogEntry::Daemon {
            channel,
            daemon: daemon.to_string(),
            stream,
            line: line.to_string(),
        });
    }

    fn auth_event(&self, event: &AuthEvent) {
        self.push(LogEntry::Auth(event.clone()));
    }
}
