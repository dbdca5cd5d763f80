//! Structured logger with dry-run awareness and summary collection.
use std::path::PathBuf;
use std::sync::Mutex;

use super::subscriber::{AUTH_TARGET, DAEMON_TARGET, DRY_RUN_TARGET, STAGE_TARGET};
use super::types::{ActionEntry, ActionStatus, Log, OutputStream};
use super::utils::log_file_path;
use crate::channels::{AuthEvent, Channel};

/// Implement the display methods of [`Log`] by delegating to inherent methods
/// of the same name on the implementing type.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Structured logger backed by `tracing`.
///
/// All messages also reach the persistent log file at
/// `<log dir>/<command>.log` through the file layer installed by
/// [`init_subscriber`](super::subscriber::init_subscriber).
#[derive(Debug)]
pub struct Logger {
    actions: Mutex<Vec<ActionEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Create a new logger.
    ///
    /// Stores the log file path for display in the run summary; the file
    /// itself is owned by the subscriber's file layer.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self::with_log_file(log_file_path(command))
    }

    #[must_use]
    pub(super) const fn with_log_file(log_file: Option<PathBuf>) -> Self {
        Self {
            actions: Mutex::new(Vec::new()),
            log_file,
        }
    }

    /// Return the log file path, if available.
    #[must_use]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Return a clone of all recorded action entries.
    #[must_use]
    pub fn action_entries(&self) -> Vec<ActionEntry> {
        self.actions.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (suppressed on console unless verbose).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a dry-run action message.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }

    /// Record an action result for the summary.
    pub fn record_action(&self, name: &str, status: ActionStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.actions.lock() {
            guard.push(ActionEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    /// Return `true` if any recorded action has failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }

    /// Count the number of failed actions.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.actions.lock().map_or(0, |guard| {
            guard
                .iter()
                .filter(|a| a.status == ActionStatus::Failed)
                .count()
        })
    }

    /// Print the summary of all recorded actions.
    pub fn print_summary(&self) {
        let actions = self.action_entries();
        if actions.is_empty() {
            return;
        }

        self.stage("Summary");

        let mut ok = 0u32;
        let mut dry_run = 0u32;
        let mut failed = 0u32;

        for action in &actions {
            let (icon, color) = match action.status {
                ActionStatus::Ok => {
                    ok += 1;
                    ("✓", "\x1b[32m")
                }
                ActionStatus::DryRun => {
                    dry_run += 1;
                    ("~", "\x1b[37m")
                }
                ActionStatus::Failed => {
                    failed += 1;
                    ("✗", "\x1b[31m")
                }
            };

            let suffix = action
                .message
                .as_ref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));

            self.info(&format!("{color}{icon} {}{suffix}\x1b[0m", action.name));
        }

        let total = ok + dry_run + failed;
        self.info(&format!(
            "{total} actions: \x1b[32m{ok} ok\x1b[0m, \x1b[37m{dry_run} dry-run\x1b[0m, \x1b[31m{failed} failed\x1b[0m"
        ));

        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

impl Log for Logger {
    forward_log_methods!(stage, info, debug, warn, error, dry_run);

    fn record_action(&self, name: &str, status: ActionStatus, message: Option<&str>) {
        self.record_action(name, status, message);
    }

    fn daemon_output(&self, channel: Channel, daemon: &str, stream: OutputStream, line: &str) {
        tracing::info!(
            target: DAEMON_TARGET,
            channel = channel.as_str(),
            daemon,
            stream = stream.as_str(),
            "{line}"
        );
    }

    fn auth_event(&self, event: &AuthEvent) {
        let user = event.user.as_deref().unwrap_or("-");
        let client = event.client.as_deref().unwrap_or("-");
        if event.success {
            tracing::info!(
                target: AUTH_TARGET,
                channel = event.channel.as_str(),
                success = true,
                user,
                client,
                "{event}"
            );
        } else {
            tracing::warn!(
                target: AUTH_TARGET,
                channel = event.channel.as_str(),
                success = false,
                user,
                client,
                "{event}"
            );
        }
    }
}
