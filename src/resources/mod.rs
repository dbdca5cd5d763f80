//! OS-level resource primitives (check + apply pattern).
pub mod account;
pub mod error;
pub mod keys;

use anyhow::Result;

pub use error::ResourceError;

/// Minimal interface for resources that can be described and applied.
///
/// Account creation has no cheap, reliable state query on a pristine host,
/// so account resources implement only this trait. Resources that can
/// inspect their own state implement the richer [`Resource`] super-trait.
pub trait Applicable {
    /// Human-readable description of this resource.
    fn description(&self) -> String;

    /// Apply the resource change.
    ///
    /// # Errors
    ///
    /// Returns an error if a command fails or a file cannot be written.
    fn apply(&self) -> Result<ResourceChange>;
}

/// State of a resource on disk.
///
/// # Examples
///
/// ```
/// use sharehost::resources::ResourceState;
///
/// let missing = ResourceState::Missing;
/// let invalid = ResourceState::Invalid { reason: "path is a directory".into() };
///
/// assert_ne!(missing, ResourceState::Correct);
/// assert_ne!(invalid, missing);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    /// Resource does not exist yet.
    Missing,
    /// Resource exists and can be used as is.
    Correct,
    /// Resource cannot be applied (e.g., its path is occupied by a directory).
    Invalid {
        /// Reason why the resource cannot be applied.
        reason: String,
    },
}

/// Result of applying a resource change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceChange {
    /// Resource was created or updated.
    Applied,
    /// Resource was already correct (no change needed).
    AlreadyCorrect,
    /// Resource was deliberately not applied.
    Skipped {
        /// Reason why the resource was skipped.
        reason: String,
    },
}

/// Resources that can determine their own state before being applied.
///
/// Only [`ResourceState::Missing`] resources are applied; invalid ones
/// abort the action that needs them.
pub trait Resource: Applicable {
    /// Check the current state of the resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be determined.
    fn current_state(&self) -> Result<ResourceState>;
}


#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn recording_executor_reports_missing_programs() {
        use crate::exec::Executor as _;
        let exec = test_helpers::RecordingExecutor::new().missing("vsftpd");
        assert!(!exec.which("vsftpd"));
        assert!(exec.which("smbd"));
        assert!(exec.calls().is_empty());
    }

    #[test]
    fn recording_executor_records_calls() {
        use crate::exec::Executor as _;
        let exec = test_helpers::RecordingExecutor::new().failing("passwd");
        exec.run("addgroup", &["-g", "5000", "-S", "family"]).unwrap();
        assert!(exec.run_with_input("passwd", &["alice"], "x\nx\n").is_err());
        assert_eq!(
            exec.command_lines(),
            vec!["addgroup -g 5000 -S family", "passwd alice"]
        );
        assert_eq!(exec.calls()[1].input.as_deref(), Some("x\nx\n"));
    }
}
