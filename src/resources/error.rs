//! Typed error variants for resource operations.
//!
//! Resource code may return these variants directly; callers convert to
//! [`anyhow::Error`] via `?`.

use thiserror::Error;

/// Errors that arise from resource checks and apply operations.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// A generator command succeeded but left no file behind.
    #[error("{resource} was not generated at {path}")]
    NotGenerated {
        /// Description of the resource.
        resource: String,
        /// Path the file was expected at.
        path: String,
    },

    /// A resource exists but is in a state that cannot be repaired.
    #[error("invalid state for '{resource}': {reason}")]
    InvalidState {
        /// Name or description of the resource in the invalid state.
        resource: String,
        /// Human-readable explanation of why the state is invalid.
        reason: String,
    },
}
