//! Domain-specific error types for the provisioning engine.
//!
//! Library code returns typed errors ([`ConfigError`], [`ExecutionError`])
//! while handlers and command entry points wrap them in [`anyhow::Error`]
//! with context via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! ShareHostError
//! ├── Config(ConfigError)       — loading and cross-entity validation, before any side effect
//! └── Execution(ExecutionError) — external commands, file writes, runtime state
//! ```

use std::fmt;

use thiserror::Error;

/// Top-level error type for the provisioning engine.
#[derive(Error, Debug)]
pub enum ShareHostError {
    /// The configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A plan action failed while executing.
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),
}

/// The configuration entity that holds a dangling reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Owner {
    /// A declared user (through its `groups` list).
    User(String),
    /// A declared share (through one of its permission entries).
    Share(String),
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(name) => write!(f, "user '{name}'"),
            Self::Share(name) => write!(f, "share '{name}'"),
        }
    }
}

/// Errors raised while loading or compiling the configuration.
///
/// Every variant is fatal and is raised before any side effect occurs.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Neither a config file nor the fallback environment variable was supplied.
    #[error("no configuration supplied: pass --config or set the {0} environment variable")]
    Missing(String),

    /// An I/O error occurred while reading a config file.
    #[error("IO error reading config file {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration document does not match the expected shape.
    #[error("invalid configuration in {origin}: {message}")]
    Parse {
        /// Where the document came from (file path or environment variable).
        origin: String,
        /// Deserializer message.
        message: String,
    },

    /// Two groups share a name or a numeric id.
    #[error("group '{name}' (id {id}) conflicts with already declared group '{conflicts_with}'")]
    DuplicateGroup {
        /// Name of the group declared last.
        name: String,
        /// Its numeric id.
        id: u32,
        /// Name of the group it collides with.
        conflicts_with: String,
    },

    /// A user name is declared more than once.
    #[error("user '{0}' is declared more than once")]
    DuplicateUser(String),

    /// A group name does not match any declared group.
    #[error("unknown group '{group}' referenced by {owner}")]
    UnknownGroupReference {
        /// The dangling group name.
        group: String,
        /// The entity holding the reference.
        owner: Owner,
    },

    /// A permission names a user that is neither declared nor the guest.
    #[error("unknown user '{user}' referenced by share '{share}'")]
    UnknownUserReference {
        /// The dangling user name.
        user: String,
        /// Share holding the permission entry.
        share: String,
    },

    /// `guestUser` names a user that is not declared.
    #[error("invalid guest user '{0}': no such user is declared")]
    InvalidGuestUser(String),

    /// A permission entry combines guest access with write access.
    #[error("share '{share}' permission #{index}: guest access cannot be combined with mode 'rw'")]
    UnsupportedPermission {
        /// Share holding the permission entry.
        share: String,
        /// Zero-based index of the entry in the share's permission list.
        index: usize,
    },

    /// A share lists a channel outside the supported set.
    #[error(
        "share '{share}' uses unsupported channel '{channel}' (expected one of smb, webdav, ftp, sftp, nfs)"
    )]
    UnsupportedChannel {
        /// Share listing the channel.
        share: String,
        /// The unrecognised channel name.
        channel: String,
    },
}

/// Errors raised while executing plan actions.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// An external command exited abnormally.
    #[error("command '{program}' failed ({}): {stderr}", describe_exit(*.code))]
    CommandFailed {
        /// Program that was invoked.
        program: String,
        /// Exit code, or `None` when terminated by a signal.
        code: Option<i32>,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// An external command could not be started at all.
    #[error("failed to start '{program}': {source}")]
    Spawn {
        /// Program that was invoked.
        program: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A daemon a channel needs is not installed.
    #[error("{channel} requires '{program}', which was not found on PATH")]
    ProgramNotFound {
        /// Channel being started.
        channel: String,
        /// Missing program.
        program: String,
    },

    /// A file or directory could not be written.
    #[error("failed to write {path}: {source}")]
    Io {
        /// Path being written.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// An identity was appended to the runtime state twice.
    #[error("{kind} '{name}' is already registered")]
    DuplicateIdentity {
        /// `"user"` or `"group"`.
        kind: &'static str,
        /// Name of the identity.
        name: String,
    },

    /// The guest identity was defined a second time.
    #[error("guest user already defined as '{current}', refusing to redefine as '{requested}'")]
    GuestAlreadyDefined {
        /// Guest already recorded.
        current: String,
        /// Guest requested by the offending action.
        requested: String,
    },

    /// An identity was referenced before the action provisioning it ran.
    #[error("identity '{0}' has not been provisioned")]
    UnknownIdentity(String),
}

fn describe_exit(code: Option<i32>) -> String {
    code.map_or_else(|| "terminated by signal".to_string(), |c| format!("exit {c}"))
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn unknown_group_names_the_owner() {
        let e = ConfigError::UnknownGroupReference {
            group: "family".to_string(),
            owner: Owner::User("alice".to_string()),
        };
        assert_eq!(
            e.to_string(),
            "unknown group 'family' referenced by user 'alice'"
        );
    }

    #[test]
    fn unknown_group_from_share_names_the_share() {
        let e = ConfigError::UnknownGroupReference {
            group: "staff".to_string(),
            owner: Owner::Share("docs".to_string()),
        };
        assert_eq!(
            e.to_string(),
            "unknown group 'staff' referenced by share 'docs'"
        );
    }

    #[test]
    fn invalid_guest_user_display() {
        let e = ConfigError::InvalidGuestUser("bob".to_string());
        assert_eq!(
            e.to_string(),
            "invalid guest user 'bob': no such user is declared"
        );
    }

    #[test]
    fn unsupported_permission_display() {
        let e = ConfigError::UnsupportedPermission {
            share: "public".to_string(),
            index: 1,
        };
        assert!(e.to_string().contains("share 'public' permission #1"));
        assert!(e.to_string().contains("'rw'"));
    }

    #[test]
    fn config_io_has_source() {
        use std::error::Error as StdError;
        let e = ConfigError::Io {
            path: "/etc/sharehost.json".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("/etc/sharehost.json"));
    }

    #[test]
    fn command_failed_with_exit_code() {
        let e = ExecutionError::CommandFailed {
            program: "adduser".to_string(),
            code: Some(1),
            stderr: "user exists".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "command 'adduser' failed (exit 1): user exists"
        );
    }

    #[test]
    fn command_failed_by_signal() {
        let e = ExecutionError::CommandFailed {
            program: "nmbd".to_string(),
            code: None,
            stderr: String::new(),
        };
        assert!(e.to_string().contains("terminated by signal"));
    }

    #[test]
    fn program_not_found_names_channel_and_program() {
        let e = ExecutionError::ProgramNotFound {
            channel: "ftp".to_string(),
            program: "vsftpd".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "ftp requires 'vsftpd', which was not found on PATH"
        );
    }

    #[test]
    fn sharehost_error_wraps_config_error() {
        let e: ShareHostError = ConfigError::DuplicateUser("alice".to_string()).into();
        assert!(e.to_string().starts_with("Configuration error"));
        assert!(e.to_string().contains("alice"));
    }

    #[test]
    fn sharehost_error_wraps_execution_error() {
        let e: ShareHostError = ExecutionError::UnknownIdentity("carol".to_string()).into();
        assert!(e.to_string().starts_with("Execution error"));
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn all_error_types_are_send_sync() {
        assert_send_sync::<ShareHostError>();
        assert_send_sync::<ConfigError>();
        assert_send_sync::<ExecutionError>();
    }

    #[test]
    fn errors_convert_to_anyhow() {
        let _a: anyhow::Error = ConfigError::InvalidGuestUser("x".to_string()).into();
        let _b: anyhow::Error = ExecutionError::UnknownIdentity("x".to_string()).into();
    }
}
