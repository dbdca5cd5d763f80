//! Storage shares and their per-share access permissions.
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Access mode granted by a permission entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Read-only.
    Ro,
    /// Read-write.
    Rw,
}

/// One access-control entry of a share.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Permission {
    /// Read-only or read-write.
    pub mode: Mode,
    /// Users granted access.
    #[serde(default)]
    pub users: Vec<String>,
    /// Groups granted access.
    #[serde(default)]
    pub groups: Vec<String>,
    /// Grant anonymous access.
    #[serde(default)]
    pub guest: bool,
}

impl Permission {
    /// Whether the entry grants access to anyone at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.guest && self.users.is_empty() && self.groups.is_empty()
    }
}

/// Octal creation masks overriding the daemon defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UMasks {
    /// Highest permission bits new files may get.
    #[serde(default)]
    pub allowed_for_files: Option<String>,
    /// Highest permission bits new directories may get.
    #[serde(default)]
    pub allowed_for_dirs: Option<String>,
    /// Permission bits always set on new files.
    #[serde(default)]
    pub forced_for_files: Option<String>,
    /// Permission bits always set on new directories.
    #[serde(default)]
    pub forced_for_dirs: Option<String>,
    /// Mode of recycle directories.
    #[serde(default)]
    pub recycle_dir: Option<String>,
}

/// Trash/versioning behaviour: `true`/`false`, or an options object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Recycle {
    /// Enable or disable the recycle bin.
    Toggle(bool),
    /// Enable the recycle bin with options.
    Options {
        /// Recycle directory relative to the share.
        #[serde(default)]
        path: Option<String>,
    },
}

/// A named, path-backed unit of exposed storage.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Share {
    /// Share name, as clients see it.
    pub name: String,
    /// Directory on the host.
    pub path: PathBuf,
    /// Raw channel names; resolved (and rejected if unknown) by the plan compiler.
    #[serde(default)]
    pub channels: Vec<String>,
    /// List the share in network browse lists.
    #[serde(default)]
    pub visible: bool,
    /// Creation mask overrides.
    #[serde(default)]
    pub u_masks: Option<UMasks>,
    /// Recycle bin behaviour.
    #[serde(default)]
    pub recycle: Option<Recycle>,
    /// Who may access the share, and how.
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl Share {
    /// Whether any permission entry grants guest access.
    #[must_use]
    pub fn is_guest_accessible(&self) -> bool {
        self.permissions.iter().any(|p| p.guest)
    }

    /// Whether any permission entry grants access to named users or groups.
    #[must_use]
    pub fn has_identity_entries(&self) -> bool {
        self.permissions
            .iter()
            .any(|p| !p.users.is_empty() || !p.groups.is_empty())
    }

    /// Whether any permission entry grants write access.
    #[must_use]
    pub fn is_writable_by_anyone(&self) -> bool {
        self.permissions.iter().any(|p| p.mode == Mode::Rw)
    }

    /// Recycle repository directory, or `None` when trash is disabled.
    #[must_use]
    pub fn recycle_repository(&self) -> Option<&str> {
        const DEFAULT_REPOSITORY: &str = ".bin";
        match &self.recycle {
            Some(Recycle::Toggle(false)) => None,
            None | Some(Recycle::Toggle(true) | Recycle::Options { path: None }) => {
                Some(DEFAULT_REPOSITORY)
            }
            Some(Recycle::Options { path: Some(path) }) => Some(path.as_str()),
        }
    }
}
