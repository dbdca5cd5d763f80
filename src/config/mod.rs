//! Declarative host configuration: identities, shares, and host settings.
pub mod identity;
pub mod layout;
pub mod loader;
pub mod shares;
pub mod validation;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use identity::{Group, Password, User};
pub use layout::Layout;
pub use shares::{Mode, Permission, Recycle, Share, UMasks};

use crate::error::ConfigError;

/// Default SMB workgroup when none is configured.
pub const DEFAULT_WORKGROUP: &str = "WORKGROUP";

/// The complete configuration document for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Groups to create.
    #[serde(default)]
    pub groups: Vec<Group>,
    /// Users to create.
    #[serde(default)]
    pub users: Vec<User>,
    /// Name of the user that represents anonymous access.
    #[serde(default)]
    pub guest_user: Option<String>,
    /// Shares to expose.
    #[serde(default, alias = "storages")]
    pub shares: Vec<Share>,
    /// Announce the host in network browse lists.
    #[serde(default)]
    pub visible: bool,
    /// SMB workgroup, defaulting to [`DEFAULT_WORKGROUP`].
    #[serde(default)]
    pub workgroup: Option<String>,
    /// Require SMB transport encryption when `true`, disable it when `false`.
    #[serde(default)]
    pub encryption: Option<bool>,
}

impl Config {
    /// Load the configuration from `path`, or from the `CONFIG` environment
    /// variable when no path is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is missing, unreadable, or malformed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        path.map_or_else(
            || loader::load_env(loader::CONFIG_ENV_VAR),
            loader::load_file,
        )
    }

    /// Collect non-fatal configuration warnings.
    #[must_use]
    pub fn validate(&self) -> Vec<validation::ValidationWarning> {
        validation::validate_all(self)
    }
}

/// Host-wide settings consumed by channel configurators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSettings {
    /// Host name announced by the daemons.
    pub hostname: String,
    /// SMB workgroup.
    pub workgroup: String,
    /// Announce the host in browse lists.
    pub visible: bool,
    /// SMB transport encryption, daemon default when unset.
    pub encryption: Option<bool>,
}

impl HostSettings {
    /// Settings for `config` on the host named `hostname`.
    #[must_use]
    pub fn from_config(config: &Config, hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            workgroup: config
                .workgroup
                .clone()
                .unwrap_or_else(|| DEFAULT_WORKGROUP.to_string()),
            visible: config.visible,
            encryption: config.encryption,
        }
    }
}
