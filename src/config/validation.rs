//! Non-fatal configuration checks, reported as warnings before a run.
use std::collections::HashSet;

use super::Config;
use crate::channels::Channel;

/// A validation warning detected during configuration loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// The configuration section (e.g. "shares", "users").
    pub source: String,
    /// The specific item that triggered the warning.
    pub item: String,
    /// Human-readable warning message.
    pub message: String,
}

impl ValidationWarning {
    /// A warning about `item` raised by the `source` validator.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        item: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            item: item.into(),
            message: message.into(),
        }
    }
}

/// Trait for configuration validators.
///
/// Validators report suspicious but legal configuration. Anything that
/// makes the plan impossible to compile is a [`ConfigError`](crate::error::ConfigError)
/// raised by the plan compiler instead.
pub trait ConfigValidator {
    /// Validate the configuration and return any warnings found.
    fn validate(&self, config: &Config) -> Vec<ValidationWarning>;

    /// Return a human-readable name for this validator.
    fn name(&self) -> &'static str;
}

/// Checks share paths and permission entries.
#[derive(Debug)]
pub struct ShareValidator;

impl ConfigValidator for ShareValidator {
    fn validate(&self, config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        for share in &config.shares {
            if !share.path.is_absolute() {
                warnings.push(ValidationWarning::new(
                    "shares",
                    &share.name,
                    format!("path should be absolute: {}", share.path.display()),
                ));
            }

            if share.permissions.is_empty() {
                warnings.push(ValidationWarning::new(
                    "shares",
                    &share.name,
                    "no permissions declared; share will be unavailable",
                ));
            }

            for (index, permission) in share.permissions.iter().enumerate() {
                if permission.is_empty() {
                    warnings.push(ValidationWarning::new(
                        "shares",
                        &share.name,
                        format!("permission #{index} grants access to nobody"),
                    ));
                }
            }

            if !share.has_identity_entries() {
                continue;
            }
            for channel in share.channels.iter().filter_map(|c| Channel::parse(c)) {
                if !channel.supports_identity_access() {
                    warnings.push(ValidationWarning::new(
                        "shares",
                        &share.name,
                        format!("only guest access is exposed over {channel}; user and group entries are ignored there"),
                    ));
                }
            }
        }

        warnings
    }

    fn name(&self) -> &'static str {
        "shares"
    }
}

/// Checks that users exposed over SMB can actually authenticate.
#[derive(Debug)]
pub struct CredentialValidator;

impl ConfigValidator for CredentialValidator {
    fn validate(&self, config: &Config) -> Vec<ValidationWarning> {
        let mut seen = HashSet::new();
        let mut warnings = Vec::new();

        let smb_users = config
            .shares
            .iter()
            .filter(|s| s.channels.iter().any(|c| Channel::parse(c) == Some(Channel::Smb)))
            .flat_map(|s| s.permissions.iter())
            .flat_map(|p| p.users.iter());

        for name in smb_users {
            if !seen.insert(name.as_str()) {
                continue;
            }
            let lacks_password = config
                .users
                .iter()
                .find(|u| &u.name == name)
                .is_some_and(|u| u.password().is_none());
            if lacks_password {
                warnings.push(ValidationWarning::new(
                    "users",
                    name,
                    "referenced by an smb share but has no password; it cannot authenticate over smb",
                ));
            }
        }

        warnings
    }

    fn name(&self) -> &'static str {
        "credentials"
    }
}

/// Run every validator against `config`.
#[must_use]
pub fn validate_all(config: &Config) -> Vec<ValidationWarning> {
    let validators: [&dyn ConfigValidator; 2] = [&ShareValidator, &CredentialValidator];
    validators
        .iter()
        .flat_map(|v| v.validate(config))
        .collect()
}
