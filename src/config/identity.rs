//! Declared groups and users.
use std::fmt;

use serde::{Deserialize, Serialize};

/// A POSIX group to create.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Group {
    /// Group name.
    pub name: String,
    /// Numeric group id.
    pub id: u32,
}

/// An account password. Redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    /// Wrap a clear-text password.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The clear-text value, for piping into credential tools only.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// A user account to create.
///
/// The first entry of `groups` is the primary group; the rest are
/// supplementary memberships.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Login name.
    pub name: String,
    /// Numeric user id.
    pub id: u32,
    /// Group memberships, primary first.
    #[serde(default)]
    pub groups: Vec<String>,
    /// Password to set, if any.
    #[serde(default)]
    pub password: Option<Password>,
}

impl User {
    /// The declared password; an empty string counts as no password.
    #[must_use]
    pub fn password(&self) -> Option<&Password> {
        self.password.as_ref().filter(|p| !p.expose().is_empty())
    }
}
