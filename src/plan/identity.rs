//! Identity resolution: reference checks and canonical identity records.
//!
//! Everything here is pure. A [`Resolver`] either accepts the whole
//! configuration or returns the first violated rule; the plan compiler never
//! emits a partial plan.

use std::collections::HashMap;

use serde::Serialize;

use crate::channels::Channel;
use crate::config::{Config, Group, Mode, Password, Share, User};
use crate::error::{ConfigError, Owner};

/// Name of the synthetic guest used when no `guestUser` is configured.
pub const GUEST_FALLBACK_NAME: &str = "nobody";

/// Numeric id of the synthetic guest.
pub const GUEST_FALLBACK_ID: u32 = 65534;

/// A user as the engine provisions it.
///
/// `password: None` means the account exists for identity purposes only and
/// is left passwordless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedIdentity {
    /// Login name.
    pub name: String,
    /// Numeric user id.
    pub id: u32,
    /// Primary group, `nobody` when no group is declared.
    pub primary_group: String,
    /// Supplementary groups.
    pub secondary_groups: Vec<String>,
    /// Password to set, if any.
    #[serde(skip)]
    pub password: Option<Password>,
}

impl ResolvedIdentity {
    /// Canonical record for a declared user.
    #[must_use]
    pub fn from_user(user: &User) -> Self {
        let mut groups = user.groups.iter().cloned();
        Self {
            name: user.name.clone(),
            id: user.id,
            primary_group: groups
                .next()
                .unwrap_or_else(|| GUEST_FALLBACK_NAME.to_string()),
            secondary_groups: groups.collect(),
            password: user.password().cloned(),
        }
    }

    /// The `nobody` identity standing in for anonymous access.
    #[must_use]
    pub fn synthetic_guest() -> Self {
        Self {
            name: GUEST_FALLBACK_NAME.to_string(),
            id: GUEST_FALLBACK_ID,
            primary_group: GUEST_FALLBACK_NAME.to_string(),
            secondary_groups: Vec::new(),
            password: None,
        }
    }

    /// Whether a password will be set.
    #[must_use]
    pub const fn has_password(&self) -> bool {
        self.password.is_some()
    }
}

/// Outcome of guest resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuestResolution {
    /// No usable `guestUser`: the synthetic `nobody` identity is registered.
    Synthetic(ResolvedIdentity),
    /// `guestUser` names a declared user.
    Declared(String),
}

impl GuestResolution {
    /// Name of the guest identity.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Synthetic(identity) => &identity.name,
            Self::Declared(name) => name,
        }
    }
}

/// Validated view over the identities of one configuration.
#[derive(Debug)]
pub struct Resolver<'a> {
    groups: HashMap<&'a str, &'a Group>,
    users: HashMap<&'a str, &'a User>,
    guest: GuestResolution,
}

impl<'a> Resolver<'a> {
    /// Check groups, users and the guest selection of `config`.
    ///
    /// # Errors
    ///
    /// Returns the first duplicate declaration, dangling group reference of a
    /// user, or invalid guest selection.
    pub fn new(config: &'a Config) -> Result<Self, ConfigError> {
        let mut groups: HashMap<&str, &Group> = HashMap::new();
        let mut ids: HashMap<u32, &str> = HashMap::new();
        for group in &config.groups {
            let clash = groups
                .get(group.name.as_str())
                .map(|g| g.name.as_str())
                .or_else(|| ids.get(&group.id).copied());
            if let Some(conflicts_with) = clash {
                return Err(ConfigError::DuplicateGroup {
                    name: group.name.clone(),
                    id: group.id,
                    conflicts_with: conflicts_with.to_string(),
                });
            }
            groups.insert(&group.name, group);
            ids.insert(group.id, &group.name);
        }

        let mut users: HashMap<&str, &User> = HashMap::new();
        for user in &config.users {
            if users.insert(&user.name, user).is_some() {
                return Err(ConfigError::DuplicateUser(user.name.clone()));
            }
            if let Some(missing) = user.groups.iter().find(|g| !groups.contains_key(g.as_str())) {
                return Err(ConfigError::UnknownGroupReference {
                    group: missing.clone(),
                    owner: Owner::User(user.name.clone()),
                });
            }
        }

        // A declared user named like the fallback guest is that guest.
        let guest = match config.guest_user.as_deref().unwrap_or(GUEST_FALLBACK_NAME) {
            name if users.contains_key(name) => GuestResolution::Declared(name.to_string()),
            GUEST_FALLBACK_NAME => GuestResolution::Synthetic(ResolvedIdentity::synthetic_guest()),
            name => return Err(ConfigError::InvalidGuestUser(name.to_string())),
        };

        Ok(Self {
            groups,
            users,
            guest,
        })
    }

    /// How the guest identity was resolved.
    #[must_use]
    pub const fn guest(&self) -> &GuestResolution {
        &self.guest
    }

    /// Validate the permissions and channels of `share`.
    ///
    /// Returns the share's channels, de-duplicated, in the order listed.
    ///
    /// # Errors
    ///
    /// Returns an error for guest write access, a dangling user or group
    /// reference, or an unknown channel name.
    pub fn check_share(&self, share: &Share) -> Result<Vec<Channel>, ConfigError> {
        for (index, permission) in share.permissions.iter().enumerate() {
            if permission.guest && permission.mode == Mode::Rw {
                return Err(ConfigError::UnsupportedPermission {
                    share: share.name.clone(),
                    index,
                });
            }
            if let Some(user) = permission
                .users
                .iter()
                .find(|u| !self.users.contains_key(u.as_str()) && u.as_str() != self.guest.name())
            {
                return Err(ConfigError::UnknownUserReference {
                    user: user.clone(),
                    share: share.name.clone(),
                });
            }
            if let Some(group) = permission
                .groups
                .iter()
                .find(|g| !self.groups.contains_key(g.as_str()))
            {
                return Err(ConfigError::UnknownGroupReference {
                    group: group.clone(),
                    owner: Owner::Share(share.name.clone()),
                });
            }
        }

        let mut channels = Vec::with_capacity(share.channels.len());
        for name in &share.channels {
            let channel = Channel::parse(name).ok_or_else(|| ConfigError::UnsupportedChannel {
                share: share.name.clone(),
                channel: name.clone(),
            })?;
            if !channels.contains(&channel) {
                channels.push(channel);
            }
        }
        Ok(channels)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn config(json: &str) -> Config {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn from_user_splits_primary_and_secondary_groups() {
        let user: User = serde_json::from_str(
            r#"{"name":"alice","id":5001,"groups":["family","media"],"password":"x"}"#,
        )
        .unwrap();
        let identity = ResolvedIdentity::from_user(&user);
        assert_eq!(identity.primary_group, "family");
        assert_eq!(identity.secondary_groups, vec!["media"]);
        assert!(identity.has_password());
    }

    #[test]
    fn user_without_groups_gets_nobody_primary_group() {
        let user: User = serde_json::from_str(r#"{"name":"bob","id":5002}"#).unwrap();
        let identity = ResolvedIdentity::from_user(&user);
        assert_eq!(identity.primary_group, "nobody");
        assert!(identity.secondary_groups.is_empty());
        assert!(!identity.has_password());
    }

    #[test]
    fn synthetic_guest_shape() {
        let guest = ResolvedIdentity::synthetic_guest();
        assert_eq!(guest.name, "nobody");
        assert_eq!(guest.id, 65534);
        assert!(guest.secondary_groups.is_empty());
        assert_eq!(guest.password, None);
    }

    #[test]
    fn duplicate_group_id_is_rejected() {
        let c = config(r#"{"groups":[{"name":"a","id":1},{"name":"b","id":1}]}"#);
        let err = Resolver::new(&c).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::DuplicateGroup { ref name, ref conflicts_with, .. } if name == "b" && conflicts_with == "a"
        ));
    }

    #[test]
    fn duplicate_group_name_is_rejected() {
        let c = config(r#"{"groups":[{"name":"a","id":1},{"name":"a","id":2}]}"#);
        assert!(matches!(
            Resolver::new(&c).unwrap_err(),
            ConfigError::DuplicateGroup { .. }
        ));
    }

    #[test]
    fn duplicate_user_is_rejected() {
        let c = config(r#"{"users":[{"name":"a","id":1},{"name":"a","id":2}]}"#);
        assert!(matches!(
            Resolver::new(&c).unwrap_err(),
            ConfigError::DuplicateUser(name) if name == "a"
        ));
    }

    #[test]
    fn user_group_reference_must_resolve() {
        let c = config(r#"{"users":[{"name":"alice","id":1,"groups":["family"]}]}"#);
        let err = Resolver::new(&c).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown group 'family' referenced by user 'alice'"
        );
    }

    #[test]
    fn explicit_nobody_selects_synthetic_guest() {
        let c = config(r#"{"guestUser":"nobody"}"#);
        let resolver = Resolver::new(&c).unwrap();
        assert!(matches!(resolver.guest(), GuestResolution::Synthetic(_)));
    }

    #[test]
    fn declared_nobody_is_the_default_guest() {
        let c = config(r#"{"users":[{"name":"nobody","id":65534}]}"#);
        let resolver = Resolver::new(&c).unwrap();
        assert_eq!(resolver.guest(), &GuestResolution::Declared("nobody".to_string()));
    }

    #[test]
    fn declared_guest_is_used() {
        let c = config(r#"{"users":[{"name":"guest","id":1}],"guestUser":"guest"}"#);
        let resolver = Resolver::new(&c).unwrap();
        assert_eq!(resolver.guest(), &GuestResolution::Declared("guest".to_string()));
    }

    #[test]
    fn undeclared_guest_is_rejected() {
        let c = config(r#"{"guestUser":"bob"}"#);
        assert!(matches!(
            Resolver::new(&c).unwrap_err(),
            ConfigError::InvalidGuestUser(name) if name == "bob"
        ));
    }

    #[test]
    fn permission_may_name_the_guest() {
        let c = config(
            r#"{"shares":[{"name":"pub","path":"/p","channels":["smb"],
                "permissions":[{"mode":"ro","users":["nobody"]}]}]}"#,
        );
        let resolver = Resolver::new(&c).unwrap();
        assert_eq!(resolver.check_share(&c.shares[0]).unwrap(), vec![Channel::Smb]);
    }

    #[test]
    fn guest_write_is_rejected() {
        let c = config(
            r#"{"shares":[{"name":"pub","path":"/p","permissions":[{"mode":"ro","guest":true},{"mode":"rw","guest":true}]}]}"#,
        );
        let resolver = Resolver::new(&c).unwrap();
        assert!(matches!(
            resolver.check_share(&c.shares[0]).unwrap_err(),
            ConfigError::UnsupportedPermission { index: 1, .. }
        ));
    }

    #[test]
    fn unknown_channel_is_rejected() {
        let c = config(r#"{"shares":[{"name":"pub","path":"/p","channels":["afp"]}]}"#);
        let resolver = Resolver::new(&c).unwrap();
        assert!(matches!(
            resolver.check_share(&c.shares[0]).unwrap_err(),
            ConfigError::UnsupportedChannel { channel, .. } if channel == "afp"
        ));
    }

    #[test]
    fn repeated_channels_are_collapsed() {
        let c = config(r#"{"shares":[{"name":"pub","path":"/p","channels":["nfs","smb","nfs"]}]}"#);
        let resolver = Resolver::new(&c).unwrap();
        assert_eq!(
            resolver.check_share(&c.shares[0]).unwrap(),
            vec![Channel::Nfs, Channel::Smb]
        );
    }
}
