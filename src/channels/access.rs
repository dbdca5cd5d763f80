//! Access rules derived from share permission entries.
//!
//! [`ShareAccess`] is the per-share view used for SMB share sections.
//! [`ChannelAccess`] merges every share of a channel into the login
//! surface of protocols that authenticate per daemon rather than per share.
use std::fmt;

use crate::config::{Mode, Share};
use crate::state::RuntimeState;

/// A named user or group granted access by a permission entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// A single named user.
    User(String),
    /// Every member of a group.
    Group(String),
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(name) => f.write_str(name),
            Self::Group(name) => write!(f, "@{name}"),
        }
    }
}

/// Who may read and write one share.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareAccess {
    /// Anonymous connections are allowed.
    pub guest: bool,
    /// Principals allowed to connect, in declaration order.
    pub valid: Vec<Principal>,
    /// Principals allowed to write, in declaration order.
    pub writers: Vec<Principal>,
}

impl ShareAccess {
    /// Collect the access rules of `share`'s permission entries.
    #[must_use]
    pub fn of(share: &Share) -> Self {
        let mut access = Self::default();
        for permission in &share.permissions {
            if permission.guest {
                access.guest = true;
            }
            let principals = permission
                .users
                .iter()
                .cloned()
                .map(Principal::User)
                .chain(permission.groups.iter().cloned().map(Principal::Group));
            for principal in principals {
                if permission.mode == Mode::Rw {
                    access.writers.push(principal.clone());
                }
                access.valid.push(principal);
            }
        }
        access
    }

    /// Whether anyone at all may connect.
    #[must_use]
    pub fn available(&self) -> bool {
        self.guest || !self.valid.is_empty()
    }

    /// Guest access with no named principal alongside it.
    #[must_use]
    pub fn guest_only(&self) -> bool {
        self.guest && self.valid.is_empty()
    }
}

/// Merged login surface of every share exposed through one channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelAccess {
    /// Some share grants guest access.
    pub guest: bool,
    /// Users allowed to log in, groups expanded to their provisioned
    /// members. Unique, in first-appearance order.
    pub users: Vec<String>,
    /// Some named principal may write.
    pub writable: bool,
}

impl ChannelAccess {
    /// Merge the access rules of every share in `shares`.
    #[must_use]
    pub fn of(shares: &[Share], state: &RuntimeState) -> Self {
        let mut merged = Self::default();
        for share in shares {
            let access = ShareAccess::of(share);
            merged.guest |= access.guest;
            merged.writable |= !access.writers.is_empty();
            for principal in &access.valid {
                match principal {
                    Principal::User(name) => merged.push(name),
                    Principal::Group(group) => {
                        for member in members(state, group) {
                            merged.push(member);
                        }
                    }
                }
            }
        }
        merged
    }

    fn push(&mut self, name: &str) {
        if !self.users.iter().any(|u| u == name) {
            self.users.push(name.to_string());
        }
    }

    /// Whether any named user may log in.
    #[must_use]
    pub fn has_users(&self) -> bool {
        !self.users.is_empty()
    }
}

/// Provisioned users whose primary or secondary groups include `group`.
fn members<'a>(state: &'a RuntimeState, group: &'a str) -> impl Iterator<Item = &'a str> {
    state
        .users()
        .iter()
        .filter(move |u| u.primary_group == group || u.secondary_groups.iter().any(|g| g == group))
        .map(|u| u.name.as_str())
}

/// Users referenced directly by name in `shares`, unique, in first-appearance order.
#[must_use]
pub fn referenced_users(shares: &[Share]) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for name in shares
        .iter()
        .flat_map(|s| &s.permissions)
        .flat_map(|p| &p.users)
    {
        if !names.contains(&name.as_str()) {
            names.push(name);
        }
    }
    names
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::{Group, User};
    use crate::plan::ResolvedIdentity;

    fn share(json: &str) -> Share {
        serde_json::from_str(json).unwrap()
    }

    fn state_with(users: &[(&str, &[&str])]) -> RuntimeState {
        let mut state = RuntimeState::new();
        state
            .add_group(Group {
                name: "family".to_string(),
                id: 5000,
            })
            .unwrap();
        for (i, (name, groups)) in users.iter().enumerate() {
            let user = User {
                name: (*name).to_string(),
                id: 5001 + u32::try_from(i).unwrap(),
                groups: groups.iter().map(|g| (*g).to_string()).collect(),
                password: None,
            };
            state.add_user(ResolvedIdentity::from_user(&user)).unwrap();
        }
        state
    }

    #[test]
    fn users_and_groups_keep_declaration_order() {
        let access = ShareAccess::of(&share(
            r#"{"name":"d","path":"/d","permissions":[
                {"mode":"ro","users":["bob"],"groups":["family"]},
                {"mode":"rw","users":["alice"]}]}"#,
        ));
        let valid: Vec<String> = access.valid.iter().map(ToString::to_string).collect();
        let writers: Vec<String> = access.writers.iter().map(ToString::to_string).collect();
        assert_eq!(valid, vec!["bob", "@family", "alice"]);
        assert_eq!(writers, vec!["alice"]);
        assert!(access.available());
        assert!(!access.guest_only());
    }

    #[test]
    fn guest_entry_alone_is_guest_only() {
        let access = ShareAccess::of(&share(
            r#"{"name":"p","path":"/p","permissions":[{"mode":"ro","guest":true}]}"#,
        ));
        assert!(access.available());
        assert!(access.guest_only());
        assert!(access.valid.is_empty());
    }

    #[test]
    fn no_permissions_is_unavailable() {
        let access = ShareAccess::of(&share(r#"{"name":"x","path":"/x"}"#));
        assert!(!access.available());
    }

    #[test]
    fn channel_access_expands_groups_to_members() {
        let state = state_with(&[("alice", &["family"]), ("bob", &[]), ("carol", &["x", "family"])]);
        let shares = vec![
            share(r#"{"name":"a","path":"/a","permissions":[{"mode":"ro","users":["bob"]}]}"#),
            share(
                r#"{"name":"b","path":"/b","permissions":[{"mode":"rw","groups":["family"]},{"mode":"ro","guest":true}]}"#,
            ),
        ];
        let access = ChannelAccess::of(&shares, &state);
        assert_eq!(access.users, vec!["bob", "alice", "carol"]);
        assert!(access.guest);
        assert!(access.writable);
    }

    #[test]
    fn referenced_users_are_unique() {
        let shares = vec![
            share(r#"{"name":"a","path":"/a","permissions":[{"mode":"ro","users":["bob","alice"]}]}"#),
            share(r#"{"name":"b","path":"/b","permissions":[{"mode":"rw","users":["alice"],"groups":["family"]}]}"#),
        ];
        assert_eq!(referenced_users(&shares), vec!["bob", "alice"]);
    }
}
