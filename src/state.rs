//! Process-lifetime record of provisioned identities.
//!
//! The store starts empty and is extended only by identity actions, in plan
//! order. Channel actions run afterwards and only read it.

use crate::config::Group;
use crate::error::ExecutionError;
use crate::plan::ResolvedIdentity;

/// Groups, users and the guest identity provisioned so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeState {
    groups: Vec<Group>,
    users: Vec<ResolvedIdentity>,
    guest_user: Option<String>,
}

impl RuntimeState {
    /// Empty state: nothing provisioned yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a created group.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::DuplicateIdentity`] if the group was already recorded.
    pub fn add_group(&mut self, group: Group) -> Result<(), ExecutionError> {
        if self.group(&group.name).is_some() {
            return Err(ExecutionError::DuplicateIdentity {
                kind: "group",
                name: group.name,
            });
        }
        self.groups.push(group);
        Ok(())
    }

    /// Record a created or registered user.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::DuplicateIdentity`] if the user was already recorded.
    pub fn add_user(&mut self, user: ResolvedIdentity) -> Result<(), ExecutionError> {
        if self.user(&user.name).is_some() {
            return Err(ExecutionError::DuplicateIdentity {
                kind: "user",
                name: user.name,
            });
        }
        self.users.push(user);
        Ok(())
    }

    /// Set the guest identity. Allowed exactly once, for a recorded user.
    ///
    /// # Errors
    ///
    /// Returns an error if a guest is already defined or `name` was never recorded.
    pub fn define_guest(&mut self, name: &str) -> Result<(), ExecutionError> {
        if let Some(current) = &self.guest_user {
            return Err(ExecutionError::GuestAlreadyDefined {
                current: current.clone(),
                requested: name.to_string(),
            });
        }
        if self.user(name).is_none() {
            return Err(ExecutionError::UnknownIdentity(name.to_string()));
        }
        self.guest_user = Some(name.to_string());
        Ok(())
    }

    /// Name of the guest identity, once defined.
    #[must_use]
    pub fn guest_user(&self) -> Option<&str> {
        self.guest_user.as_deref()
    }

    /// The resolved guest identity.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::UnknownIdentity`] if no guest has been defined yet.
    pub fn guest(&self) -> Result<&ResolvedIdentity, ExecutionError> {
        let name = self
            .guest_user
            .as_deref()
            .ok_or_else(|| ExecutionError::UnknownIdentity("guest".to_string()))?;
        self.user(name)
            .ok_or_else(|| ExecutionError::UnknownIdentity(name.to_string()))
    }

    /// The recorded user named `name`.
    #[must_use]
    pub fn user(&self, name: &str) -> Option<&ResolvedIdentity> {
        self.users.iter().find(|u| u.name == name)
    }

    /// The recorded group named `name`.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Every recorded group, in creation order.
    #[must_use]
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Every recorded user, in creation order.
    #[must_use]
    pub fn users(&self) -> &[ResolvedIdentity] {
        &self.users
    }

    /// Numeric id of `group`, falling back to the conventional `nobody` gid
    /// for the implicit group of the synthetic guest.
    #[must_use]
    pub fn gid_of(&self, group: &str) -> Option<u32> {
        self.group(group).map(|g| g.id).or_else(|| {
            (group == crate::plan::GUEST_FALLBACK_NAME).then_some(crate::plan::GUEST_FALLBACK_ID)
        })
    }
}
