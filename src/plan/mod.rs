//! Plan compilation: configuration in, ordered provisioning actions out.
//!
//! A [`Plan`] is a flat sequence executed strictly in order. Compilation
//! validates every cross-entity reference first, so a plan only exists for
//! a configuration whose references all resolve.

pub mod identity;

use std::fmt;

pub use identity::{
    GUEST_FALLBACK_ID, GUEST_FALLBACK_NAME, GuestResolution, ResolvedIdentity, Resolver,
};

use crate::channels::Channel;
use crate::config::{Config, Group, Share};
use crate::error::ConfigError;
use crate::logging::Log;

/// One provisioning step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanAction {
    /// Create an OS group.
    CreateGroup(Group),
    /// Create an OS user account with its home directory and password.
    CreateUser(ResolvedIdentity),
    /// Record an identity without touching the OS (synthetic guest only).
    RegisterUser(ResolvedIdentity),
    /// Select the identity used for anonymous access.
    DefineGuestUser(String),
    /// Render a channel's configuration for the shares exposed through it.
    ConfigureChannel {
        /// Channel to configure.
        channel: Channel,
        /// Shares exposed through it, in declaration order.
        shares: Vec<Share>,
    },
    /// Launch and supervise a channel's daemons.
    StartChannel(Channel),
}

impl PlanAction {
    /// Short action name used in summaries.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::CreateGroup(_) => "create-group",
            Self::CreateUser(_) => "create-user",
            Self::RegisterUser(_) => "register-user",
            Self::DefineGuestUser(_) => "define-guest-user",
            Self::ConfigureChannel { .. } => "configure-channel",
            Self::StartChannel(_) => "start-channel",
        }
    }

    /// Whether the action extends the runtime identity state.
    #[must_use]
    pub const fn is_identity_action(&self) -> bool {
        matches!(
            self,
            Self::CreateGroup(_)
                | Self::CreateUser(_)
                | Self::RegisterUser(_)
                | Self::DefineGuestUser(_)
        )
    }
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateGroup(group) => write!(f, "create group {} (gid {})", group.name, group.id),
            Self::CreateUser(user) => {
                write!(
                    f,
                    "create user {} (uid {}, group {}",
                    user.name, user.id, user.primary_group
                )?;
                if !user.secondary_groups.is_empty() {
                    write!(f, ", also in {}", user.secondary_groups.join(","))?;
                }
                let password = if user.has_password() { "set" } else { "none" };
                write!(f, ", password {password})")
            }
            Self::RegisterUser(user) => {
                write!(f, "register user {} (uid {}, no OS account)", user.name, user.id)
            }
            Self::DefineGuestUser(name) => write!(f, "define guest user {name}"),
            Self::ConfigureChannel { channel, shares } => {
                let names: Vec<&str> = shares.iter().map(|s| s.name.as_str()).collect();
                write!(f, "configure {channel} for {}", names.join(", "))
            }
            Self::StartChannel(channel) => write!(f, "start {channel}"),
        }
    }
}

/// An ordered list of provisioning actions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    actions: Vec<PlanAction>,
}

impl Plan {
    /// Every action, in execution order.
    #[must_use]
    pub fn actions(&self) -> &[PlanAction] {
        &self.actions
    }

    /// Iterate over the actions in execution order.
    pub fn iter(&self) -> std::slice::Iter<'_, PlanAction> {
        self.actions.iter()
    }

    /// Number of actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the plan does nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Channels started by this plan, in start order.
    #[must_use]
    pub fn started_channels(&self) -> Vec<Channel> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                PlanAction::StartChannel(channel) => Some(*channel),
                _ => None,
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a PlanAction;
    type IntoIter = std::slice::Iter<'a, PlanAction>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, action) in self.actions.iter().enumerate() {
            writeln!(f, "{:>2}. {action}", index + 1)?;
        }
        Ok(())
    }
}

/// Compile `config` into a plan.
///
/// Identity actions come first (groups, users, guest), then one
/// `ConfigureChannel` per channel that exposes at least one share, then one
/// `StartChannel` per configured channel. Channels follow [`Channel::ALL`].
///
/// # Errors
///
/// Returns the first [`ConfigError`] found. Every share is validated before
/// any channel action is emitted, so one bad reference anywhere rejects the
/// whole configuration.
pub fn compile(config: &Config, log: &dyn Log) -> Result<Plan, ConfigError> {
    let resolver = Resolver::new(config)?;

    let mut exposed: Vec<(&Share, Vec<Channel>)> = Vec::with_capacity(config.shares.len());
    for share in &config.shares {
        let channels = resolver.check_share(share)?;
        if channels.is_empty() {
            log.info(&format!("skipping share {}: no channels", share.name));
            continue;
        }
        exposed.push((share, channels));
    }

    let mut actions: Vec<PlanAction> = config
        .groups
        .iter()
        .cloned()
        .map(PlanAction::CreateGroup)
        .collect();
    actions.extend(
        config
            .users
            .iter()
            .map(|u| PlanAction::CreateUser(ResolvedIdentity::from_user(u))),
    );

    match resolver.guest() {
        GuestResolution::Synthetic(identity) => {
            actions.push(PlanAction::RegisterUser(identity.clone()));
            actions.push(PlanAction::DefineGuestUser(identity.name.clone()));
        }
        GuestResolution::Declared(name) => {
            actions.push(PlanAction::DefineGuestUser(name.clone()));
        }
    }

    let mut configured = Vec::new();
    for channel in Channel::ALL {
        let shares: Vec<Share> = exposed
            .iter()
            .filter(|(_, channels)| channels.contains(&channel))
            .map(|(share, _)| (*share).clone())
            .collect();
        if shares.is_empty() {
            continue;
        }
        log.debug(&format!("{channel}: {} share(s)", shares.len()));
        actions.push(PlanAction::ConfigureChannel { channel, shares });
        configured.push(channel);
    }
    actions.extend(configured.into_iter().map(PlanAction::StartChannel));

    Ok(Plan { actions })
}
