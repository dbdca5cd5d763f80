//! File-sharing protocols: configuration rendering and daemon supervision.
//!
//! Each channel module exposes the same two entry points. `configure`
//! renders the protocol's access-control surface from the shares exposed
//! through it and the identities provisioned so far; `start` launches and
//! supervises the protocol's daemons.
pub mod access;
pub mod auth;
pub mod ftp;
pub mod nfs;
pub mod sftp;
pub mod smb;
pub mod supervisor;
pub mod webdav;

use std::fmt;

use anyhow::Result;
use serde::Serialize;

pub use auth::AuthEvent;
pub use supervisor::{DaemonExit, Supervisor};

use crate::config::Share;
use crate::engine::Context;
use crate::error::ExecutionError;
use crate::state::RuntimeState;

/// A supported file-sharing protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Windows file sharing through Samba.
    Smb,
    /// Read-only HTTP shares through nginx.
    Webdav,
    /// FTP over TLS through vsftpd.
    Ftp,
    /// Chrooted SFTP through OpenSSH.
    Sftp,
    /// Read-only NFS exports.
    Nfs,
}

impl Channel {
    /// Every channel, in the order channel actions are emitted.
    pub const ALL: [Self; 5] = [Self::Smb, Self::Webdav, Self::Ftp, Self::Sftp, Self::Nfs];

    /// Name as written in the configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Smb => "smb",
            Self::Webdav => "webdav",
            Self::Ftp => "ftp",
            Self::Sftp => "sftp",
            Self::Nfs => "nfs",
        }
    }

    /// Parse a channel name as written in the configuration.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /// Programs `start` launches, in launch order.
    #[must_use]
    pub const fn programs(self) -> &'static [&'static str] {
        match self {
            Self::Smb => &smb::PROGRAMS,
            Self::Webdav => &webdav::PROGRAMS,
            Self::Ftp => &ftp::PROGRAMS,
            Self::Sftp => &sftp::PROGRAMS,
            Self::Nfs => &nfs::PROGRAMS,
        }
    }

    /// Whether the channel can grant access to named users and groups.
    ///
    /// WebDAV and NFS only ever expose guest access.
    #[must_use]
    pub const fn supports_identity_access(self) -> bool {
        matches!(self, Self::Smb | Self::Ftp | Self::Sftp)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render `channel`'s configuration for `shares`.
///
/// # Errors
///
/// Returns an error if an artifact cannot be written, a bootstrap command
/// fails, or a referenced identity was never provisioned.
pub fn configure(
    channel: Channel,
    shares: &[Share],
    ctx: &Context,
    state: &RuntimeState,
) -> Result<()> {
    match channel {
        Channel::Smb => smb::configure(shares, ctx, state),
        Channel::Webdav => webdav::configure(shares, ctx, state),
        Channel::Ftp => ftp::configure(shares, ctx, state),
        Channel::Sftp => sftp::configure(shares, ctx, state),
        Channel::Nfs => nfs::configure(shares, ctx, state),
    }
}

/// Check that every program `channel` launches is installed.
///
/// A dry run only warns, since nothing will be launched.
///
/// # Errors
///
/// Returns [`ExecutionError::ProgramNotFound`] for the first missing program.
pub fn check_programs(channel: Channel, ctx: &Context) -> Result<()> {
    for program in channel.programs() {
        if ctx.executor.which(program) {
            continue;
        }
        if ctx.dry_run {
            ctx.log
                .warn(&format!("{channel}: '{program}' was not found on PATH"));
            continue;
        }
        return Err(ExecutionError::ProgramNotFound {
            channel: channel.to_string(),
            program: (*program).to_string(),
        }
        .into());
    }
    Ok(())
}

/// Launch `channel`'s daemons under `supervisor`.
///
/// Nothing is spawned unless every program the channel needs is installed.
///
/// # Errors
///
/// Returns an error if a program is missing, a daemon cannot be started,
/// or an auxiliary daemon exits unsuccessfully.
pub fn start(channel: Channel, ctx: &Context, supervisor: &mut Supervisor) -> Result<()> {
    check_programs(channel, ctx)?;
    match channel {
        Channel::Smb => smb::start(ctx, supervisor),
        Channel::Webdav => webdav::start(ctx, supervisor),
        Channel::Ftp => ftp::start(ctx, supervisor),
        Channel::Sftp => sftp::start(ctx, supervisor),
        Channel::Nfs => nfs::start(ctx, supervisor),
    }
}
