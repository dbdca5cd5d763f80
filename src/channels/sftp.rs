//! Chrooted SFTP served by OpenSSH.
use anyhow::Result;

use super::access::ChannelAccess;
use super::{Channel, Supervisor};
use crate::config::{Layout, Share};
use crate::engine::{Context, ensure_resource};
use crate::plan::ResolvedIdentity;
use crate::resources::keys::SshHostKey;
use crate::state::RuntimeState;

/// Host key algorithms and their key sizes, in `HostKey` order.
pub const HOST_KEYS: [(&str, Option<u32>); 2] = [("ed25519", None), ("rsa", Some(4096))];

/// Absolute path of the SSH daemon, which refuses to re-exec otherwise.
const SSHD: &str = "/usr/sbin/sshd";
/// Daemons launched by [`start`].
pub const PROGRAMS: [&str; 1] = [SSHD];

/// Render `sshd_config`.
///
/// Guest entries allow the guest user with an empty password. Group
/// entries are expanded to their members so one `AllowUsers` line decides
/// who may log in; nobody may when no share grants access.
#[must_use]
pub fn render(layout: &Layout, guest: &ResolvedIdentity, access: &ChannelAccess) -> String {
    let mut lines: Vec<String> = vec!["Protocol 2".to_string()];
    lines.extend(
        HOST_KEYS
            .iter()
            .map(|(alg, _)| format!("HostKey {}", layout.ssh_host_key(alg).display())),
    );
    lines.extend(
        [
            "Port 22",
            "PermitRootLogin no",
            "X11Forwarding no",
            "AllowTcpForwarding no",
            "UseDNS no",
            "PasswordAuthentication yes",
        ]
        .map(String::from),
    );

    let mut allowed: Vec<&str> = access.users.iter().map(String::as_str).collect();
    if access.guest && !allowed.contains(&guest.name.as_str()) {
        allowed.push(&guest.name);
    }
    if allowed.is_empty() {
        lines.push("DenyUsers *".to_string());
    } else {
        lines.push(format!("AllowUsers {}", allowed.join(" ")));
    }
    if access.guest {
        lines.push("PermitEmptyPasswords yes".to_string());
    }

    lines.extend(
        [
            "",
            "Subsystem sftp internal-sftp",
            "ForceCommand internal-sftp",
            "ChrootDirectory %h",
        ]
        .map(String::from),
    );
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Bootstrap the host keys, then write `sshd_config`.
///
/// # Errors
///
/// Returns an error if key generation fails, no guest is defined, or the
/// file cannot be written.
pub fn configure(shares: &[Share], ctx: &Context, state: &RuntimeState) -> Result<()> {
    for (algorithm, bits) in HOST_KEYS {
        ensure_resource(
            ctx,
            &SshHostKey::new(
                algorithm,
                bits,
                ctx.layout.ssh_host_key(algorithm),
                ctx.executor.as_ref(),
                ctx.fs_ops.as_ref(),
            ),
        )?;
    }
    let access = ChannelAccess::of(shares, state);
    let conf = render(&ctx.layout, state.guest()?, &access);
    ctx.write_file(&ctx.layout.sshd_config(), &conf)
}

/// Supervise sshd in the foreground, logging to stderr.
///
/// # Errors
///
/// Returns an error if sshd cannot be started.
pub fn start(ctx: &Context, supervisor: &mut Supervisor) -> Result<()> {
    let conf = ctx.layout.sshd_config().display().to_string();
    supervisor.start(Channel::Sftp, SSHD, &["-D", "-e", "-f", &conf])
}
