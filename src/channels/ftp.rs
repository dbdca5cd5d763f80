//! FTP over TLS, served by vsftpd.
//!
//! Guest entries enable anonymous read-only logins rooted at the first
//! guest-accessible share. vsftpd has a single anonymous root, so further
//! guest shares are reported and left unexposed. Named entries enable local
//! logins restricted to a user list.
use std::path::Path;

use anyhow::Result;

use super::access::ChannelAccess;
use super::{Channel, Supervisor};
use crate::config::{Layout, Share};
use crate::engine::{Context, ensure_resource};
use crate::plan::ResolvedIdentity;
use crate::resources::keys::TlsCertificate;
use crate::state::RuntimeState;

const VSFTPD: &str = "vsftpd";
const TAIL: &str = "tail";
/// Programs launched by [`start`].
pub const PROGRAMS: [&str; 2] = [VSFTPD, TAIL];

/// Login names vsftpd uses for anonymous sessions.
const ANONYMOUS_LOGINS: [&str; 2] = ["anonymous", "ftp"];

fn flag(value: bool) -> &'static str {
    if value { "YES" } else { "NO" }
}

/// The share anonymous sessions land in, followed by any guest shares
/// that cannot be exposed alongside it.
#[must_use]
pub fn anonymous_shares(shares: &[Share]) -> (Option<&Share>, Vec<&Share>) {
    let mut guest_shares = shares.iter().filter(|s| s.is_guest_accessible());
    let root = guest_shares.next();
    (root, guest_shares.collect())
}

/// Render `vsftpd.conf`.
///
/// `anon_root` is where anonymous sessions land; without one they fall
/// back to the guest's home.
#[must_use]
pub fn render(
    layout: &Layout,
    guest: &ResolvedIdentity,
    access: &ChannelAccess,
    anon_root: Option<&Path>,
) -> String {
    let mut lines = vec![
        "listen=YES".to_string(),
        "background=NO".to_string(),
        "seccomp_sandbox=NO".to_string(),
        "setproctitle_enable=YES".to_string(),
        "force_dot_files=YES".to_string(),
        "xferlog_enable=YES".to_string(),
        "dual_log_enable=YES".to_string(),
        "log_ftp_protocol=NO".to_string(),
        format!("vsftpd_log_file={}", layout.vsftpd_log().display()),
        "ssl_enable=YES".to_string(),
        "allow_anon_ssl=YES".to_string(),
        "force_local_logins_ssl=NO".to_string(),
        "force_local_data_ssl=NO".to_string(),
        format!("rsa_cert_file={}", layout.ftp_certificate().display()),
        format!("rsa_private_key_file={}", layout.ftp_private_key().display()),
        format!("anonymous_enable={}", flag(access.guest)),
    ];
    if access.guest {
        lines.extend([
            "anon_upload_enable=NO".to_string(),
            "anon_mkdir_write_enable=NO".to_string(),
            "anon_other_write_enable=NO".to_string(),
            "anon_world_readable_only=YES".to_string(),
            "no_anon_password=YES".to_string(),
            format!(
                "anon_root={}",
                anon_root.map_or_else(|| layout.home(&guest.name), Path::to_path_buf).display()
            ),
            format!("ftp_username={}", guest.name),
        ]);
    }
    lines.push(format!("local_enable={}", flag(access.has_users())));
    if access.has_users() {
        lines.extend([
            "chroot_local_user=YES".to_string(),
            "allow_writeable_chroot=YES".to_string(),
            format!("write_enable={}", flag(access.writable)),
        ]);
    }
    lines.extend([
        "userlist_enable=YES".to_string(),
        "userlist_deny=NO".to_string(),
        format!("userlist_file={}", layout.vsftpd_user_list().display()),
    ]);
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Login names allowed by the user list, one per line.
#[must_use]
pub fn render_user_list(access: &ChannelAccess) -> String {
    let anonymous = access.guest.then_some(ANONYMOUS_LOGINS).into_iter().flatten();
    anonymous
        .chain(access.users.iter().map(String::as_str))
        .map(|name| format!("{name}\n"))
        .collect()
}

/// Bootstrap the TLS certificate, then write the vsftpd configuration.
///
/// # Errors
///
/// Returns an error if certificate generation fails, no guest is defined,
/// or a file cannot be written.
pub fn configure(shares: &[Share], ctx: &Context, state: &RuntimeState) -> Result<()> {
    let layout = &ctx.layout;
    ensure_resource(
        ctx,
        &TlsCertificate::new(
            layout.ftp_certificate(),
            layout.ftp_private_key(),
            &ctx.settings.hostname,
            ctx.executor.as_ref(),
            ctx.fs_ops.as_ref(),
        ),
    )?;

    let guest = state.guest()?;
    let access = ChannelAccess::of(shares, state);
    let (root, hidden) = anonymous_shares(shares);
    if let Some(root) = root
        && !hidden.is_empty()
    {
        let names: Vec<&str> = hidden.iter().map(|s| s.name.as_str()).collect();
        ctx.log.warn(&format!(
            "ftp: anonymous access is rooted at share {} ({}); guest shares {} are not exposed anonymously",
            root.name,
            root.path.display(),
            names.join(", ")
        ));
    }
    let conf = render(layout, guest, &access, root.map(|s| s.path.as_path()));
    ctx.write_file(&layout.vsftpd_conf(), &conf)?;
    ctx.write_file(&layout.vsftpd_user_list(), &render_user_list(&access))?;
    ctx.touch(&layout.vsftpd_log())?;
    Ok(())
}

/// Supervise vsftpd and follow its log file, where logins are reported.
///
/// # Errors
///
/// Returns an error if a process cannot be started.
pub fn start(ctx: &Context, supervisor: &mut Supervisor) -> Result<()> {
    let conf = ctx.layout.vsftpd_conf().display().to_string();
    let log = ctx.layout.vsftpd_log().display().to_string();
    supervisor.start(Channel::Ftp, VSFTPD, &[&conf])?;
    supervisor.start(Channel::Ftp, TAIL, &["-n", "+1", "-F", &log])
}
