//! Read-only NFS exports for guest-accessible shares.
use anyhow::Result;

use super::{Channel, Supervisor};
use crate::config::Share;
use crate::engine::Context;
use crate::error::ExecutionError;
use crate::state::RuntimeState;

const RPCBIND: &str = "rpcbind";
const EXPORTFS: &str = "exportfs";
const NFSD: &str = "rpc.nfsd";
const MOUNTD: &str = "rpc.mountd";
/// Programs launched by [`start`].
pub const PROGRAMS: [&str; 4] = [RPCBIND, EXPORTFS, NFSD, MOUNTD];

/// Render `/etc/exports`: every client is squashed to the guest identity.
#[must_use]
pub fn render(shares: &[Share], uid: u32, gid: u32) -> String {
    shares
        .iter()
        .filter(|s| s.is_guest_accessible())
        .map(|s| {
            format!(
                "{} *(ro,no_subtree_check,all_squash,anonuid={uid},anongid={gid})\n",
                s.path.display()
            )
        })
        .collect()
}

/// Write the export table for the guest-accessible shares among `shares`.
///
/// # Errors
///
/// Returns an error if the guest or its primary group is unknown, or the
/// file cannot be written.
pub fn configure(shares: &[Share], ctx: &Context, state: &RuntimeState) -> Result<()> {
    let guest = state.guest()?;
    let gid = state
        .gid_of(&guest.primary_group)
        .ok_or_else(|| ExecutionError::UnknownIdentity(guest.primary_group.clone()))?;
    for share in shares.iter().filter(|s| !s.is_guest_accessible()) {
        ctx.log
            .info(&format!("nfs: {} has no guest access, not exported", share.name));
    }
    ctx.write_file(&ctx.layout.exports(), &render(shares, guest.id, gid))
}

/// Bring up the RPC services, publish the exports, then supervise `rpc.mountd`.
///
/// # Errors
///
/// Returns an error if an auxiliary service fails or mountd cannot be started.
pub fn start(ctx: &Context, supervisor: &mut Supervisor) -> Result<()> {
    ctx.log.debug("nfs: starting rpcbind and nfsd");
    supervisor.run_to_exit(Channel::Nfs, RPCBIND, &[])?;
    supervisor.run_to_exit(Channel::Nfs, EXPORTFS, &["-ra"])?;
    supervisor.run_to_exit(Channel::Nfs, NFSD, &[])?;
    supervisor.start(Channel::Nfs, MOUNTD, &["--foreground"])
}
