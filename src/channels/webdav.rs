//! Read-only WebDAV for guest-accessible shares, served by nginx.
use anyhow::Result;

use super::{Channel, Supervisor};
use crate::config::Share;
use crate::engine::Context;
use crate::plan::ResolvedIdentity;
use crate::state::RuntimeState;

const NGINX: &str = "nginx";
/// Daemons launched by [`start`].
pub const PROGRAMS: [&str; 1] = [NGINX];

fn location(share: &Share) -> String {
    let name = &share.name;
    format!(
        "        location /{name} {{
            dav_ext_methods PROPFIND OPTIONS;
            autoindex on;
            root {root};
            rewrite ^/{name}/(.*)$ /$1 break;
        }}
",
        root = share.path.display(),
    )
}

/// Render `nginx.conf`. Only guest-accessible shares get a location.
#[must_use]
pub fn render(guest: &ResolvedIdentity, shares: &[Share]) -> String {
    let mut out = format!(
        "user {user} {group};
worker_processes auto;
pcre_jit on;
error_log /dev/stderr warn;
include /etc/nginx/modules/*.conf;

events {{
    worker_connections 1024;
}}

http {{
    include /etc/nginx/mime.types;
    default_type application/octet-stream;
    server_tokens off;
    sendfile on;
    tcp_nopush on;
    log_format main '$remote_addr - $remote_user [$time_local] \"$request\" '
                    '$status $body_bytes_sent \"$http_referer\" '
                    '\"$http_user_agent\" \"$http_x_forwarded_for\"';
    access_log /dev/stdout main;

    server {{
        listen 80;
        client_max_body_size 0;
        charset utf-8;
        root /dev/null;
",
        user = guest.name,
        group = guest.primary_group,
    );
    for share in shares.iter().filter(|s| s.is_guest_accessible()) {
        out.push('\n');
        out.push_str(&location(share));
    }
    out.push_str("    }\n}\n");
    out
}

/// Write `nginx.conf` for the guest-accessible shares among `shares`.
///
/// # Errors
///
/// Returns an error if no guest is defined or the file cannot be written.
pub fn configure(shares: &[Share], ctx: &Context, state: &RuntimeState) -> Result<()> {
    for share in shares.iter().filter(|s| !s.is_guest_accessible()) {
        ctx.log
            .info(&format!("webdav: {} has no guest access, not exposed", share.name));
    }
    let conf = render(state.guest()?, shares);
    ctx.write_file(&ctx.layout.nginx_conf(), &conf)
}

/// Supervise nginx in the foreground.
///
/// # Errors
///
/// Returns an error if nginx cannot be started.
pub fn start(ctx: &Context, supervisor: &mut Supervisor) -> Result<()> {
    let conf = ctx.layout.nginx_conf().display().to_string();
    supervisor.start(Channel::Webdav, NGINX, &["-c", &conf, "-g", "daemon off;"])
}
