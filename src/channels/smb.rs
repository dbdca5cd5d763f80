//! SMB via Samba: `smb.conf` rendering, credential registration, `nmbd`/`smbd`.
use std::fmt;
use std::path::Path;

use anyhow::Result;

use super::access::{ShareAccess, referenced_users};
use super::{Channel, Supervisor};
use crate::config::{HostSettings, Share};
use crate::engine::{Context, apply_resource};
use crate::error::ExecutionError;
use crate::resources::account::SmbCredential;
use crate::state::RuntimeState;

const NMBD: &str = "nmbd";
const SMBD: &str = "smbd";
/// Daemons launched by [`start`].
pub const PROGRAMS: [&str; 2] = [NMBD, SMBD];

const DEFAULT_CREATE_MASK: &str = "0640";
const DEFAULT_DIRECTORY_MASK: &str = "0750";
const DEFAULT_RECYCLE_DIRECTORY_MODE: &str = "0750";

/// One `[share]` section of `smb.conf`.
///
/// Attributes keep a fixed order; unset options and empty lists are
/// omitted rather than rendered blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareSection {
    /// Section header.
    pub name: String,
    /// Shared directory.
    pub path: String,
    /// `key = value` lines in render order.
    pub attributes: Vec<(&'static str, String)>,
}

fn yes_no(value: bool) -> String {
    if value { "yes" } else { "no" }.to_string()
}

fn joined<T: ToString>(items: &[T]) -> Option<String> {
    (!items.is_empty()).then(|| {
        items
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    })
}

impl ShareSection {
    /// Build the section for `share`.
    #[must_use]
    pub fn from_share(share: &Share) -> Self {
        let access = ShareAccess::of(share);
        let masks = share.u_masks.clone().unwrap_or_default();
        let recycle = share.recycle_repository();

        let optional: [(&'static str, Option<String>); 12] = [
            ("available", Some(yes_no(access.available()))),
            ("guest ok", Some(yes_no(access.guest))),
            ("browseable", Some(yes_no(share.visible))),
            // Write access is granted per principal through `write list`.
            ("writable", Some(yes_no(false))),
            ("valid users", joined(&access.valid)),
            ("write list", joined(&access.writers)),
            ("vfs objects", recycle.map(|_| "recycle".to_string())),
            (
                "create mask",
                Some(
                    masks
                        .allowed_for_files
                        .clone()
                        .unwrap_or_else(|| DEFAULT_CREATE_MASK.to_string()),
                ),
            ),
            (
                "directory mask",
                Some(
                    masks
                        .allowed_for_dirs
                        .clone()
                        .unwrap_or_else(|| DEFAULT_DIRECTORY_MASK.to_string()),
                ),
            ),
            ("force create mode", masks.forced_for_files.clone()),
            ("force directory mode", masks.forced_for_dirs.clone()),
            ("guest only", access.guest_only().then(|| yes_no(true))),
        ];
        let mut attributes: Vec<(&'static str, String)> = optional
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key, v)))
            .collect();

        if let Some(repository) = recycle {
            attributes.extend([
                ("recycle:repository", repository.to_string()),
                ("recycle:keeptree", yes_no(true)),
                ("recycle:versions", yes_no(true)),
                (
                    "recycle:directory_mode",
                    masks
                        .recycle_dir
                        .unwrap_or_else(|| DEFAULT_RECYCLE_DIRECTORY_MODE.to_string()),
                ),
            ]);
        }

        Self {
            name: share.name.clone(),
            path: share.path.display().to_string(),
            attributes,
        }
    }

    /// Value of `key`, if rendered.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for ShareSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}]", self.name)?;
        writeln!(f, "path = \"{}\"", self.path)?;
        for (key, value) in &self.attributes {
            writeln!(f, "{key} = {value}")?;
        }
        Ok(())
    }
}

/// `smb encrypt` value: only an explicit `false` turns encryption off.
fn encrypt_mode(encryption: Option<bool>) -> &'static str {
    match encryption {
        Some(false) => "off",
        None | Some(true) => "default",
    }
}

/// Render the whole `smb.conf`.
#[must_use]
pub fn render(settings: &HostSettings, guest: &str, log_file: &Path, shares: &[Share]) -> String {
    let hostname = &settings.hostname;
    let mut out = format!(
        "; https://www.samba.org/samba/docs/current/man-html/smb.conf.5.html

[global]
server role = standalone server
security = user
load printers = no
printing = bsd
printcap name = /dev/null
disable spoolss = yes
map to guest = never
socket options = TCP_NODELAY IPTOS_LOWDELAY SO_RCVBUF=65536 SO_SNDBUF=65536 SO_KEEPALIVE
local master = no
dns proxy = no
deadtime = 15
log level = 1 auth_json_audit:3
max log size = 10
log file = {log_file}
min protocol = SMB3
restrict anonymous = 2

netbios name = {hostname}
server string = {hostname}
guest account = {guest}
browse list = {browse}
workgroup = {workgroup}
smb encrypt = {encrypt}

[ipc$]
path = \"/dev/null\"
available = no
",
        log_file = log_file.display(),
        browse = yes_no(settings.visible),
        workgroup = settings.workgroup,
        encrypt = encrypt_mode(settings.encryption),
    );
    for share in shares {
        out.push('\n');
        out.push_str(&ShareSection::from_share(share).to_string());
    }
    out
}

/// Register SMB credentials for directly referenced users, then write `smb.conf`.
///
/// # Errors
///
/// Returns an error if a referenced user was never provisioned, `smbpasswd`
/// fails, or the configuration cannot be written.
pub fn configure(shares: &[Share], ctx: &Context, state: &RuntimeState) -> Result<()> {
    for name in referenced_users(shares) {
        let user = state
            .user(name)
            .ok_or_else(|| ExecutionError::UnknownIdentity(name.to_string()))?;
        apply_resource(ctx, &SmbCredential::new(user, ctx.executor.as_ref()))?;
    }

    let guest = state.guest()?;
    let log_dir = ctx.layout.samba_log_dir();
    ctx.ensure_dir(&log_dir)?;
    let conf = render(&ctx.settings, &guest.name, &log_dir.join("log.smbd"), shares);
    ctx.write_file(&ctx.layout.smb_conf(), &conf)?;
    ctx.log
        .info(&format!("smb: {} share(s) configured", shares.len()));
    Ok(())
}

/// Run `nmbd` to completion, then supervise `smbd` in the foreground.
///
/// # Errors
///
/// Returns an error if `nmbd` fails or `smbd` cannot be started.
pub fn start(ctx: &Context, supervisor: &mut Supervisor) -> Result<()> {
    let configfile = format!("--configfile={}", ctx.layout.smb_conf().display());
    supervisor.run_to_exit(Channel::Smb, NMBD, &["-D", &configfile])?;
    supervisor.start(
        Channel::Smb,
        SMBD,
        &["--debug-stdout", "-F", "--no-process-group", &configfile],
    )
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{Config, Layout, Password};
    use crate::logging::{Log, MemoryLog};
    use crate::operations::{FileSystemOps, MockFileSystemOps};
    use crate::plan::ResolvedIdentity;
    use crate::resources::test_helpers::RecordingExecutor;

    fn share(json: &str) -> Share {
        serde_json::from_str(json).unwrap()
    }

    fn settings(encryption: Option<bool>) -> HostSettings {
        HostSettings {
            hostname: "nas".to_string(),
            workgroup: "WORKGROUP".to_string(),
            visible: false,
            encryption,
        }
    }

    #[test]
    fn user_rw_share_lists_user_in_valid_users_and_write_list() {
        let section = ShareSection::from_share(&share(
            r#"{"name":"docs","path":"/data/docs","permissions":[{"mode":"rw","users":["alice"]}]}"#,
        ));
        assert_eq!(section.get("available"), Some("yes"));
        assert_eq!(section.get("guest ok"), Some("no"));
        assert_eq!(section.get("valid users"), Some("alice"));
        assert_eq!(section.get("write list"), Some("alice"));
        assert_eq!(section.get("guest only"), None);
    }

    #[test]
    fn guest_only_share() {
        let section = ShareSection::from_share(&share(
            r#"{"name":"public","path":"/data/public","permissions":[{"mode":"ro","guest":true}]}"#,
        ));
        assert_eq!(section.get("guest ok"), Some("yes"));
        assert_eq!(section.get("guest only"), Some("yes"));
        assert_eq!(section.get("valid users"), None);
        assert_eq!(section.get("write list"), None);
    }

    #[test]
    fn groups_are_prefixed_and_mixed_with_users_in_order() {
        let section = ShareSection::from_share(&share(
            r#"{"name":"m","path":"/m","visible":true,"permissions":[
                {"mode":"ro","groups":["family"]},
                {"mode":"rw","users":["alice"],"groups":["admins"]}]}"#,
        ));
        assert_eq!(section.get("browseable"), Some("yes"));
        assert_eq!(section.get("valid users"), Some("@family,alice,@admins"));
        assert_eq!(section.get("write list"), Some("alice,@admins"));
    }

    #[test]
    fn masks_override_defaults_and_forced_modes_appear_only_when_set() {
        let plain = ShareSection::from_share(&share(r#"{"name":"a","path":"/a"}"#));
        assert_eq!(plain.get("create mask"), Some("0640"));
        assert_eq!(plain.get("directory mask"), Some("0750"));
        assert_eq!(plain.get("force create mode"), None);
        assert_eq!(plain.get("available"), Some("no"));

        let masked = ShareSection::from_share(&share(
            r#"{"name":"b","path":"/b","uMasks":{"allowedForFiles":"0660","forcedForDirs":"0770","recycleDir":"0700"}}"#,
        ));
        assert_eq!(masked.get("create mask"), Some("0660"));
        assert_eq!(masked.get("force directory mode"), Some("0770"));
        assert_eq!(masked.get("recycle:directory_mode"), Some("0700"));
    }

    #[test]
    fn recycle_can_be_disabled_or_relocated() {
        let off = ShareSection::from_share(&share(r#"{"name":"a","path":"/a","recycle":false}"#));
        assert_eq!(off.get("vfs objects"), None);
        assert_eq!(off.get("recycle:repository"), None);

        let moved = ShareSection::from_share(&share(
            r#"{"name":"a","path":"/a","recycle":{"path":".trash"}}"#,
        ));
        assert_eq!(moved.get("vfs objects"), Some("recycle"));
        assert_eq!(moved.get("recycle:repository"), Some(".trash"));
        assert_eq!(moved.get("recycle:keeptree"), Some("yes"));
    }

    #[test]
    fn section_renders_in_fixed_order() {
        let section = ShareSection::from_share(&share(
            r#"{"name":"docs","path":"/data/docs","permissions":[{"mode":"ro","users":["bob"]}]}"#,
        ));
        assert_eq!(
            section.to_string(),
            "[docs]\npath = \"/data/docs\"\navailable = yes\nguest ok = no\nbrowseable = no\n\
             writable = no\nvalid users = bob\nvfs objects = recycle\ncreate mask = 0640\n\
             directory mask = 0750\nrecycle:repository = .bin\nrecycle:keeptree = yes\n\
             recycle:versions = yes\nrecycle:directory_mode = 0750\n"
        );
    }

    #[test]
    fn encryption_mapping() {
        assert_eq!(encrypt_mode(None), "default");
        assert_eq!(encrypt_mode(Some(true)), "default");
        assert_eq!(encrypt_mode(Some(false)), "off");
    }

    #[test]
    fn render_is_idempotent_and_contains_global_settings() {
        let shares = vec![share(r#"{"name":"docs","path":"/data/docs"}"#)];
        let log = Path::new("/var/log/samba/log.smbd");
        let first = render(&settings(Some(false)), "nobody", log, &shares);
        let second = render(&settings(Some(false)), "nobody", log, &shares);
        assert_eq!(first, second);
        assert!(first.contains("netbios name = nas\n"));
        assert!(first.contains("guest account = nobody\n"));
        assert!(first.contains("smb encrypt = off\n"));
        assert!(first.contains("log file = /var/log/samba/log.smbd\n"));
        assert!(first.contains("[ipc$]\npath = \"/dev/null\"\navailable = no\n"));
        assert!(first.ends_with("recycle:directory_mode = 0750\n"));
    }

    fn state_with_alice(password: Option<&str>) -> RuntimeState {
        let mut state = RuntimeState::new();
        state
            .add_user(ResolvedIdentity {
                name: "alice".to_string(),
                id: 5001,
                primary_group: "family".to_string(),
                secondary_groups: vec![],
                password: password.map(Password::new),
            })
            .unwrap();
        state.add_user(ResolvedIdentity::synthetic_guest()).unwrap();
        state.define_guest("nobody").unwrap();
        state
    }

    fn context(exec: &Arc<RecordingExecutor>) -> (Context, Arc<MockFileSystemOps>, Arc<MemoryLog>) {
        let fs = Arc::new(MockFileSystemOps::new());
        let log = Arc::new(MemoryLog::new());
        let ctx = Context::new(
            HostSettings::from_config(&Config::default(), "nas"),
            Layout::default(),
            Arc::clone(&log) as Arc<dyn Log>,
            Arc::clone(exec) as Arc<dyn crate::exec::Executor>,
            false,
        )
        .with_fs_ops(Arc::clone(&fs) as Arc<dyn FileSystemOps>);
        (ctx, fs, log)
    }

    #[test]
    fn configure_registers_credentials_then_writes_conf() {
        let exec = Arc::new(RecordingExecutor::new());
        let (ctx, fs, _) = context(&exec);
        let shares = vec![share(
            r#"{"name":"docs","path":"/data/docs","permissions":[{"mode":"rw","users":["alice"]}]}"#,
        )];
        configure(&shares, &ctx, &state_with_alice(Some("pw"))).unwrap();
        let calls = exec.calls();
        assert_eq!(calls[0].command_line(), "smbpasswd -s -a alice");
        assert_eq!(calls[0].input.as_deref(), Some("pw\npw\n"));
        let conf = fs.file(Path::new("/etc/samba/smb.conf")).unwrap();
        assert!(conf.contains("[docs]\n"));
        assert!(conf.contains("valid users = alice\n"));
    }

    #[test]
    fn passwordless_user_is_skipped_with_warning() {
        let exec = Arc::new(RecordingExecutor::new());
        let (ctx, _, log) = context(&exec);
        let shares = vec![share(
            r#"{"name":"docs","path":"/d","permissions":[{"mode":"ro","users":["alice"]}]}"#,
        )];
        configure(&shares, &ctx, &state_with_alice(None)).unwrap();
        assert!(exec.calls().is_empty());
        assert!(log.warnings().iter().any(|w| w.contains("smb credentials for alice")));
    }

    #[test]
    fn unprovisioned_user_is_an_error() {
        let exec = Arc::new(RecordingExecutor::new());
        let (ctx, _, _) = context(&exec);
        let shares = vec![share(
            r#"{"name":"docs","path":"/d","permissions":[{"mode":"ro","users":["carol"]}]}"#,
        )];
        let err = configure(&shares, &ctx, &state_with_alice(None)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExecutionError>(),
            Some(ExecutionError::UnknownIdentity(name)) if name == "carol"
        ));
    }

    #[test]
    fn start_runs_nmbd_before_smbd() {
        let exec = Arc::new(RecordingExecutor::new());
        let (ctx, _, _) = context(&exec);
        let mut supervisor = Supervisor::new(
            Arc::clone(&ctx.log),
            Arc::clone(&ctx.executor),
            false,
        );
        start(&ctx, &mut supervisor).unwrap();
        let programs: Vec<String> = exec.calls().into_iter().map(|c| c.program).collect();
        assert_eq!(programs, vec!["nmbd", "smbd"]);
        assert_eq!(supervisor.len(), 1);
        let exits = supervisor.wait();
        assert_eq!(exits[0].daemon, "smbd");
    }
}
