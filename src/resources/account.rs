//! OS account resources: groups, users, and SMB credentials.
use std::path::PathBuf;

use anyhow::{Context as _, Result};

use super::{Applicable, ResourceChange};
use crate::config::{Group, Password};
use crate::error::ExecutionError;
use crate::exec::Executor;
use crate::operations::FileSystemOps;
use crate::plan::ResolvedIdentity;

/// Password prompt input: the value followed by its confirmation.
fn confirmed(password: &Password) -> String {
    let value = password.expose();
    format!("{value}\n{value}\n")
}

/// A system group created with `addgroup`.
#[derive(Debug)]
pub struct GroupAccount<'a> {
    group: &'a Group,
    executor: &'a dyn Executor,
}

impl<'a> GroupAccount<'a> {
    /// Create `group` on the host.
    #[must_use]
    pub const fn new(group: &'a Group, executor: &'a dyn Executor) -> Self {
        Self { group, executor }
    }
}

impl Applicable for GroupAccount<'_> {
    fn description(&self) -> String {
        format!("group {} (gid {})", self.group.name, self.group.id)
    }

    fn apply(&self) -> Result<ResourceChange> {
        let gid = self.group.id.to_string();
        self.executor
            .run("addgroup", &["-g", &gid, "-S", &self.group.name])?;
        Ok(ResourceChange::Applied)
    }
}

/// A system user with its group memberships, home directory and password.
#[derive(Debug)]
pub struct UserAccount<'a> {
    user: &'a ResolvedIdentity,
    home: PathBuf,
    executor: &'a dyn Executor,
    fs_ops: &'a dyn FileSystemOps,
}

impl<'a> UserAccount<'a> {
    /// Create `user` with its home directory at `home`.
    #[must_use]
    pub const fn new(
        user: &'a ResolvedIdentity,
        home: PathBuf,
        executor: &'a dyn Executor,
        fs_ops: &'a dyn FileSystemOps,
    ) -> Self {
        Self {
            user,
            home,
            executor,
            fs_ops,
        }
    }
}

impl Applicable for UserAccount<'_> {
    fn description(&self) -> String {
        format!("user {} (uid {})", self.user.name, self.user.id)
    }

    fn apply(&self) -> Result<ResourceChange> {
        let name = self.user.name.as_str();
        let uid = self.user.id.to_string();
        self.executor.run(
            "adduser",
            &["-u", &uid, "-G", &self.user.primary_group, "-S", "-H", "-D", name],
        )?;

        for group in &self.user.secondary_groups {
            self.executor
                .run("addgroup", &[name, group])
                .with_context(|| format!("adding {name} to group {group}"))?;
        }

        self.fs_ops
            .create_dir_all(&self.home)
            .map_err(|source| ExecutionError::Io {
                path: self.home.display().to_string(),
                source,
            })?;

        match &self.user.password {
            Some(password) => {
                self.executor
                    .run_with_input("passwd", &[name], &confirmed(password))?;
            }
            None => {
                self.executor.run("passwd", &["-d", name])?;
            }
        }
        Ok(ResourceChange::Applied)
    }
}

/// An entry in the Samba password database.
#[derive(Debug)]
pub struct SmbCredential<'a> {
    user: &'a ResolvedIdentity,
    executor: &'a dyn Executor,
}

impl<'a> SmbCredential<'a> {
    /// Register `user` with Samba's password database.
    #[must_use]
    pub const fn new(user: &'a ResolvedIdentity, executor: &'a dyn Executor) -> Self {
        Self { user, executor }
    }
}

impl Applicable for SmbCredential<'_> {
    fn description(&self) -> String {
        format!("smb credentials for {}", self.user.name)
    }

    fn apply(&self) -> Result<ResourceChange> {
        let Some(password) = &self.user.password else {
            return Ok(ResourceChange::Skipped {
                reason: "user has no password".to_string(),
            });
        };
        self.executor
            .run_with_input("smbpasswd", &["-s", "-a", &self.user.name], &confirmed(password))?;
        Ok(ResourceChange::Applied)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::operations::MockFileSystemOps;
    use crate::resources::test_helpers::RecordingExecutor;
    use std::path::Path;

    fn alice(password: Option<&str>) -> ResolvedIdentity {
        ResolvedIdentity {
            name: "alice".to_string(),
            id: 5001,
            primary_group: "family".to_string(),
            secondary_groups: vec!["media".to_string(), "backup".to_string()],
            password: password.map(Password::new),
        }
    }

    #[test]
    fn group_account_runs_addgroup() {
        let exec = RecordingExecutor::new();
        let group = Group {
            name: "family".to_string(),
            id: 5000,
        };
        let change = GroupAccount::new(&group, &exec).apply().unwrap();
        assert_eq!(change, ResourceChange::Applied);
        assert_eq!(exec.command_lines(), vec!["addgroup -g 5000 -S family"]);
    }

    #[test]
    fn user_account_creates_account_groups_home_and_password() {
        let exec = RecordingExecutor::new();
        let fs = MockFileSystemOps::new();
        let user = alice(Some("s3cret"));
        UserAccount::new(&user, PathBuf::from("/home/alice"), &exec, &fs)
            .apply()
            .unwrap();
        assert_eq!(
            exec.command_lines(),
            vec![
                "adduser -u 5001 -G family -S -H -D alice",
                "addgroup alice media",
                "addgroup alice backup",
                "passwd alice",
            ]
        );
        assert_eq!(exec.calls()[3].input.as_deref(), Some("s3cret\ns3cret\n"));
        assert_eq!(fs.created_dirs(), vec![PathBuf::from("/home/alice")]);
    }

    #[test]
    fn passwordless_user_gets_password_deleted() {
        let exec = RecordingExecutor::new();
        let fs = MockFileSystemOps::new();
        let user = alice(None);
        UserAccount::new(&user, PathBuf::from("/home/alice"), &exec, &fs)
            .apply()
            .unwrap();
        assert_eq!(exec.command_lines().last().unwrap(), "passwd -d alice");
    }

    #[test]
    fn adduser_failure_stops_before_home_creation() {
        let exec = RecordingExecutor::new().failing("adduser");
        let fs = MockFileSystemOps::new();
        let user = alice(None);
        assert!(
            UserAccount::new(&user, PathBuf::from("/home/alice"), &exec, &fs)
                .apply()
                .is_err()
        );
        assert!(!fs.exists(Path::new("/home/alice")));
        assert_eq!(exec.calls().len(), 1);
    }

    #[test]
    fn smb_credential_pipes_password_twice() {
        let exec = RecordingExecutor::new();
        let user = alice(Some("pw"));
        SmbCredential::new(&user, &exec).apply().unwrap();
        let call = &exec.calls()[0];
        assert_eq!(call.command_line(), "smbpasswd -s -a alice");
        assert_eq!(call.input.as_deref(), Some("pw\npw\n"));
    }

    #[test]
    fn smb_credential_skips_passwordless_user() {
        let exec = RecordingExecutor::new();
        let user = alice(None);
        let change = SmbCredential::new(&user, &exec).apply().unwrap();
        assert!(matches!(change, ResourceChange::Skipped { .. }));
        assert!(exec.calls().is_empty());
    }
}
