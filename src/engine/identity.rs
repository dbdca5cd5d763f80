//! Handlers for the identity actions of a plan.
//!
//! These are the only code paths that extend [`RuntimeState`].
use anyhow::Result;

use super::{Context, apply_resource};
use crate::config::Group;
use crate::plan::ResolvedIdentity;
use crate::resources::account::{GroupAccount, UserAccount};
use crate::state::RuntimeState;

/// Create an OS group and record it.
///
/// # Errors
///
/// Returns an error if `addgroup` fails or the group was already recorded.
pub fn create_group(ctx: &Context, state: &mut RuntimeState, group: &Group) -> Result<()> {
    apply_resource(ctx, &GroupAccount::new(group, ctx.executor.as_ref()))?;
    state.add_group(group.clone())?;
    Ok(())
}

/// Create an OS user with home directory and password, then record it.
///
/// # Errors
///
/// Returns an error if any account command fails or the user was already recorded.
pub fn create_user(ctx: &Context, state: &mut RuntimeState, user: &ResolvedIdentity) -> Result<()> {
    let account = UserAccount::new(
        user,
        ctx.layout.home(&user.name),
        ctx.executor.as_ref(),
        ctx.fs_ops.as_ref(),
    );
    apply_resource(ctx, &account)?;
    state.add_user(user.clone())?;
    Ok(())
}

/// Record an identity that already exists on the host.
///
/// # Errors
///
/// Returns an error if the user was already recorded.
pub fn register_user(ctx: &Context, state: &mut RuntimeState, user: &ResolvedIdentity) -> Result<()> {
    ctx.log
        .debug(&format!("registering {} (uid {}) without an OS account", user.name, user.id));
    state.add_user(user.clone())?;
    Ok(())
}

/// Select the identity used for anonymous access.
///
/// # Errors
///
/// Returns an error if a guest was already defined or `name` is unknown.
pub fn define_guest(ctx: &Context, state: &mut RuntimeState, name: &str) -> Result<()> {
    state.define_guest(name)?;
    ctx.log.info(&format!("guest access maps to user {name}"));
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::*;
    use crate::config::{Config, HostSettings, Layout, Password};
    use crate::error::ExecutionError;
    use crate::logging::{Log, MemoryLog};
    use crate::operations::{FileSystemOps, MockFileSystemOps};
    use crate::resources::test_helpers::RecordingExecutor;

    fn context(exec: Arc<RecordingExecutor>, dry_run: bool) -> (Context, Arc<MockFileSystemOps>) {
        let fs = Arc::new(MockFileSystemOps::new());
        let ctx = Context::new(
            HostSettings::from_config(&Config::default(), "nas"),
            Layout::default(),
            Arc::new(MemoryLog::new()) as Arc<dyn Log>,
            exec,
            dry_run,
        )
        .with_fs_ops(Arc::clone(&fs) as Arc<dyn FileSystemOps>);
        (ctx, fs)
    }

    fn alice() -> ResolvedIdentity {
        ResolvedIdentity {
            name: "alice".to_string(),
            id: 5001,
            primary_group: "family".to_string(),
            secondary_groups: vec![],
            password: Some(Password::new("pw")),
        }
    }

    #[test]
    fn create_user_runs_commands_and_records_state() {
        let exec = Arc::new(RecordingExecutor::new());
        let (ctx, fs) = context(Arc::clone(&exec), false);
        let mut state = RuntimeState::new();
        create_user(&ctx, &mut state, &alice()).unwrap();
        assert_eq!(exec.calls()[0].program, "adduser");
        assert_eq!(fs.created_dirs(), vec![PathBuf::from("/home/alice")]);
        assert!(state.user("alice").is_some());
    }

    #[test]
    fn dry_run_records_state_without_commands() {
        let exec = Arc::new(RecordingExecutor::new());
        let (ctx, _) = context(Arc::clone(&exec), true);
        let mut state = RuntimeState::new();
        let group = Group {
            name: "family".to_string(),
            id: 5000,
        };
        create_group(&ctx, &mut state, &group).unwrap();
        create_user(&ctx, &mut state, &alice()).unwrap();
        assert!(exec.calls().is_empty());
        assert_eq!(state.groups().len(), 1);
        assert_eq!(state.users().len(), 1);
    }

    #[test]
    fn failed_command_leaves_state_untouched() {
        let exec = Arc::new(RecordingExecutor::new().failing("addgroup"));
        let (ctx, _) = context(exec, false);
        let mut state = RuntimeState::new();
        let group = Group {
            name: "family".to_string(),
            id: 5000,
        };
        assert!(create_group(&ctx, &mut state, &group).is_err());
        assert!(state.groups().is_empty());
    }

    #[test]
    fn define_guest_requires_registered_user() {
        let (ctx, _) = context(Arc::new(RecordingExecutor::new()), false);
        let mut state = RuntimeState::new();
        let err = define_guest(&ctx, &mut state, "nobody").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExecutionError>(),
            Some(ExecutionError::UnknownIdentity(name)) if name == "nobody"
        ));
        register_user(&ctx, &mut state, &ResolvedIdentity::synthetic_guest()).unwrap();
        define_guest(&ctx, &mut state, "nobody").unwrap();
        assert_eq!(state.guest_user(), Some("nobody"));
    }
}
