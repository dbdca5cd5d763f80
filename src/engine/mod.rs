//! Sequential plan execution.
//!
//! Actions run strictly in plan order. The first failing action aborts the
//! remaining plan; nothing already applied is rolled back.
mod context;
pub mod identity;

use anyhow::{Context as _, Result};

pub use context::Context;

use crate::channels::{self, Supervisor};
use crate::logging::ActionStatus;
use crate::plan::{Plan, PlanAction};
use crate::resources::{Applicable, Resource, ResourceChange, ResourceError, ResourceState};
use crate::state::RuntimeState;

/// What a completed plan leaves behind.
#[derive(Debug)]
pub struct Outcome {
    /// Identities provisioned by the plan.
    pub state: RuntimeState,
    /// Daemons started by the plan, still running.
    pub supervisor: Supervisor,
}

/// Execute every action of `plan` in order.
///
/// # Errors
///
/// Returns the first action failure, with the action in its context.
pub fn run_plan(plan: &Plan, ctx: &Context) -> Result<Outcome> {
    let mut state = RuntimeState::new();
    let mut supervisor = Supervisor::new(
        std::sync::Arc::clone(&ctx.log),
        std::sync::Arc::clone(&ctx.executor),
        ctx.dry_run,
    );

    for (index, action) in plan.iter().enumerate() {
        let name = action.to_string();
        ctx.log.stage(&name);
        match execute(action, ctx, &mut state, &mut supervisor) {
            Ok(()) => {
                let status = if ctx.dry_run {
                    ActionStatus::DryRun
                } else {
                    ActionStatus::Ok
                };
                ctx.log.record_action(&name, status, None);
            }
            Err(e) => {
                ctx.log.error(&format!("{name}: {e:#}"));
                ctx.log
                    .record_action(&name, ActionStatus::Failed, Some(&format!("{e:#}")));
                return Err(e).with_context(|| {
                    format!("action {} of {} ({}) failed", index + 1, plan.len(), action.kind())
                });
            }
        }
    }

    Ok(Outcome { state, supervisor })
}

fn execute(
    action: &PlanAction,
    ctx: &Context,
    state: &mut RuntimeState,
    supervisor: &mut Supervisor,
) -> Result<()> {
    match action {
        PlanAction::CreateGroup(group) => identity::create_group(ctx, state, group),
        PlanAction::CreateUser(user) => identity::create_user(ctx, state, user),
        PlanAction::RegisterUser(user) => identity::register_user(ctx, state, user),
        PlanAction::DefineGuestUser(name) => identity::define_guest(ctx, state, name),
        PlanAction::ConfigureChannel { channel, shares } => {
            channels::configure(*channel, shares, ctx, state)
        }
        PlanAction::StartChannel(channel) => channels::start(*channel, ctx, supervisor),
    }
}

/// Apply `resource`, or only describe it in dry-run mode.
///
/// # Errors
///
/// Propagates the resource's apply error.
pub fn apply_resource(ctx: &Context, resource: &dyn Applicable) -> Result<ResourceChange> {
    let description = resource.description();
    if ctx.dry_run {
        ctx.log.dry_run(&format!("would apply {description}"));
        return Ok(ResourceChange::Skipped {
            reason: "dry run".to_string(),
        });
    }
    let change = resource
        .apply()
        .with_context(|| format!("applying {description}"))?;
    match &change {
        ResourceChange::Applied => ctx.log.debug(&format!("{description}: applied")),
        ResourceChange::AlreadyCorrect => {
            ctx.log.debug(&format!("{description}: already correct"));
        }
        ResourceChange::Skipped { reason } => {
            ctx.log.warn(&format!("{description}: skipped ({reason})"));
        }
    }
    Ok(change)
}

/// Apply `resource` only when it is missing.
///
/// # Errors
///
/// Returns [`ResourceError::InvalidState`] when the resource cannot be
/// applied in place, or the apply error.
pub fn ensure_resource(ctx: &Context, resource: &dyn Resource) -> Result<ResourceChange> {
    match resource.current_state()? {
        ResourceState::Correct => {
            ctx.log
                .debug(&format!("{}: already present", resource.description()));
            Ok(ResourceChange::AlreadyCorrect)
        }
        ResourceState::Invalid { reason } => Err(ResourceError::InvalidState {
            resource: resource.description(),
            reason,
        }
        .into()),
        ResourceState::Missing => apply_resource(ctx, resource),
    }
}
