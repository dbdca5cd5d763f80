//! Command: provision the host and supervise its daemons.
use std::sync::Arc;

use anyhow::{Context as _, Result};

use super::CommandSetup;
use crate::cli::GlobalOpts;
use crate::engine::{self, Context};
use crate::exec::SystemExecutor;
use crate::logging::{Log, Logger};
use crate::plan;

/// Exit status after an interrupt, as a shell would report SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Run the full lifecycle: load, compile, execute, then block until every
/// supervised daemon has exited.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or any plan action fails.
pub fn run(global: &GlobalOpts, log: &Arc<Logger>) -> Result<()> {
    let interrupt_log = Arc::clone(log);
    ctrlc::set_handler(move || {
        interrupt_log.warn("interrupted, shutting down");
        std::process::exit(INTERRUPTED_EXIT_CODE);
    })
    .context("installing interrupt handler")?;

    log.info(&format!("sharehost {}", super::version::version()));
    let setup = CommandSetup::init(global, log.as_ref())?;

    log.stage("Compiling plan");
    let plan = plan::compile(&setup.config, log.as_ref())?;
    log.info(&format!("{} action(s)", plan.len()));

    let ctx = Context::new(
        setup.settings,
        setup.layout,
        Arc::clone(log) as Arc<dyn Log>,
        Arc::new(SystemExecutor),
        global.dry_run,
    );
    let result = engine::run_plan(&plan, &ctx);
    log.print_summary();
    let outcome = result?;

    if outcome.supervisor.is_empty() {
        log.info("no daemons to supervise");
        return Ok(());
    }
    log.stage("Supervising daemons");
    log.info(&format!(
        "supervising {} daemon(s), guest access maps to {}",
        outcome.supervisor.len(),
        outcome.state.guest_user().unwrap_or("nobody")
    ));
    let exits = outcome.supervisor.wait();
    log.info(&format!("all {} daemon(s) exited", exits.len()));
    Ok(())
}
