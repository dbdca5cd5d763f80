//! Command: print the provisioning plan without applying it.
use anyhow::Result;

use super::CommandSetup;
use crate::cli::GlobalOpts;
use crate::logging::Log;
use crate::plan;

/// Compile the configuration and print the numbered plan to stdout.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or compiled.
#[allow(clippy::print_stdout)]
pub fn run(global: &GlobalOpts, log: &dyn Log) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    log.stage("Compiling plan");
    let plan = plan::compile(&setup.config, log)?;
    log.info(&format!("{} action(s)", plan.len()));
    print!("{plan}");
    Ok(())
}
