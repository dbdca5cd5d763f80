//! Command: validate the configuration without side effects.
use anyhow::Result;

use super::CommandSetup;
use crate::cli::GlobalOpts;
use crate::logging::Log;
use crate::plan;

/// Load and compile the configuration, reporting warnings along the way.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or compiled.
pub fn run(global: &GlobalOpts, log: &dyn Log) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    log.stage("Compiling plan");
    let plan = plan::compile(&setup.config, log)?;
    let channels: Vec<String> = plan
        .started_channels()
        .iter()
        .map(ToString::to_string)
        .collect();
    log.info(&format!(
        "configuration is valid: {} action(s), channels: {}",
        plan.len(),
        if channels.is_empty() {
            "none".to_string()
        } else {
            channels.join(", ")
        }
    ));
    Ok(())
}
