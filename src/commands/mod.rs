//! Top-level subcommand orchestration.
pub mod check;
pub mod plan;
pub mod run;
pub mod version;

use std::path::Path;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::config::{Config, HostSettings, Layout};
use crate::logging::Log;

/// Fallback host name when none is given or discoverable.
const DEFAULT_HOSTNAME: &str = "localhost";

/// Shared state produced by the common command setup sequence.
///
/// Encapsulates configuration loading, validation warnings and host
/// resolution so that each command does not have to repeat the boilerplate.
#[derive(Debug)]
pub struct CommandSetup {
    /// The loaded configuration document.
    pub config: Config,
    /// Host-wide settings derived from it.
    pub settings: HostSettings,
    /// Where artifacts are written.
    pub layout: Layout,
}

impl CommandSetup {
    /// Load the configuration, report its warnings, and resolve host settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is missing, unreadable, or malformed.
    pub fn init(global: &GlobalOpts, log: &dyn Log) -> Result<Self> {
        log.stage("Loading configuration");
        let config = Config::load(global.config.as_deref())?;

        log.info(&format!(
            "loaded {} users, {} groups, {} shares",
            config.users.len(),
            config.groups.len(),
            config.shares.len()
        ));

        let warnings = config.validate();
        if !warnings.is_empty() {
            log.warn(&format!(
                "found {} configuration warning(s):",
                warnings.len()
            ));
            for warning in &warnings {
                log.warn(&format!(
                    "  {} [{}]: {}",
                    warning.source, warning.item, warning.message
                ));
            }
        }

        let hostname = resolve_hostname(global.hostname.as_deref(), Path::new("/etc/hostname"));
        log.debug(&format!("hostname: {hostname}"));
        let settings = HostSettings::from_config(&config, hostname);

        Ok(Self {
            config,
            settings,
            layout: Layout::new(&global.root),
        })
    }
}

/// Pick the host name: explicit value, then `hostname_file`, then `localhost`.
#[must_use]
pub fn resolve_hostname(explicit: Option<&str>, hostname_file: &Path) -> String {
    explicit
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(String::from)
        .or_else(|| {
            std::fs::read_to_string(hostname_file)
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|h| !h.is_empty())
        })
        .unwrap_or_else(|| DEFAULT_HOSTNAME.to_string())
}
