//! Configuration document loading (JSON or TOML).
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::ConfigError;

/// Environment variable holding an inline JSON document when no file is given.
pub const CONFIG_ENV_VAR: &str = "CONFIG";

/// Load a configuration document from `path`.
///
/// Files ending in `.toml` are parsed as TOML; everything else as JSON.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read and
/// [`ConfigError::Parse`] if it does not match the expected shape.
pub fn load_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let origin = path.display().to_string();

    if path.extension().is_some_and(|ext| ext == "toml") {
        parse_toml(&content, &origin)
    } else {
        parse_json(&content, &origin)
    }
}

/// Load a JSON configuration document from the environment variable `var`.
///
/// # Errors
///
/// Returns [`ConfigError::Missing`] if the variable is unset or blank and
/// [`ConfigError::Parse`] if its contents do not parse.
pub fn load_env<T: DeserializeOwned>(var: &str) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(content) if !content.trim().is_empty() => parse_json(&content, &format!("${var}")),
        _ => Err(ConfigError::Missing(var.to_string())),
    }
}

/// Parse a JSON document, labelling errors with `origin`.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] on malformed input.
pub fn parse_json<T: DeserializeOwned>(content: &str, origin: &str) -> Result<T, ConfigError> {
    serde_json::from_str(content).map_err(|e| ConfigError::Parse {
        origin: origin.to_string(),
        message: e.to_string(),
    })
}

/// Parse a TOML document, labelling errors with `origin`.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] on malformed input.
pub fn parse_toml<T: DeserializeOwned>(content: &str, origin: &str) -> Result<T, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::Parse {
        origin: origin.to_string(),
        message: e.to_string(),
    })
}
