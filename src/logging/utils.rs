//! Helpers shared by the log layers: file locations, escape stripping, timestamps.
use std::path::PathBuf;

/// Environment variable overriding the log directory.
pub const LOG_DIR_ENV_VAR: &str = "SHAREHOST_LOG_DIR";

const TIME_FORMAT: &str = "%H:%M:%S";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Remove terminal escape sequences so the file log stays plain text.
///
/// CSI sequences (`ESC [ ... final`) are dropped up to their final byte in
/// `@`..=`~`; any other escape drops only the byte that follows it.
pub(super) fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\x1b' {
            out.push(c);
            continue;
        }
        if chars.next() == Some('[') {
            let _ = chars.by_ref().find(|c| ('@'..='~').contains(c));
        }
    }
    out
}

/// `$XDG_CACHE_HOME`, else `$HOME/.cache`, else `./.cache`.
fn cache_home() -> PathBuf {
    std::env::var_os("XDG_CACHE_HOME").map_or_else(
        || {
            std::env::var_os("HOME")
                .map_or_else(|| PathBuf::from("."), PathBuf::from)
                .join(".cache")
        },
        PathBuf::from,
    )
}

/// The log directory, created on demand.
///
/// `$SHAREHOST_LOG_DIR` wins over `<cache home>/sharehost`. Returns `None`
/// when the directory cannot be created; file logging is then disabled.
pub(super) fn log_dir() -> Option<PathBuf> {
    let dir = std::env::var_os(LOG_DIR_ENV_VAR)
        .map_or_else(|| cache_home().join("sharehost"), PathBuf::from);
    std::fs::create_dir_all(&dir).ok().map(|()| dir)
}

/// `<log dir>/<command>.log`.
pub(super) fn log_file_path(command: &str) -> Option<PathBuf> {
    log_dir().map(|dir| dir.join(format!("{command}.log")))
}

fn utc_now(format: &str) -> String {
    chrono::Utc::now().format(format).to_string()
}

/// Current UTC date and time for file log lines.
pub(super) fn format_utc_datetime() -> String {
    utc_now(DATETIME_FORMAT)
}

/// Current UTC time of day for console prefixes.
pub(super) fn format_utc_time() -> String {
    utc_now(TIME_FORMAT)
}
