//! Command: print version information.

/// Version reported by the binary: the build-time tag if any, else the crate version.
#[must_use]
pub fn version() -> &'static str {
    option_env!("SHAREHOST_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Print the sharehost version to stdout.
#[allow(clippy::print_stdout)]
pub fn run() {
    println!("sharehost {}", version());
}
