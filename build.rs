//! Stamps the binary with a version from the environment or `git describe`.
#![allow(clippy::print_stdout)]

use std::process::Command;

fn main() {
    // Prefer SHAREHOST_VERSION if set (e.g. by the image build), otherwise
    // fall back to git describe for local development builds.
    if let Ok(version) = std::env::var("SHAREHOST_VERSION") {
        println!("cargo:rustc-env=SHAREHOST_VERSION={version}");
    } else if let Ok(output) = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        && output.status.success()
    {
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        println!("cargo:rustc-env=SHAREHOST_VERSION={version}");
    }

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
    println!("cargo:rerun-if-env-changed=SHAREHOST_VERSION");
}
