//! Stamps `METABASE_CLI_VERSION` for `metabase --version`.
//!
//! Release builds can pin the string with `METABASE_CLI_BUILD_VERSION`.
//! Otherwise a tagged checkout reports its tag and an untagged one reports
//! the package version with the short commit appended.

use std::process::Command;

const OVERRIDE: &str = "METABASE_CLI_BUILD_VERSION";

fn main() {
    println!("cargo:rerun-if-env-changed={OVERRIDE}");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");

    let package = env!("CARGO_PKG_VERSION");
    let version = std::env::var(OVERRIDE)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| describe().map(|d| stamp(package, &d)))
        .unwrap_or_else(|| package.to_string());

    println!("cargo:rustc-env=METABASE_CLI_VERSION={version}");
}

/// `git describe` output, e.g. `v0.2.0-3-g1a2b3c4-dirty` or `1a2b3c4`.
fn describe() -> Option<String> {
    let out = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let text = String::from_utf8(out.stdout).ok()?;
    Some(text.trim().to_string()).filter(|t| !t.is_empty())
}

fn stamp(package: &str, described: &str) -> String {
    match described.strip_prefix('v') {
        Some(tagged) if tagged.starts_with(|c: char| c.is_ascii_digit()) => tagged.to_string(),
        _ => format!("{package}+g{described}"),
    }
}
