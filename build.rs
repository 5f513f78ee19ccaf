//! Build script for barb: embeds a human-readable version string.
//!
//! `BUILD_INFO_HUMAN` is `<cargo version> (<git describe>) <rustc version>`.
//! When the checkout has no tags, the git part falls back to
//! `v<cargo version>-<commit time>-<short sha>`; outside a git checkout it
//! uses the build time instead.

use std::{env, process::Command};

use chrono::{DateTime, Utc};

fn main() {
    for path in ["src", "build.rs", "Cargo.toml"] {
        println!("cargo:rerun-if-changed={path}");
    }

    println!("cargo:rustc-env=BUILD_INFO_HUMAN={}", build_info());
}

fn run(program: &str, args: &[&str]) -> Option<String> {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn git_version() -> String {
    let pkg_version = env!("CARGO_PKG_VERSION");

    match run("git", &["describe", "--tags", "--always", "--dirty"]) {
        Some(desc) if desc.starts_with('v') || desc.contains("-g") => desc,
        Some(_) => {
            let sha = run("git", &["rev-parse", "--short=12", "HEAD"])
                .unwrap_or_else(|| "unknown".to_string());
            let committed = run("git", &["log", "-1", "--format=%ct"])
                .and_then(|s| s.parse::<i64>().ok())
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .unwrap_or_else(Utc::now);
            format!("v{pkg_version}-{}-{sha}", committed.format("%Y%m%d%H%M%S"))
        }
        None => format!("v{pkg_version}-{}", Utc::now().format("%Y%m%d%H%M%S")),
    }
}

fn build_info() -> String {
    let mut parts = vec![
        env!("CARGO_PKG_VERSION").to_string(),
        format!("({})", git_version()),
    ];
    if let Some(rustc) = env::var("RUSTC")
        .ok()
        .and_then(|rustc| run(&rustc, &["--version"]))
    {
        parts.push(rustc);
    }
    parts.join(" ")
}
