//! Stamps GIT_HASH, BUILD_TIMESTAMP and BUILD_PROFILE into the kq-qs binary
//! for `/build_info` and the startup banner.

use std::process::Command;

const UNKNOWN: &str = "unknown";

/// Trimmed stdout of a successful git invocation
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    Some(text.trim().to_string())
}

/// Short commit hash, suffixed with `-dirty` when the work tree has changes
fn commit_id() -> String {
    let Some(hash) = git(&["rev-parse", "--short=8", "HEAD"]) else {
        return UNKNOWN.to_string();
    };
    match git(&["status", "--porcelain", "--untracked-files=no"]) {
        Some(changes) if !changes.is_empty() => format!("{}-dirty", hash),
        _ => hash,
    }
}

fn set_env(key: &str, value: &str) {
    println!("cargo:rustc-env={}={}", key, value);
}

fn main() {
    set_env("GIT_HASH", &commit_id());
    set_env(
        "BUILD_TIMESTAMP",
        &chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
    );
    set_env(
        "BUILD_PROFILE",
        &std::env::var("PROFILE").unwrap_or_else(|_| UNKNOWN.to_string()),
    );
    // Without rerun-if-changed lines cargo reruns this on every build
}
