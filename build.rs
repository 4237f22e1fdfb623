//! Build script for gpg-fwd-doctor.
//!
//! Embeds git commit, build date and rustc version for `--version`.

use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=.git/HEAD");

    if let Some(hash) = get_git_hash() {
        println!("cargo:rustc-env=GPG_FWD_DOCTOR_GIT_HASH={}", hash);
    }

    if let Some(date) = get_build_date() {
        println!("cargo:rustc-env=GPG_FWD_DOCTOR_BUILD_DATE={}", date);
    }

    if let Some(version) = get_rustc_version() {
        println!("cargo:rustc-env=GPG_FWD_DOCTOR_RUSTC_VERSION={}", version);
    }
}

/// Run a command and return its trimmed stdout if it succeeded
fn command_stdout(program: &str, args: &[&str]) -> Option<String> {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Short hash of HEAD
fn get_git_hash() -> Option<String> {
    command_stdout("git", &["rev-parse", "--short", "HEAD"])
}

/// Build date in ISO 8601
fn get_build_date() -> Option<String> {
    command_stdout("date", &["-u", "+%Y-%m-%dT%H:%M:%SZ"])
}

/// "rustc 1.75.0 (...)" -> "1.75.0"
fn get_rustc_version() -> Option<String> {
    let rustc = std::env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    command_stdout(&rustc, &["--version"])
        .and_then(|s| s.split_whitespace().nth(1).map(|v| v.to_string()))
}
