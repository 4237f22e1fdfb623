//! CLI integration tests.
//!
//! Argument handling of the built binary. None of these reach a real host.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;

fn doctor() -> Command {
    cargo_bin_cmd!("gpg-fwd-doctor")
}

#[test]
fn test_missing_host_is_usage_error() {
    doctor()
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_extra_argument_is_usage_error() {
    doctor()
        .args(["devbox", "other"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_option_like_host_rejected() {
    doctor()
        .args(["--", "-oProxyCommand=true"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not a host alias"));
}

#[test]
fn test_help() {
    doctor()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("<HOST>"))
        .stdout(predicate::str::contains("GPG_FWD_DOCTOR_SOCKET_DIR"));
}

#[test]
fn test_version_includes_build_info() {
    doctor()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")))
        .stdout(predicate::str::contains("Target: "));
}

#[test]
fn test_failing_ssh_still_completes() {
    let dir = tempfile::tempdir().unwrap();
    doctor()
        .arg("devbox")
        .env("GPG_FWD_DOCTOR_SSH", "false")
        .env("GPG_FWD_DOCTOR_SOCKET_DIR", dir.path().join("gnupg"))
        .env("NO_COLOR", "1")
        .assert()
        .success()
        .stdout(predicate::str::contains("== Local SSH configuration =="))
        .stdout(predicate::str::contains("== Remote checklist (interactive session) =="))
        .stdout(predicate::str::contains("== Interpretation guide =="))
        .stdout(predicate::str::contains("missing"));
}
