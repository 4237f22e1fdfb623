//! Full diagnostic runs through the scripted runner.

use std::io::{self, Write};
use std::os::unix::net::UnixListener;
use std::path::Path;

use gpg_fwd_doctor::cli::guide::INTERPRETATION_GUIDE;
use gpg_fwd_doctor::engine::result::DiagnosticReport;
use gpg_fwd_doctor::{run_diagnostics, CheckResult, DoctorConfig, DoctorError, Section};
use tempfile::TempDir;

use crate::mocks::ScriptedRunner;

fn config_in(socket_dir: &Path) -> DoctorConfig {
    let mut config = DoctorConfig::new("devbox");
    config.socket_dir = socket_dir.to_path_buf();
    config
}

/// Socket directory with real listening sockets for `present`
fn socket_dir(present: &[&str]) -> (TempDir, Vec<UnixListener>) {
    let dir = tempfile::tempdir().unwrap();
    let listeners = present
        .iter()
        .map(|name| UnixListener::bind(dir.path().join(name)).unwrap())
        .collect();
    (dir, listeners)
}

fn run(config: &DoctorConfig, runner: &ScriptedRunner) -> (DiagnosticReport, String) {
    let mut out = Vec::new();
    let report = run_diagnostics(config, runner, &mut out).unwrap();
    (report, String::from_utf8(out).unwrap())
}

fn result(report: &DiagnosticReport, id: &str) -> CheckResult {
    report
        .find(id)
        .and_then(|c| c.result.clone())
        .unwrap_or_else(|| panic!("{} not recorded", id))
}

#[test]
fn test_headers_printed_once_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let (_, output) = run(&config_in(&dir.path().join("gnupg")), &ScriptedRunner::new());

    let mut headers: Vec<String> = Section::ALL
        .iter()
        .map(|s| format!("== {} ==", s.title()))
        .collect();
    headers.push("== Interpretation guide ==".to_string());

    let mut last = 0;
    for header in &headers {
        assert_eq!(output.matches(header.as_str()).count(), 1, "{}", header);
        let pos = output.find(header.as_str()).unwrap();
        assert!(pos >= last, "{} out of order", header);
        last = pos;
    }
}

#[test]
fn test_healthy_setup() {
    let (dir, _listeners) = socket_dir(&[
        "S.gpg-agent",
        "S.gpg-agent.extra",
        "S.gpg-agent.ssh",
        "S.gpg-agent.browser",
    ]);
    let runner = ScriptedRunner::healthy("devbox");
    let (report, output) = run(&config_in(dir.path()), &runner);

    let summary = report.summary();
    assert_eq!(summary.failed, 0, "{}", output);
    assert_eq!(summary.warned, 1, "{}", output);
    assert!(result(&report, "GPG-003").is_warn());

    assert!(result(&report, "SSH-003").is_pass());
    assert!(result(&report, "SSH-004").is_pass());
    assert!(result(&report, "GPG-010").message().contains("2.4.4"));
    assert!(result(&report, "REM-001").is_pass());
    assert!(output.contains("gpg (GnuPG) 2.4.4"));
    assert!(output.contains("| remoteforward /run/user/1000/gnupg/S.gpg-agent"));
}

#[test]
fn test_missing_socket_dir_does_not_stop_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("gnupg");
    let runner = ScriptedRunner::healthy("devbox");
    let (report, output) = run(&config_in(&missing), &runner);

    let socket_dir = result(&report, "GPG-004");
    assert!(socket_dir.is_fail());
    assert!(socket_dir.message().contains("missing"));

    for id in ["GPG-005", "GPG-006", "GPG-007", "GPG-008"] {
        assert!(result(&report, id).message().starts_with("missing"), "{}", id);
    }
    assert!(report.find("GPG-010").is_some());
    assert!(report.find("REM-001").is_some());
    assert!(output.ends_with(INTERPRETATION_GUIDE));
}

#[test]
fn test_socket_files_are_independent() {
    let (dir, _listeners) = socket_dir(&["S.gpg-agent", "S.gpg-agent.ssh"]);
    let (report, output) = run(&config_in(dir.path()), &ScriptedRunner::healthy("devbox"));

    assert!(result(&report, "GPG-004").is_pass());
    assert!(result(&report, "GPG-005").is_pass());
    assert!(result(&report, "GPG-006").is_fail());
    assert!(result(&report, "GPG-007").is_pass());
    assert!(result(&report, "GPG-008").is_fail());

    let extra_line = output
        .lines()
        .find(|l| l.contains("GPG-006"))
        .unwrap();
    assert!(extra_line.contains("missing"));
    assert!(extra_line.contains("S.gpg-agent.extra"));
}

#[test]
fn test_regular_file_in_place_of_socket_warns() {
    let (dir, _listeners) = socket_dir(&["S.gpg-agent"]);
    std::fs::write(dir.path().join("S.gpg-agent.extra"), b"stale").unwrap();
    let (report, _) = run(&config_in(dir.path()), &ScriptedRunner::healthy("devbox"));

    assert!(result(&report, "GPG-006").is_warn());
}

#[test]
fn test_nothing_installed() {
    let dir = tempfile::tempdir().unwrap();
    let (report, output) = run(&config_in(dir.path()), &ScriptedRunner::new());

    assert!(result(&report, "SSH-001").is_fail());
    for id in ["SSH-002", "SSH-003", "SSH-004"] {
        assert!(
            matches!(result(&report, id), CheckResult::Skip { .. }),
            "{} should skip",
            id
        );
    }
    assert!(result(&report, "GPG-001").message().contains("not found"));
    assert!(result(&report, "GPG-010").is_fail());
    assert!(result(&report, "REM-001").is_fail());
    assert!(output.ends_with(INTERPRETATION_GUIDE));
}

#[test]
fn test_ssh_config_resolved_once() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::healthy("devbox");
    run(&config_in(dir.path()), &runner);

    assert_eq!(runner.call_count("ssh -G devbox"), 1);
    assert_eq!(runner.call_count("ssh -O check devbox"), 1);
    assert_eq!(runner.calls().last().map(String::as_str), Some("session ssh"));
}

#[test]
fn test_unreachable_host_still_prints_guide() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::healthy("devbox").with_session(Some(255));
    let (report, output) = run(&config_in(dir.path()), &runner);

    let session = result(&report, "REM-001");
    assert!(session.is_warn());
    assert!(session.message().contains("devbox"));
    assert!(output.ends_with(INTERPRETATION_GUIDE));
}

#[test]
fn test_guide_identical_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let (_, broken) = run(&config_in(dir.path()), &ScriptedRunner::new());
    let (_, healthy) = run(&config_in(dir.path()), &ScriptedRunner::healthy("devbox"));

    let guide = |text: &str| {
        let start = text.find("== Interpretation guide ==").unwrap();
        text[start..].to_string()
    };
    assert_eq!(guide(&broken), guide(&healthy));
    assert!(INTERPRETATION_GUIDE.ends_with(&guide(&healthy)));
}

#[test]
fn test_missing_forward_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::healthy("devbox").with_output(
        "ssh -G devbox",
        0,
        "user alice\nhostname devbox.example.com\nport 22\n",
        "",
    );
    let (report, _) = run(&config_in(dir.path()), &runner);

    assert!(result(&report, "SSH-003").is_warn());
    assert!(result(&report, "SSH-004").is_warn());
}

struct BrokenPipe;

impl Write for BrokenPipe {
    fn write(&mut self, _: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_write_failure_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_diagnostics(&config_in(dir.path()), &ScriptedRunner::new(), &mut BrokenPipe);
    assert!(matches!(result, Err(DoctorError::Io { .. })));
}
