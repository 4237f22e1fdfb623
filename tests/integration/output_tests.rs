//! Report formatting and remote procedure text.

use gpg_fwd_doctor::checks::remote::{build_remote_script, remote_session_command};
use gpg_fwd_doctor::cli::output::{OutputFormatter, TerminalFormatter};
use gpg_fwd_doctor::engine::result::DiagnosticReport;
use gpg_fwd_doctor::{Check, CheckResult, DoctorConfig, Section};

fn check(id: &str, section: Section, result: CheckResult) -> Check {
    Check {
        id: id.to_string(),
        name: "Agent ping".to_string(),
        section,
        description: String::new(),
        result: Some(result),
        evidence: Vec::new(),
        duration_ms: 3,
    }
}

#[test]
fn test_plain_output_has_no_escape_codes() {
    let formatter = TerminalFormatter::new(false);
    let mut report = DiagnosticReport::new();
    report.add_result(check("GPG-010", Section::AgentLiveness, CheckResult::fail("no answer", "start it")));

    let text = [
        formatter.banner("devbox", "laptop", 1_700_000_000),
        formatter.section_header(Section::AgentLiveness),
        formatter.check_line(&report.checks[0]),
        formatter.summary(&report),
    ]
    .concat();

    assert!(!text.contains('\x1b'));
    assert!(text.contains("  [FAIL] GPG-010 Agent ping: no answer"));
    assert!(text.contains("0 passed, 0 info, 0 warnings, 1 failed, 0 skipped"));
}

#[test]
fn test_summary_ignores_remote_session() {
    let formatter = TerminalFormatter::new(false);
    let mut report = DiagnosticReport::new();
    report.add_result(check("GPG-010", Section::AgentLiveness, CheckResult::pass("ok")));
    report.add_result(check("REM-001", Section::RemoteSession, CheckResult::warn("exit 2", "x")));

    let summary = formatter.summary(&report);
    assert!(summary.contains("1 passed, 0 info, 0 warnings, 0 failed"));
}

#[test]
fn test_sign_test_truncates_capture_files() {
    let config = DoctorConfig::new("devbox");
    let script = build_remote_script(&config).unwrap();

    assert!(!script.contains(">>"));
    let sign = script
        .lines()
        .find(|l| l.contains("--clearsign"))
        .unwrap();
    assert!(sign.contains(&format!(">{}", config.sign_stdout_path)));
    assert!(sign.contains(&format!("2>{}", config.sign_stderr_path)));
    assert!(sign.contains("-vv --debug-level guru"));
}

#[test]
fn test_capture_files_printed_after_signing() {
    let config = DoctorConfig::new("devbox");
    let script = build_remote_script(&config).unwrap();
    let sign = script.find("--clearsign").unwrap();

    assert!(script[sign..].contains(&format!("indent <{}", config.sign_stdout_path)));
    assert!(script[sign..].contains(&format!("indent <{}", config.sign_stderr_path)));
}

#[test]
fn test_custom_ssh_program() {
    let mut config = DoctorConfig::new("devbox");
    config.ssh_program = "/opt/openssh/bin/ssh".to_string();
    let command = remote_session_command(&config).unwrap();

    assert_eq!(command.program, "/opt/openssh/bin/ssh");
    assert_eq!(command.args[0], "-t");
    assert_eq!(command.args[1], "devbox");
}
