//! Local SSH client checks.
//!
//! Everything here comes from `ssh -G <host>`, the client's own resolution
//! of the config for an alias, and `ssh -O check <host>`.

use crate::checks::{command_evidence, unreachable_program, Severity};
use crate::engine::orchestrator::{Probe, ProbeOutput, RegisteredCheck};
use crate::platform::runner::CommandSpec;
use crate::{CheckResult, DoctorConfig, Finding, Section};

/// `ssh -G` keys that matter for socket forwarding.
pub const FORWARDING_KEYS: [&str; 8] = [
    "hostname",
    "user",
    "port",
    "remoteforward",
    "localforward",
    "dynamicforward",
    "exitonforwardfailure",
    "forwardagent",
];

/// Every `streamlocal*` key is kept as well
const STREAMLOCAL_PREFIX: &str = "streamlocal";

/// Get all SSH checks
pub fn get_ssh_checks(config: &DoctorConfig) -> Vec<RegisteredCheck> {
    let resolve = Probe::Command(ssh_config_command(config));

    vec![
        RegisteredCheck {
            id: "SSH-001".to_string(),
            name: "Resolved configuration".to_string(),
            section: Section::SshConfig,
            description: format!("Full `ssh -G {}` output", config.host),
            probe: resolve.clone(),
            classify: Box::new(classify_config_dump),
        },
        RegisteredCheck {
            id: "SSH-002".to_string(),
            name: "Forwarding settings".to_string(),
            section: Section::SshConfig,
            description: "Forwarding-relevant keys of the resolved configuration".to_string(),
            probe: resolve.clone(),
            classify: Box::new(classify_forwarding_keys),
        },
        RegisteredCheck {
            id: "SSH-003".to_string(),
            name: "GnuPG RemoteForward".to_string(),
            section: Section::SshConfig,
            description: "A RemoteForward carries a gpg-agent socket".to_string(),
            probe: resolve.clone(),
            classify: Box::new(classify_remote_forward),
        },
        RegisteredCheck {
            id: "SSH-004".to_string(),
            name: "StreamLocalBindUnlink".to_string(),
            section: Section::SshConfig,
            description: "Stale remote sockets are unlinked before binding".to_string(),
            probe: resolve,
            classify: Box::new(classify_bind_unlink),
        },
        RegisteredCheck {
            id: "SSH-005".to_string(),
            name: "Control master".to_string(),
            section: Section::ControlConnection,
            description: "Existing multiplexed connection to the host".to_string(),
            probe: Probe::Command(control_check_command(config)),
            classify: {
                let host = config.host.clone();
                Box::new(move |output| classify_control_master(&host, output))
            },
        },
    ]
}

/// `ssh -G <host>`
pub fn ssh_config_command(config: &DoctorConfig) -> CommandSpec {
    CommandSpec::new(&config.ssh_program, &["-G", config.host.as_str()])
}

/// `ssh -O check <host>`
pub fn control_check_command(config: &DoctorConfig) -> CommandSpec {
    CommandSpec::new(&config.ssh_program, &["-O", "check", config.host.as_str()])
}

/// Split `ssh -G` output into (key, value) pairs.
pub fn parse_ssh_config(stdout: &str) -> Vec<(String, String)> {
    stdout
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            match line.split_once(char::is_whitespace) {
                Some((key, value)) => Some((key.to_lowercase(), value.trim().to_string())),
                None => Some((line.to_lowercase(), String::new())),
            }
        })
        .collect()
}

/// Lines of `ssh -G` output whose key matters for forwarding, in output order.
pub fn forwarding_lines(stdout: &str) -> Vec<String> {
    parse_ssh_config(stdout)
        .into_iter()
        .filter(|(key, _)| {
            FORWARDING_KEYS.contains(&key.as_str()) || key.starts_with(STREAMLOCAL_PREFIX)
        })
        .map(|(key, value)| format!("{} {}", key, value))
        .collect()
}

/// Resolved config text, or the finding to report instead.
fn resolved_config(output: &ProbeOutput, dependent: bool) -> Result<String, Finding> {
    match output {
        ProbeOutput::Command(out) if out.success() => Ok(out.stdout.clone()),
        ProbeOutput::Command(out) if dependent => Err(Finding::new(CheckResult::skip(format!(
            "ssh -G failed ({})",
            out.status_text()
        )))),
        ProbeOutput::Command(out) => Err(Finding::new(CheckResult::fail(
            format!("ssh -G failed ({})", out.status_text()),
            "the alias could not be resolved by the ssh client",
        ))
        .with_evidence(out.stderr_lines())),
        _ if dependent => Err(Finding::new(CheckResult::skip("ssh -G did not run"))),
        other => Err(unreachable_program(other, Severity::Required).unwrap_or_else(|| {
            Finding::new(CheckResult::fail("unexpected probe output", format!("{:?}", other)))
        })),
    }
}

/// SSH-001: full dump
pub fn classify_config_dump(output: &ProbeOutput) -> Finding {
    match resolved_config(output, false) {
        Ok(stdout) => {
            let lines = non_empty(&stdout);
            Finding::new(CheckResult::info(format!(
                "{} resolved settings",
                lines.len()
            )))
            .with_evidence(lines)
        }
        Err(finding) => finding,
    }
}

/// SSH-002: filtered view
pub fn classify_forwarding_keys(output: &ProbeOutput) -> Finding {
    match resolved_config(output, true) {
        Ok(stdout) => {
            let lines = forwarding_lines(&stdout);
            Finding::new(CheckResult::info(format!(
                "{} forwarding-relevant settings",
                lines.len()
            )))
            .with_evidence(lines)
        }
        Err(finding) => finding,
    }
}

/// SSH-003: some RemoteForward mentions a gpg-agent socket
pub fn classify_remote_forward(output: &ProbeOutput) -> Finding {
    let stdout = match resolved_config(output, true) {
        Ok(stdout) => stdout,
        Err(finding) => return finding,
    };

    let forwards: Vec<String> = parse_ssh_config(&stdout)
        .into_iter()
        .filter(|(key, _)| key == "remoteforward")
        .map(|(_, value)| value)
        .collect();

    let gpg_forwards: Vec<String> = forwards
        .iter()
        .filter(|value| value.contains("S.gpg-agent"))
        .cloned()
        .collect();

    if !gpg_forwards.is_empty() {
        let finding = Finding::new(CheckResult::pass(format!(
            "{} gpg-agent socket forward(s) configured",
            gpg_forwards.len()
        )));
        finding.with_evidence(gpg_forwards)
    } else if forwards.is_empty() {
        Finding::new(CheckResult::warn(
            "no RemoteForward configured",
            "add `RemoteForward <remote S.gpg-agent> <local S.gpg-agent.extra>` to the Host block",
        ))
    } else {
        Finding::new(CheckResult::warn(
            "no RemoteForward targets a gpg-agent socket",
            "existing forwards do not mention S.gpg-agent",
        ))
        .with_evidence(forwards)
    }
}

/// SSH-004: `streamlocalbindunlink yes`
pub fn classify_bind_unlink(output: &ProbeOutput) -> Finding {
    let stdout = match resolved_config(output, true) {
        Ok(stdout) => stdout,
        Err(finding) => return finding,
    };

    let value = parse_ssh_config(&stdout)
        .into_iter()
        .find(|(key, _)| key == "streamlocalbindunlink")
        .map(|(_, value)| value);

    match value.as_deref() {
        Some("yes") => Finding::new(CheckResult::pass("StreamLocalBindUnlink yes")),
        Some(other) => Finding::new(CheckResult::warn(
            format!("StreamLocalBindUnlink {}", other),
            "a stale socket on the remote side will block the forward; set StreamLocalBindUnlink yes (sshd needs it too)",
        )),
        None => Finding::new(CheckResult::warn(
            "StreamLocalBindUnlink not reported",
            "this ssh client did not resolve the option",
        )),
    }
}

/// SSH-005: a running master is reused by the remote session
pub fn classify_control_master(host: &str, output: &ProbeOutput) -> Finding {
    match output {
        ProbeOutput::Command(out) if out.success() => Finding::new(CheckResult::pass(format!(
            "control master running; forwarding changes apply after `ssh -O exit {}`",
            host
        )))
        .with_evidence(command_evidence(out)),
        ProbeOutput::Command(out) => {
            Finding::new(CheckResult::info("no control master; a fresh connection will be opened"))
                .with_evidence(command_evidence(out))
        }
        other => unreachable_program(other, Severity::Optional).unwrap_or_else(|| {
            Finding::new(CheckResult::warn("unexpected probe output", format!("{:?}", other)))
        }),
    }
}

fn non_empty(text: &str) -> Vec<String> {
    text.lines()
        .map(|l| l.trim_end().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}
