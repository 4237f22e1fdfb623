//! Local GnuPG checks.
//!
//! Binaries, the agent's runtime directory and sockets, running agent
//! processes and a liveness ping. Socket files are probed one by one so a
//! missing socket never hides the state of its siblings.

use crate::checks::{command_evidence, unreachable_program, Severity};
use crate::engine::orchestrator::{Probe, ProbeOutput, RegisteredCheck};
use crate::platform::linux::PathState;
use crate::platform::runner::CommandSpec;
use crate::{CheckResult, DoctorConfig, Finding, Section};
use std::path::{Path, PathBuf};

/// Keys of `gpgconf --list-dirs` worth showing
const DIRECTORY_KEYS: [&str; 6] = [
    "homedir",
    "socketdir",
    "agent-socket",
    "agent-extra-socket",
    "agent-ssh-socket",
    "agent-browser-socket",
];

/// Get all GnuPG checks
pub fn get_gpg_checks(config: &DoctorConfig) -> Vec<RegisteredCheck> {
    let mut checks = vec![
        RegisteredCheck {
            id: "GPG-001".to_string(),
            name: "gpg".to_string(),
            section: Section::GpgBinaries,
            description: "Signing tool present and its version".to_string(),
            probe: Probe::Binary(CommandSpec::new("gpg", &["--version"])),
            classify: Box::new(classify_binary),
        },
        RegisteredCheck {
            id: "GPG-002".to_string(),
            name: "gpg-agent".to_string(),
            section: Section::GpgBinaries,
            description: "Agent helper present and its version".to_string(),
            probe: Probe::Binary(CommandSpec::new("gpg-agent", &["--version"])),
            classify: Box::new(classify_binary),
        },
        RegisteredCheck {
            id: "GPG-003".to_string(),
            name: "gpgconf --list-dirs".to_string(),
            section: Section::AgentDirectories,
            description: "Agent runtime directories as GnuPG sees them".to_string(),
            probe: Probe::Binary(CommandSpec::new("gpgconf", &["--list-dirs"])),
            classify: {
                let expected = config.socket_dir.clone();
                Box::new(move |output| classify_agent_dirs(&expected, output))
            },
        },
        RegisteredCheck {
            id: "GPG-004".to_string(),
            name: "Runtime directory".to_string(),
            section: Section::SocketDirectory,
            description: format!("{} exists", config.socket_dir.display()),
            probe: Probe::Path(config.socket_dir.clone()),
            classify: Box::new(classify_socket_dir),
        },
    ];

    for (i, name) in config.socket_names.iter().enumerate() {
        checks.push(RegisteredCheck {
            id: format!("GPG-{:03}", 5 + i),
            name: name.clone(),
            section: Section::SocketFiles,
            description: format!("{} is a socket", name),
            probe: Probe::Path(socket_path(&config.socket_dir, name)),
            classify: Box::new(classify_socket_file),
        });
    }

    let next = 5 + config.socket_names.len();
    checks.push(RegisteredCheck {
        id: format!("GPG-{:03}", next),
        name: "gpg-agent processes".to_string(),
        section: Section::AgentProcesses,
        description: "Running gpg-agent processes".to_string(),
        probe: Probe::Command(CommandSpec::new("pgrep", &["-a", "gpg-agent"])),
        classify: Box::new(classify_agent_processes),
    });
    checks.push(RegisteredCheck {
        id: format!("GPG-{:03}", next + 1),
        name: "Agent ping".to_string(),
        section: Section::AgentLiveness,
        description: "The local agent answers `getinfo version`".to_string(),
        probe: Probe::Command(CommandSpec::new(
            "gpg-connect-agent",
            &["getinfo version", "/bye"],
        )),
        classify: Box::new(classify_agent_ping),
    });

    checks
}

pub fn socket_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(name)
}

/// GPG-001/002: first line of `--version`
pub fn classify_binary(output: &ProbeOutput) -> Finding {
    match output {
        ProbeOutput::Binary { path, output } if output.success() => {
            let version = output
                .stdout_lines()
                .into_iter()
                .next()
                .unwrap_or_else(|| "version unknown".to_string());
            Finding::new(CheckResult::pass(version))
                .with_evidence([path.display().to_string()])
        }
        ProbeOutput::Binary { path, output } => Finding::new(CheckResult::fail(
            format!("{} --version failed ({})", path.display(), output.status_text()),
            "the binary is present but does not run",
        ))
        .with_evidence(command_evidence(output)),
        other => unreachable_program(other, Severity::Required).unwrap_or_else(|| {
            Finding::new(CheckResult::fail("unexpected probe output", format!("{:?}", other)))
        }),
    }
}

/// Decode gpgconf's percent escapes (`%3a` is a colon).
fn unescape_gpgconf(value: &str) -> String {
    value.replace("%3a", ":").replace("%3A", ":").replace("%25", "%")
}

/// Parse `gpgconf --list-dirs` into (key, value) pairs.
pub fn parse_list_dirs(stdout: &str) -> Vec<(String, String)> {
    stdout
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), unescape_gpgconf(value.trim())))
        .collect()
}

/// GPG-003: directory listing plus a socketdir sanity check
pub fn classify_agent_dirs(expected_socket_dir: &Path, output: &ProbeOutput) -> Finding {
    let out = match output {
        ProbeOutput::Binary { output, .. } if output.success() => output,
        ProbeOutput::Binary { output, .. } => {
            return Finding::new(CheckResult::warn(
                format!("gpgconf --list-dirs failed ({})", output.status_text()),
                "directory layout unknown",
            ))
            .with_evidence(command_evidence(output))
        }
        other => {
            return unreachable_program(other, Severity::Optional).unwrap_or_else(|| {
                Finding::new(CheckResult::warn("unexpected probe output", format!("{:?}", other)))
            })
        }
    };

    let dirs = parse_list_dirs(&out.stdout);
    let evidence: Vec<String> = dirs
        .iter()
        .filter(|(key, _)| DIRECTORY_KEYS.contains(&key.as_str()))
        .map(|(key, value)| format!("{}: {}", key, value))
        .collect();

    let socketdir = dirs
        .iter()
        .find(|(key, _)| key == "socketdir")
        .map(|(_, value)| PathBuf::from(value));

    let result = match socketdir {
        Some(dir) if dir == expected_socket_dir => {
            CheckResult::info(format!("socketdir {}", dir.display()))
        }
        Some(dir) => CheckResult::warn(
            format!("socketdir is {}", dir.display()),
            format!(
                "sockets are checked in {}; a non-default GNUPGHOME moves them, so RemoteForward paths must match",
                expected_socket_dir.display()
            ),
        ),
        None => CheckResult::info("socketdir not reported"),
    };

    Finding::new(result).with_evidence(evidence)
}

/// GPG-004
pub fn classify_socket_dir(output: &ProbeOutput) -> Finding {
    match output {
        ProbeOutput::Path { path, state: PathState::Directory } => {
            Finding::new(CheckResult::pass(format!("{} exists", path.display())))
        }
        ProbeOutput::Path { path, state: PathState::Missing } => Finding::new(CheckResult::fail(
            format!("{} missing", path.display()),
            "gpg-agent has not created its runtime directory; run `gpgconf --create-socketdir` or start the agent",
        )),
        ProbeOutput::Path { path, .. } => Finding::new(CheckResult::fail(
            format!("{} is not a directory", path.display()),
            "something else occupies the agent runtime path",
        )),
        other => Finding::new(CheckResult::fail("unexpected probe output", format!("{:?}", other))),
    }
}

/// GPG-005..008: one socket file
pub fn classify_socket_file(output: &ProbeOutput) -> Finding {
    match output {
        ProbeOutput::Path { path, state: PathState::Socket } => {
            Finding::new(CheckResult::pass(format!("present ({})", path.display())))
        }
        ProbeOutput::Path { path, state: PathState::Missing } => Finding::new(CheckResult::fail(
            format!("missing ({})", path.display()),
            "the agent creates it on start; forwarding this socket cannot work until it exists",
        )),
        ProbeOutput::Path { path, .. } => Finding::new(CheckResult::warn(
            format!("exists but is not a socket ({})", path.display()),
            "remove the stale file and restart the agent",
        )),
        other => Finding::new(CheckResult::fail("unexpected probe output", format!("{:?}", other))),
    }
}

/// GPG-009: `pgrep -a gpg-agent`
pub fn classify_agent_processes(output: &ProbeOutput) -> Finding {
    match output {
        ProbeOutput::Command(out) if out.success() => {
            let lines = out.stdout_lines();
            Finding::new(CheckResult::pass(format!("{} gpg-agent process(es) running", lines.len())))
                .with_evidence(lines)
        }
        // pgrep exits 1 when nothing matched
        ProbeOutput::Command(out) if out.code == Some(1) => Finding::new(CheckResult::warn(
            "no gpg-agent process running",
            "the agent starts on demand; the ping below will launch it",
        )),
        ProbeOutput::Command(out) => Finding::new(CheckResult::warn(
            format!("pgrep failed ({})", out.status_text()),
            "process list unavailable",
        ))
        .with_evidence(out.stderr_lines()),
        other => unreachable_program(other, Severity::Optional).unwrap_or_else(|| {
            Finding::new(CheckResult::warn("unexpected probe output", format!("{:?}", other)))
        }),
    }
}

/// GPG-010: `gpg-connect-agent 'getinfo version' /bye`
pub fn classify_agent_ping(output: &ProbeOutput) -> Finding {
    match output {
        ProbeOutput::Command(out) => {
            let lines = command_evidence(out);
            let errored = lines.iter().any(|l| l.starts_with("ERR"));
            if out.success() && !errored {
                let version = lines
                    .iter()
                    .find_map(|l| l.strip_prefix("D "))
                    .map(|v| format!("local agent answered (version {})", v))
                    .unwrap_or_else(|| "local agent answered".to_string());
                Finding::new(CheckResult::pass(version)).with_evidence(lines)
            } else {
                Finding::new(CheckResult::fail(
                    format!("local agent did not answer ({})", out.status_text()),
                    "there is no agent to forward; check `gpgconf --launch gpg-agent`",
                ))
                .with_evidence(lines)
            }
        }
        other => unreachable_program(other, Severity::Required).unwrap_or_else(|| {
            Finding::new(CheckResult::fail("unexpected probe output", format!("{:?}", other)))
        }),
    }
}
