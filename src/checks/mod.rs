//! Check modules.
//!
//! - ssh: resolved client configuration and control connection
//! - gpg: local binaries, agent directories, sockets, processes, liveness
//! - remote: the checklist executed inside the interactive SSH session
//!
//! # Graceful Degradation
//!
//! All classifiers follow these rules:
//! - Program not on PATH or not startable: Fail when the program is required,
//!   Warn when it only adds context
//! - Upstream data unavailable (e.g. `ssh -G` failed): Skip with the reason
//! - Unexpected output: reported as evidence, never parsed into a panic
//!
//! Classifiers never error. Every condition becomes a `CheckResult`.

pub mod gpg;
pub mod remote;
pub mod ssh;

use crate::engine::orchestrator::ProbeOutput;
use crate::platform::runner::CommandOutput;
use crate::{CheckResult, Finding};

/// stdout followed by stderr, blank lines dropped
pub(crate) fn command_evidence(output: &CommandOutput) -> Vec<String> {
    let mut lines = output.stdout_lines();
    lines.extend(output.stderr_lines());
    lines
}

/// Finding for probes that never reached the program, if `output` is one.
pub(crate) fn unreachable_program(output: &ProbeOutput, severity: Severity) -> Option<Finding> {
    let (message, details) = match output {
        ProbeOutput::NotFound(program) => (
            format!("{} not found on PATH", program),
            "install it or fix PATH".to_string(),
        ),
        ProbeOutput::Error(error) => ("command could not be started".to_string(), error.clone()),
        _ => return None,
    };

    let result = match severity {
        Severity::Required => CheckResult::fail(message, details),
        Severity::Optional => CheckResult::warn(message, details),
    };
    Some(Finding::new(result))
}

/// How much a missing program matters to a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Severity {
    Required,
    Optional,
}
