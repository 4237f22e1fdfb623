//! gpg-fwd-doctor library
//!
//! Diagnoses GnuPG agent socket forwarding over SSH.
//!
//! A run walks an ordered list of local checks (resolved SSH config, GnuPG
//! binaries, agent sockets, agent liveness, control connection), then opens
//! one interactive SSH session that runs the same checklist on the remote
//! host and finishes with a real clear-sign test. A static interpretation
//! guide closes the report.
//!
//! Every check is advisory: a failing check never stops the run and the
//! outcomes are never folded into an exit status.
//!
//! # Example
//!
//! ```no_run
//! use gpg_fwd_doctor::platform::runner::SystemRunner;
//! use gpg_fwd_doctor::{run_diagnostics, DoctorConfig};
//!
//! let config = DoctorConfig::new("devbox");
//! let mut stdout = std::io::stdout();
//! let report = run_diagnostics(&config, &SystemRunner, &mut stdout).expect("report written");
//! println!("local failures: {}", report.summary().failed);
//! ```

pub mod checks;
pub mod cli;
pub mod engine;
pub mod platform;
pub mod version;

use cli::args::Args;
use cli::output::{OutputFormatter, TerminalFormatter};
use engine::orchestrator::{create_all_checks, CheckOrchestrator};
use platform::runner::CommandRunner;
use std::fmt;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use tracing::info;

pub use engine::result::{DiagnosticReport, ResultSummary};

/// Socket names gpg-agent creates in its runtime directory.
pub const SOCKET_NAMES: [&str; 4] = [
    "S.gpg-agent",
    "S.gpg-agent.extra",
    "S.gpg-agent.ssh",
    "S.gpg-agent.browser",
];

/// Remote file receiving stdout of the test signature.
pub const SIGN_STDOUT_PATH: &str = "/tmp/gpg-fwd-doctor-sign.out";

/// Remote file receiving stderr of the test signature.
pub const SIGN_STDERR_PATH: &str = "/tmp/gpg-fwd-doctor-sign.err";

/// Outcome of a single check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckResult {
    /// Condition confirmed
    Pass { message: String },
    /// Informational dump, no verdict
    Info { message: String },
    /// Likely misconfiguration, non-fatal
    Warn { message: String, details: String },
    /// Required condition absent
    Fail { message: String, details: String },
    /// Check could not be evaluated
    Skip { reason: String },
}

impl CheckResult {
    pub fn pass(message: impl Into<String>) -> Self {
        CheckResult::Pass {
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        CheckResult::Info {
            message: message.into(),
        }
    }

    pub fn warn(message: impl Into<String>, details: impl Into<String>) -> Self {
        CheckResult::Warn {
            message: message.into(),
            details: details.into(),
        }
    }

    pub fn fail(message: impl Into<String>, details: impl Into<String>) -> Self {
        CheckResult::Fail {
            message: message.into(),
            details: details.into(),
        }
    }

    pub fn skip(reason: impl Into<String>) -> Self {
        CheckResult::Skip {
            reason: reason.into(),
        }
    }

    /// The headline message regardless of variant.
    pub fn message(&self) -> &str {
        match self {
            CheckResult::Pass { message }
            | CheckResult::Info { message }
            | CheckResult::Warn { message, .. }
            | CheckResult::Fail { message, .. } => message,
            CheckResult::Skip { reason } => reason,
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, CheckResult::Pass { .. })
    }

    pub fn is_warn(&self) -> bool {
        matches!(self, CheckResult::Warn { .. })
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, CheckResult::Fail { .. })
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckResult::Pass { message } => write!(f, "PASS: {}", message),
            CheckResult::Info { message } => write!(f, "INFO: {}", message),
            CheckResult::Warn { message, details } => {
                write!(f, "WARN: {} ({})", message, details)
            }
            CheckResult::Fail { message, details } => {
                write!(f, "FAIL: {} ({})", message, details)
            }
            CheckResult::Skip { reason } => write!(f, "SKIP: {}", reason),
        }
    }
}

/// A check result together with the command output backing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub result: CheckResult,
    /// Lines printed indented under the check line
    pub evidence: Vec<String>,
}

impl Finding {
    pub fn new(result: CheckResult) -> Self {
        Finding {
            result,
            evidence: Vec::new(),
        }
    }

    pub fn with_evidence<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.evidence.extend(lines.into_iter().map(Into::into));
        self
    }
}

impl From<CheckResult> for Finding {
    fn from(result: CheckResult) -> Self {
        Finding::new(result)
    }
}

/// Report sections, in the order they are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    /// Resolved `ssh -G` configuration for the host
    SshConfig,
    /// gpg and gpg-agent binaries
    GpgBinaries,
    /// `gpgconf --list-dirs`
    AgentDirectories,
    /// /run/user/<uid>/gnupg
    SocketDirectory,
    /// The four agent sockets
    SocketFiles,
    /// Running gpg-agent processes
    AgentProcesses,
    /// Ping against the local agent
    AgentLiveness,
    /// Existing ControlMaster connection
    ControlConnection,
    /// Interactive remote checklist
    RemoteSession,
}

impl Section {
    /// Every section in print order.
    pub const ALL: [Section; 9] = [
        Section::SshConfig,
        Section::GpgBinaries,
        Section::AgentDirectories,
        Section::SocketDirectory,
        Section::SocketFiles,
        Section::AgentProcesses,
        Section::AgentLiveness,
        Section::ControlConnection,
        Section::RemoteSession,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Section::SshConfig => "Local SSH configuration",
            Section::GpgBinaries => "Local GnuPG binaries",
            Section::AgentDirectories => "Local agent directories",
            Section::SocketDirectory => "Local socket directory",
            Section::SocketFiles => "Local socket files",
            Section::AgentProcesses => "Local gpg-agent processes",
            Section::AgentLiveness => "Local agent liveness",
            Section::ControlConnection => "SSH control connection",
            Section::RemoteSession => "Remote checklist (interactive session)",
        }
    }

    pub fn is_local(&self) -> bool {
        !matches!(self, Section::RemoteSession)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// A check with its result.
#[derive(Debug, Clone)]
pub struct Check {
    /// Unique identifier (e.g., "GPG-004")
    pub id: String,
    /// Human-readable name
    pub name: String,
    pub section: Section,
    /// Description of what this check inspects
    pub description: String,
    /// Result of the check (None if not yet executed)
    pub result: Option<CheckResult>,
    pub evidence: Vec<String>,
    pub duration_ms: u64,
}

/// Errors raised by the plumbing around checks.
///
/// Checks themselves never error: a probe failure becomes a `Fail` result.
#[derive(Debug, thiserror::Error)]
pub enum DoctorError {
    /// An external program could not be started
    #[error("failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    /// The remote checklist could not be quoted for the remote shell
    #[error("cannot quote remote command: {0}")]
    Quote(String),
    /// Writing the report failed
    #[error("I/O error in {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl DoctorError {
    pub(crate) fn io(context: &str, source: std::io::Error) -> Self {
        DoctorError::Io {
            context: context.to_string(),
            source,
        }
    }
}

/// Configuration for a diagnostic run.
#[derive(Debug, Clone)]
pub struct DoctorConfig {
    /// SSH host alias under test
    pub host: String,
    /// Numeric id of the invoking user
    pub uid: u32,
    /// Local agent runtime directory
    pub socket_dir: PathBuf,
    pub socket_names: Vec<String>,
    /// ssh client binary
    pub ssh_program: String,
    pub sign_stdout_path: String,
    pub sign_stderr_path: String,
    /// Emit ANSI colors
    pub color: bool,
}

impl DoctorConfig {
    /// Defaults for `host`, ignoring the environment.
    pub fn new(host: impl Into<String>) -> Self {
        let uid = platform::linux::get_uid();
        DoctorConfig {
            host: host.into(),
            uid,
            socket_dir: default_socket_dir(uid),
            socket_names: SOCKET_NAMES.iter().map(|s| s.to_string()).collect(),
            ssh_program: "ssh".to_string(),
            sign_stdout_path: SIGN_STDOUT_PATH.to_string(),
            sign_stderr_path: SIGN_STDERR_PATH.to_string(),
            color: false,
        }
    }

    /// Create configuration from command line arguments and the environment
    pub fn from_args(args: &Args) -> Self {
        let mut config = DoctorConfig::new(args.host.clone());

        if let Some(dir) = non_empty_env("GPG_FWD_DOCTOR_SOCKET_DIR") {
            config.socket_dir = PathBuf::from(dir);
        }
        if let Some(ssh) = non_empty_env("GPG_FWD_DOCTOR_SSH") {
            config.ssh_program = ssh;
        }
        config.color = std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal();

        config
    }
}

/// Runtime directory gpg-agent uses for `uid` on systemd hosts.
pub fn default_socket_dir(uid: u32) -> PathBuf {
    PathBuf::from(format!("/run/user/{}/gnupg", uid))
}

fn non_empty_env(name: &str) -> Option<String> {
    platform::linux::get_environment_variable(name).filter(|v| !v.trim().is_empty())
}

/// Run the full diagnostic and stream the report into `out`.
///
/// Sections are written as they run so the interactive remote session
/// appears in place. The returned report holds every recorded check for
/// callers that want to inspect outcomes; it does not influence the exit
/// status of the binary.
pub fn run_diagnostics<W: Write>(
    config: &DoctorConfig,
    runner: &dyn CommandRunner,
    out: &mut W,
) -> Result<DiagnosticReport, DoctorError> {
    let formatter = TerminalFormatter::new(config.color);
    let local_host = platform::linux::get_hostname().unwrap_or_else(|_| "unknown".to_string());

    info!(host = %config.host, uid = config.uid, "starting forwarding diagnostics");

    write_str(
        out,
        &formatter.banner(&config.host, &local_host, platform::linux::get_unix_timestamp()),
    )?;

    let mut orchestrator = CheckOrchestrator::new(runner);
    orchestrator.register_checks(create_all_checks(config)?);
    let mut report = orchestrator.run(&formatter, out)?;
    report.local_host = local_host;
    report.target_host = config.host.clone();

    write_str(out, &formatter.summary(&report))?;
    write_str(out, cli::guide::INTERPRETATION_GUIDE)?;
    out.flush().map_err(|e| DoctorError::io("flush report", e))?;

    info!(checks = report.checks.len(), "diagnostics finished");
    Ok(report)
}

pub(crate) fn write_str<W: Write>(out: &mut W, text: &str) -> Result<(), DoctorError> {
    out.write_all(text.as_bytes())
        .map_err(|e| DoctorError::io("write report", e))
}
