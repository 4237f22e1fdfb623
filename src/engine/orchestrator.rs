//! Check execution orchestrator.
//!
//! Checks are registered as descriptors: an id, the section they report
//! under, a `Probe` describing what to run or inspect, and a classification
//! function turning the probe output into a `Finding`. The orchestrator walks
//! the sections in their fixed order and runs each section's checks
//! sequentially, writing every line as soon as it is known.
//!
//! # Graceful Degradation
//!
//! - Probe cannot start: the classifier sees `ProbeOutput::Error` and reports it
//! - Classifier panics: caught via `std::panic::catch_unwind`, converted to Fail
//! - Identical probes: the first output is reused, so `ssh -G` runs once
//!
//! Every registered check runs; a failure never stops the walk.

use crate::cli::output::OutputFormatter;
use crate::engine::result::DiagnosticReport;
use crate::platform::linux::{self, PathState};
use crate::platform::runner::{CommandOutput, CommandRunner, CommandSpec};
use crate::{write_str, Check, CheckResult, DoctorConfig, DoctorError, Finding, Section};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;
use tracing::debug;

/// What a check inspects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Probe {
    /// Run a command and capture its output
    Command(CommandSpec),
    /// Locate the program on PATH, then capture the command
    Binary(CommandSpec),
    /// Inspect a filesystem path
    Path(PathBuf),
    /// Run a command attached to the terminal
    Interactive(CommandSpec),
}

/// Raw result of a probe, handed to the classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutput {
    Command(CommandOutput),
    Binary { path: PathBuf, output: CommandOutput },
    /// Program is not on PATH
    NotFound(String),
    Path { path: PathBuf, state: PathState },
    /// Exit code of an interactive session
    Session(Option<i32>),
    /// Probe could not run
    Error(String),
}

/// Turns probe output into a finding.
pub type Classifier = Box<dyn Fn(&ProbeOutput) -> Finding + Send + Sync>;

/// A registered check with its probe and classifier
pub struct RegisteredCheck {
    pub id: String,
    pub name: String,
    pub section: Section,
    pub description: String,
    pub probe: Probe,
    pub classify: Classifier,
}

/// Check orchestrator
pub struct CheckOrchestrator<'a> {
    runner: &'a dyn CommandRunner,
    checks: Vec<RegisteredCheck>,
}

impl<'a> CheckOrchestrator<'a> {
    /// Create a new orchestrator executing probes through `runner`
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        CheckOrchestrator {
            runner,
            checks: Vec::new(),
        }
    }

    /// Register checks for execution
    pub fn register_checks(&mut self, checks: Vec<RegisteredCheck>) {
        self.checks.extend(checks);
    }

    /// Register a single check
    pub fn register_check(&mut self, check: RegisteredCheck) {
        self.checks.push(check);
    }

    /// Ids of the registered checks in run order
    pub fn check_ids(&self) -> Vec<String> {
        Section::ALL
            .iter()
            .flat_map(|section| self.checks.iter().filter(move |c| c.section == *section))
            .map(|c| c.id.clone())
            .collect()
    }

    /// Run every section in order, streaming headers and check lines to `out`.
    ///
    /// Each header is flushed before the section's probes start so an
    /// interactive session prints underneath its own header.
    pub fn run<W: Write>(
        &self,
        formatter: &dyn OutputFormatter,
        out: &mut W,
    ) -> Result<DiagnosticReport, DoctorError> {
        let start = Instant::now();
        let mut report = DiagnosticReport::new();
        let mut cache: HashMap<Probe, ProbeOutput> = HashMap::new();

        for section in Section::ALL {
            write_str(out, &formatter.section_header(section))?;
            out.flush().map_err(|e| DoctorError::io("flush section header", e))?;

            for registered in self.checks.iter().filter(|c| c.section == section) {
                let check = self.execute_check(registered, &mut cache);
                write_str(out, &formatter.check_line(&check))?;
                out.flush().map_err(|e| DoctorError::io("flush check line", e))?;
                report.add_result(check);
            }
        }

        report.total_duration_ms = start.elapsed().as_millis() as u64;
        Ok(report)
    }

    /// Execute a single check
    fn execute_check(
        &self,
        registered: &RegisteredCheck,
        cache: &mut HashMap<Probe, ProbeOutput>,
    ) -> Check {
        let start = Instant::now();
        let output = self.probe(&registered.probe, cache);

        let finding = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            (registered.classify)(&output)
        }))
        .unwrap_or_else(|_| {
            Finding::new(CheckResult::fail(
                "Check panicked during classification",
                "An unexpected error occurred",
            ))
        });

        let duration_ms = start.elapsed().as_millis() as u64;
        debug!(id = %registered.id, result = %finding.result, duration_ms, "check finished");

        Check {
            id: registered.id.clone(),
            name: registered.name.clone(),
            section: registered.section,
            description: registered.description.clone(),
            result: Some(finding.result),
            evidence: finding.evidence,
            duration_ms,
        }
    }

    /// Run a probe, reusing earlier output for identical non-interactive probes
    fn probe(&self, probe: &Probe, cache: &mut HashMap<Probe, ProbeOutput>) -> ProbeOutput {
        if let Some(cached) = cache.get(probe) {
            debug!(probe = ?probe, "reusing probe output");
            return cached.clone();
        }

        let output = match probe {
            Probe::Interactive(command) => {
                return match self.runner.interactive(command) {
                    Ok(code) => ProbeOutput::Session(code),
                    Err(e) => ProbeOutput::Error(e.to_string()),
                };
            }
            Probe::Command(command) => match self.runner.capture(command) {
                Ok(output) => ProbeOutput::Command(output),
                Err(e) => ProbeOutput::Error(e.to_string()),
            },
            Probe::Binary(command) => match self.runner.locate(&command.program) {
                None => ProbeOutput::NotFound(command.program.clone()),
                Some(path) => match self.runner.capture(command) {
                    Ok(output) => ProbeOutput::Binary { path, output },
                    Err(e) => ProbeOutput::Error(e.to_string()),
                },
            },
            Probe::Path(path) => ProbeOutput::Path {
                path: path.clone(),
                state: linux::path_state(path),
            },
        };

        cache.insert(probe.clone(), output.clone());
        output
    }
}

/// Create every check for `config`, local and remote
pub fn create_all_checks(config: &DoctorConfig) -> Result<Vec<RegisteredCheck>, DoctorError> {
    use crate::checks::{gpg, remote, ssh};

    let mut checks = Vec::new();
    checks.extend(ssh::get_ssh_checks(config));
    checks.extend(gpg::get_gpg_checks(config));
    checks.push(remote::create_session_check(config)?);
    Ok(checks)
}
