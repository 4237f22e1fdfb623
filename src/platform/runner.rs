//! External process execution.
//!
//! `CommandRunner` is the seam every check goes through to reach `ssh`,
//! `gpg` and friends. `SystemRunner` is the production implementation;
//! tests substitute a scripted runner.

use crate::DoctorError;
use std::fmt;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new<S: AsRef<str>>(program: &str, args: &[S]) -> Self {
        CommandSpec {
            program: program.to_string(),
            args: args.iter().map(|a| a.as_ref().to_string()).collect(),
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            // Long payloads such as the remote script are elided
            if arg.contains('\n') {
                write!(f, " <script>")?;
            } else {
                write!(f, " {}", shlex::try_quote(arg).unwrap_or_else(|_| arg.into()))?;
            }
        }
        Ok(())
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// None when terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Non-empty stdout lines, trailing whitespace trimmed.
    pub fn stdout_lines(&self) -> Vec<String> {
        non_empty_lines(&self.stdout)
    }

    /// Non-empty stderr lines, trailing whitespace trimmed.
    pub fn stderr_lines(&self) -> Vec<String> {
        non_empty_lines(&self.stderr)
    }

    /// Exit status for messages ("exit 1", "killed by signal").
    pub fn status_text(&self) -> String {
        match self.code {
            Some(code) => format!("exit {}", code),
            None => "killed by signal".to_string(),
        }
    }
}

fn non_empty_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|l| l.trim_end().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

/// Executes external programs on behalf of checks.
pub trait CommandRunner {
    /// Run to completion with stdin closed, capturing stdout and stderr.
    fn capture(&self, command: &CommandSpec) -> Result<CommandOutput, DoctorError>;

    /// Run attached to the caller's terminal and return the exit code.
    fn interactive(&self, command: &CommandSpec) -> Result<Option<i32>, DoctorError>;

    /// Resolve a program on PATH.
    fn locate(&self, program: &str) -> Option<PathBuf>;
}

/// Production runner that spawns real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn capture(&self, command: &CommandSpec) -> Result<CommandOutput, DoctorError> {
        debug!(command = %command, "running");
        let output = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| {
                warn!(command = %command, error = %source, "spawn failed");
                DoctorError::Spawn {
                    command: command.to_string(),
                    source,
                }
            })?;

        let result = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(command = %command, status = %result.status_text(), "finished");
        Ok(result)
    }

    fn interactive(&self, command: &CommandSpec) -> Result<Option<i32>, DoctorError> {
        debug!(command = %command, "starting interactive session");
        let status = Command::new(&command.program)
            .args(&command.args)
            .status()
            .map_err(|source| {
                warn!(command = %command, error = %source, "spawn failed");
                DoctorError::Spawn {
                    command: command.to_string(),
                    source,
                }
            })?;
        debug!(command = %command, code = ?status.code(), "interactive session ended");
        Ok(status.code())
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}
