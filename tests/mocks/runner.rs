//! Scripted `CommandRunner` for integration tests.
//!
//! Commands are keyed by their program and arguments joined with single
//! spaces (`ssh -G devbox`). Anything not scripted fails to spawn, which is
//! what a machine without the program looks like.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::PathBuf;

use gpg_fwd_doctor::platform::runner::{CommandOutput, CommandRunner, CommandSpec};
use gpg_fwd_doctor::DoctorError;

/// `ssh -G` output for a correctly forwarded host
pub const FORWARDED_SSH_CONFIG: &str = "\
user alice
hostname devbox.example.com
port 22
exitonforwardfailure yes
forwardagent no
remoteforward /run/user/1000/gnupg/S.gpg-agent /run/user/1000/gnupg/S.gpg-agent.extra
streamlocalbindmask 0177
streamlocalbindunlink yes
";

/// Runner answering from a fixed table
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    outputs: HashMap<String, CommandOutput>,
    located: HashSet<String>,
    session: Option<Option<i32>>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedRunner {
    /// Nothing is installed and ssh cannot start
    pub fn new() -> Self {
        Self::default()
    }

    /// Every local tool present and working, remote signature succeeds
    pub fn healthy(host: &str) -> Self {
        Self::new()
            .with_output(&format!("ssh -G {}", host), 0, FORWARDED_SSH_CONFIG, "")
            .with_output(
                &format!("ssh -O check {}", host),
                255,
                "",
                "Control socket connect(/home/alice/.ssh/cm-devbox): No such file or directory",
            )
            .with_binary("gpg", "gpg (GnuPG) 2.4.4\nlibgcrypt 1.10.3\n")
            .with_binary("gpg-agent", "gpg-agent (GnuPG) 2.4.4\n")
            .with_binary(
                "gpgconf",
                "homedir:/home/alice/.gnupg\nsocketdir:/run/user/1000/gnupg\nagent-socket:/run/user/1000/gnupg/S.gpg-agent\n",
            )
            .with_output("pgrep -a gpg-agent", 0, "1234 gpg-agent --homedir /home/alice/.gnupg --daemon\n", "")
            .with_output("gpg-connect-agent getinfo version /bye", 0, "D 2.4.4\nOK\n", "")
            .with_session(Some(0))
    }

    /// Script a captured command
    pub fn with_output(mut self, command: &str, code: i32, stdout: &str, stderr: &str) -> Self {
        self.outputs.insert(
            command.to_string(),
            CommandOutput {
                code: Some(code),
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            },
        );
        self
    }

    /// Put `program` on PATH; `--version` prints `version_output`
    pub fn with_binary(mut self, program: &str, version_output: &str) -> Self {
        self.located.insert(program.to_string());
        let args = if program == "gpgconf" { "--list-dirs" } else { "--version" };
        self.with_output(&format!("{} {}", program, args), 0, version_output, "")
    }

    /// Exit code of the interactive session; `None` means killed by a signal
    pub fn with_session(mut self, code: Option<i32>) -> Self {
        self.session = Some(code);
        self
    }

    /// Keys of every capture and session request, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self, command: &str) -> usize {
        self.calls.borrow().iter().filter(|c| *c == command).count()
    }

    fn key(command: &CommandSpec) -> String {
        let mut key = command.program.clone();
        for arg in &command.args {
            key.push(' ');
            key.push_str(arg);
        }
        key
    }

    fn spawn_error(command: &CommandSpec) -> DoctorError {
        DoctorError::Spawn {
            command: command.to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
        }
    }
}

impl CommandRunner for ScriptedRunner {
    fn capture(&self, command: &CommandSpec) -> Result<CommandOutput, DoctorError> {
        let key = Self::key(command);
        self.calls.borrow_mut().push(key.clone());
        self.outputs
            .get(&key)
            .cloned()
            .ok_or_else(|| Self::spawn_error(command))
    }

    fn interactive(&self, command: &CommandSpec) -> Result<Option<i32>, DoctorError> {
        self.calls.borrow_mut().push(format!("session {}", command.program));
        self.session.ok_or_else(|| Self::spawn_error(command))
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        self.located
            .contains(program)
            .then(|| PathBuf::from("/usr/bin").join(program))
    }
}
