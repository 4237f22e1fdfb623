//! Remote checklist.
//!
//! The remote side is checked by one POSIX shell procedure executed in an
//! interactive `ssh -t` session, so a pinentry prompt raised by the test
//! signature reaches the user's terminal. The procedure is assembled from
//! `RemoteStep` descriptors, each a section title and a shell body using the
//! small `pass`/`warn`/`fail`/`info` helpers defined in the prelude.
//!
//! The session's exit status is the exit status of the test signature.

use crate::engine::orchestrator::{Probe, ProbeOutput, RegisteredCheck};
use crate::platform::runner::CommandSpec;
use crate::{CheckResult, DoctorConfig, DoctorError, Finding, Section};

/// Literal text clear-signed by the remote test
pub const SIGN_TEST_TEXT: &str = "gpg-fwd-doctor test signature";

/// ssh exits 255 when the connection itself failed
const SSH_CONNECTION_FAILED: i32 = 255;

const PRELUDE: &str = r#"pass() { printf '  [PASS] %s\n' "$*"; }
info() { printf '  [INFO] %s\n' "$*"; }
warn() { printf '  [WARN] %s\n' "$*"; }
fail() { printf '  [FAIL] %s\n' "$*"; }
section() { printf '\n== %s ==\n' "$*"; }
indent() { sed 's/^/      | /'; }
sockdir="/run/user/$(id -u)/gnupg"
rc=0
"#;

/// One titled block of the remote procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStep {
    pub title: &'static str,
    pub body: String,
}

impl RemoteStep {
    fn new(title: &'static str, body: impl Into<String>) -> Self {
        RemoteStep {
            title,
            body: body.into(),
        }
    }

    fn render(&self) -> Result<String, DoctorError> {
        Ok(format!("section {}\n{}\n", quote(self.title)?, self.body.trim_end()))
    }
}

fn quote(text: &str) -> Result<String, DoctorError> {
    shlex::try_quote(text)
        .map(|q| q.into_owned())
        .map_err(|e| DoctorError::Quote(e.to_string()))
}

/// The remote steps, in execution order
pub fn remote_steps(config: &DoctorConfig) -> Result<Vec<RemoteStep>, DoctorError> {
    let mut sockets = String::new();
    for name in &config.socket_names {
        let q = quote(name)?;
        sockets.push_str(&format!(
            "if [ -S \"$sockdir\"/{q} ]; then pass {q} present; else fail {q} missing; fi\n"
        ));
    }

    let out = quote(&config.sign_stdout_path)?;
    let err = quote(&config.sign_stderr_path)?;
    let text = quote(SIGN_TEST_TEXT)?;

    Ok(vec![
        RemoteStep::new(
            "Remote identity",
            r#"info "host: $(hostname 2>/dev/null || uname -n)"
info "user: $(id -un) (uid $(id -u))""#,
        ),
        RemoteStep::new(
            "Remote GPG/SSH environment",
            r#"vars=$(env | grep -E '^(GPG|SSH)' | sort)
if [ -n "$vars" ]; then
  printf '%s\n' "$vars" | indent
else
  info "no GPG* or SSH* variables set"
fi"#,
        ),
        RemoteStep::new(
            "Remote TTY",
            r#"if term=$(tty 2>/dev/null); then
  pass "tty: $term"
else
  warn "no controlling tty; pinentry cannot prompt"
fi
if [ -n "${GPG_TTY:-}" ]; then
  pass "GPG_TTY=$GPG_TTY"
else
  warn 'GPG_TTY is not set; pinentry prompts are likely to fail (export GPG_TTY=$(tty))'
fi"#,
        ),
        RemoteStep::new(
            "Remote socket directory",
            r#"if [ -d "$sockdir" ]; then
  pass "$sockdir exists"
  ls -la "$sockdir" 2>&1 | indent
else
  fail "$sockdir missing"
fi"#,
        ),
        RemoteStep::new("Remote socket files", sockets),
        RemoteStep::new(
            "Remote listening agent sockets",
            r#"if command -v ss >/dev/null 2>&1; then
  listening=$(ss -xl 2>/dev/null | grep gpg-agent)
  if [ -n "$listening" ]; then
    pass "gpg-agent sockets are listening"
    printf '%s\n' "$listening" | indent
  else
    warn "no listening gpg-agent socket; forwarding is not plumbed through this session"
  fi
else
  warn "ss not available; listening sockets unknown"
fi"#,
        ),
        RemoteStep::new(
            "Remote gpg-agent process",
            r#"agents=$(pgrep -a gpg-agent 2>/dev/null)
if [ -n "$agents" ]; then
  warn "a gpg-agent is running on the remote host and conflicts with the forwarded socket"
  printf '%s\n' "$agents" | indent
else
  pass "no remote gpg-agent running"
fi"#,
        ),
        RemoteStep::new(
            "Remote agent directories",
            r#"if command -v gpgconf >/dev/null 2>&1; then
  gpgconf --list-dirs 2>&1 | grep -E '^(homedir|socketdir|agent-socket|agent-extra-socket|agent-ssh-socket):' | indent
else
  fail "gpgconf not found"
fi"#,
        ),
        RemoteStep::new(
            "Remote forwarded agent liveness",
            r#"ping=$(unset GPG_AGENT_INFO; gpg-connect-agent --verbose --no-autostart 'getinfo version' /bye 2>&1)
ping_rc=$?
printf '%s\n' "$ping" | indent
if [ "$ping_rc" -eq 0 ] && ! printf '%s\n' "$ping" | grep -q '^ERR'; then
  pass "forwarded agent answered"
else
  fail "forwarded agent did not answer (exit $ping_rc)"
fi"#,
        ),
        RemoteStep::new(
            "Remote test signature",
            format!(
                r#"printf '%s\n' {text} | gpg -vv --debug-level guru --clearsign >{out} 2>{err}
rc=$?
if [ "$rc" -eq 0 ]; then
  pass "clear-sign succeeded"
else
  fail "clear-sign failed (exit $rc)"
fi
info "stdout ("{out}"):"
indent <{out}
info "stderr ("{err}"):"
indent <{err}"#
            ),
        ),
    ])
}

/// The complete remote procedure
pub fn build_remote_script(config: &DoctorConfig) -> Result<String, DoctorError> {
    let mut script = String::from(PRELUDE);
    for step in remote_steps(config)? {
        script.push_str(&step.render()?);
    }
    script.push_str("exit \"$rc\"\n");
    Ok(script)
}

/// `ssh -t <host> sh -c <script>`
pub fn remote_session_command(config: &DoctorConfig) -> Result<CommandSpec, DoctorError> {
    let script = quote(&build_remote_script(config)?)?;
    Ok(CommandSpec::new(
        &config.ssh_program,
        &["-t", config.host.as_str(), "sh", "-c", script.as_str()],
    ))
}

/// REM-001
pub fn create_session_check(config: &DoctorConfig) -> Result<RegisteredCheck, DoctorError> {
    let host = config.host.clone();
    Ok(RegisteredCheck {
        id: "REM-001".to_string(),
        name: "Remote session".to_string(),
        section: Section::RemoteSession,
        description: format!("Interactive checklist and test signature on {}", config.host),
        probe: Probe::Interactive(remote_session_command(config)?),
        classify: Box::new(move |output| classify_session(&host, output)),
    })
}

pub fn classify_session(host: &str, output: &ProbeOutput) -> Finding {
    let result = match output {
        ProbeOutput::Session(Some(0)) => {
            CheckResult::pass("remote checklist completed and the test signature succeeded")
        }
        ProbeOutput::Session(Some(SSH_CONNECTION_FAILED)) => CheckResult::warn(
            format!("could not connect to {} (exit 255)", host),
            format!("check `ssh -G {}` above and that the host is reachable", host),
        ),
        ProbeOutput::Session(Some(code)) => CheckResult::warn(
            format!("remote checklist finished with exit {}", code),
            "the test signature did not succeed; read the remote output above",
        ),
        ProbeOutput::Session(None) => CheckResult::warn(
            "remote session terminated by a signal",
            "the checklist may be incomplete",
        ),
        ProbeOutput::Error(error) => CheckResult::fail("ssh could not be started", error.clone()),
        other => CheckResult::fail("unexpected probe output", format!("{:?}", other)),
    };
    Finding::new(result)
}
