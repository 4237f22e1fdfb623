//! Static interpretation guide printed at the end of every run.

/// Symptom to likely cause table. Printed verbatim.
pub const INTERPRETATION_GUIDE: &str = "
== Interpretation guide ==

Sockets missing on the remote host (Remote socket files: missing)
  - RemoteForward is not applied to this alias: check the `remoteforward`
    lines under Local SSH configuration and that you used the same alias.
  - A stale socket file blocked the bind: set StreamLocalBindUnlink yes
    in ~/.ssh/config (or sshd_config on the remote) and reconnect.
  - An existing ControlMaster connection is being reused: run
    `ssh -O exit <host>` so the new forwarding is set up.
  - The remote sshd refuses stream forwarding: AllowStreamLocalForwarding
    must not be `no` in the remote sshd_config.

Sockets missing locally (Local socket files: missing)
  - gpg-agent is not running: start it with `gpgconf --launch gpg-agent`.
  - The agent uses a different socket directory: compare `socketdir`
    under Local agent directories with /run/user/<uid>/gnupg.

Remote gpg-agent is running
  - A local agent on the remote host owns the socket path and shadows
    the forwarded one: `gpgconf --kill gpg-agent` on the remote, and stop
    it from autostarting (systemd user sockets for gpg-agent).

Forwarded agent does not answer (remote liveness fails)
  - The forwarded socket points at S.gpg-agent rather than
    S.gpg-agent.extra on the local side, or at the wrong local uid path.
  - The remote gpg is older than 2.1 and does not use the standard
    socket location.

Signing hangs or fails with 'Inappropriate ioctl for device'
  - GPG_TTY is not set in the remote shell: export GPG_TTY=$(tty).
  - pinentry cannot reach a display: the local pinentry prompts on the
    local machine, so check for a dialog there, or configure a terminal
    pinentry in ~/.gnupg/gpg-agent.conf.
  - The agent cache expired while no pinentry was reachable.

Signing fails with 'No secret key'
  - The public key is not imported on the remote host: export it locally
    with `gpg --export <id>` and import it remotely. Private keys never
    need to leave the local machine.

ssh could not connect (remote session exit 255)
  - The alias does not resolve or the host is unreachable: the remote
    checks did not run, so fix the connection first.
";
