//! Command line arguments for gpg-fwd-doctor.
//!
//! The only input is the SSH host alias. `--help` and `--version` come from
//! clap; parse failures are returned to `main`, which decides the exit code.

use clap::{CommandFactory, FromArgMatches, Parser};

use crate::version::get_build_info;

/// Parsed command line arguments
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(
    name = "gpg-fwd-doctor",
    version,
    about = "Diagnose GnuPG agent socket forwarding over SSH",
    after_help = "Environment:\n  GPG_FWD_DOCTOR_SOCKET_DIR  local agent socket directory (default /run/user/<uid>/gnupg)\n  GPG_FWD_DOCTOR_SSH         ssh client to run (default ssh)\n  GPG_FWD_DOCTOR_LOG         tracing filter for diagnostics on stderr (default warn)\n  NO_COLOR                   disable colored output"
)]
pub struct Args {
    /// SSH host alias to diagnose, as passed to `ssh`
    #[arg(value_name = "HOST", value_parser = parse_host)]
    pub host: String,
}

impl Args {
    /// Parse `std::env::args`, with build metadata in `--version`.
    pub fn parse_with_build_info() -> Result<Self, clap::Error> {
        Self::parse_from_iter(std::env::args_os())
    }

    /// Parse an explicit argument list; the first item is the program name.
    pub fn parse_from_iter<I, T>(iter: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut command = Self::command().long_version(get_build_info().to_string());
        let matches = command.try_get_matches_from_mut(iter)?;
        Self::from_arg_matches(&matches).map_err(|e| e.format(&mut command))
    }
}

fn parse_host(value: &str) -> Result<String, String> {
    if value.trim().is_empty() {
        return Err("host alias must not be empty".to_string());
    }
    if value.starts_with('-') {
        return Err(format!("'{}' is not a host alias", value));
    }
    Ok(value.to_string())
}
