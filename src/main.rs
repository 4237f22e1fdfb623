//! gpg-fwd-doctor CLI entry point
//!
//! Diagnoses GnuPG agent socket forwarding over SSH for one host alias.

use gpg_fwd_doctor::cli::args::Args;
use gpg_fwd_doctor::platform::runner::SystemRunner;
use gpg_fwd_doctor::{run_diagnostics, DoctorConfig};

use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Usage errors
const EXIT_USAGE: u8 = 1;
/// The report could not be written
const EXIT_RUNTIME: u8 = 3;

fn main() -> ExitCode {
    let args = match Args::parse_with_build_info() {
        Ok(args) => args,
        Err(e) => {
            // --help and --version arrive here too and go to stdout
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EXIT_USAGE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_logging();

    let config = DoctorConfig::from_args(&args);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    // Check outcomes are advisory and never change the exit status.
    match run_diagnostics(&config, &SystemRunner, &mut out) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_RUNTIME)
        }
    }
}

fn init_logging() {
    let filter = std::env::var("GPG_FWD_DOCTOR_LOG")
        .ok()
        .and_then(|spec| EnvFilter::try_new(spec).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}
