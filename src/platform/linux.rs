//! Local system interface.
//!
//! uid, hostname, timestamps and socket path inspection.
//!
//! # Graceful Degradation
//!
//! - Hostname unreadable: returns `DoctorError::Io`, callers substitute "unknown"
//! - Path inspection never errors: anything unreadable reports as `Missing`
//!
//! No function in this module will panic.

use crate::DoctorError;
use std::fs;
use std::os::unix::fs::FileTypeExt;
use std::path::Path;

/// What lives at a filesystem path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathState {
    Missing,
    Directory,
    Socket,
    /// Regular file, symlink target of another kind, device...
    Other,
}

/// Numeric id of the invoking user
pub fn get_uid() -> u32 {
    // SAFETY: getuid(2) has no preconditions and cannot fail.
    unsafe { libc::getuid() }
}

/// Get the system hostname
pub fn get_hostname() -> Result<String, DoctorError> {
    for path in ["/proc/sys/kernel/hostname", "/etc/hostname"] {
        if let Ok(hostname) = fs::read_to_string(path) {
            let hostname = hostname.trim().to_string();
            if !hostname.is_empty() {
                return Ok(hostname);
            }
        }
    }

    Err(DoctorError::io(
        "get_hostname",
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "could not read hostname from /proc or /etc/hostname",
        ),
    ))
}

/// Inspect a path, following symlinks.
pub fn path_state(path: &Path) -> PathState {
    match fs::metadata(path) {
        Ok(meta) => {
            let file_type = meta.file_type();
            if file_type.is_dir() {
                PathState::Directory
            } else if file_type.is_socket() {
                PathState::Socket
            } else {
                PathState::Other
            }
        }
        Err(_) => PathState::Missing,
    }
}

/// Get an environment variable safely
pub fn get_environment_variable(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Get current Unix timestamp
pub fn get_unix_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}
