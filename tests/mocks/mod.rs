//! Mock implementations for testing without ssh, gpg or a remote host.
//!
//! The scripted runner answers commands from a table, so a full diagnostic
//! run can be driven through healthy, broken and unreachable setups.

pub mod runner;

pub use runner::*;
