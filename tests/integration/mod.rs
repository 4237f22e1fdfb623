//! Integration tests for gpg-fwd-doctor.
//!
//! Full runs go through the scripted runner; the binary tests only exercise
//! paths that never reach a real host.

pub mod cli_tests;
pub mod full_run_tests;
pub mod output_tests;
