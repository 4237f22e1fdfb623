//! Result aggregation.
//!
//! Collects check results and tallies them for the closing summary line.
//! The tally is display only.

use crate::{Check, CheckResult, Section};

/// Result summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSummary {
    pub passed: u32,
    pub info: u32,
    pub warned: u32,
    pub failed: u32,
    pub skipped: u32,
    pub total: u32,
    pub total_duration_ms: u64,
}

/// Every check recorded during a run
#[derive(Debug, Clone)]
pub struct DiagnosticReport {
    pub timestamp: i64,
    pub local_host: String,
    pub target_host: String,
    pub checks: Vec<Check>,
    pub total_duration_ms: u64,
}

impl DiagnosticReport {
    /// Create a new empty report
    pub fn new() -> Self {
        DiagnosticReport {
            timestamp: crate::platform::linux::get_unix_timestamp(),
            local_host: String::new(),
            target_host: String::new(),
            checks: Vec::new(),
            total_duration_ms: 0,
        }
    }

    /// Add a completed check
    pub fn add_result(&mut self, check: Check) {
        self.checks.push(check);
    }

    /// Look up a check by id
    pub fn find(&self, id: &str) -> Option<&Check> {
        self.checks.iter().find(|c| c.id == id)
    }

    /// Checks recorded under `section`, in run order
    pub fn checks_in(&self, section: Section) -> Vec<&Check> {
        self.checks.iter().filter(|c| c.section == section).collect()
    }

    /// Summary of the local checks only.
    ///
    /// The remote checklist streams straight to the terminal, so its own
    /// verdicts are not part of this tally.
    pub fn summary(&self) -> ResultSummary {
        let mut summary = ResultSummary::default();

        for check in self.checks.iter().filter(|c| c.section.is_local()) {
            summary.total += 1;
            summary.total_duration_ms += check.duration_ms;

            match &check.result {
                Some(CheckResult::Pass { .. }) => summary.passed += 1,
                Some(CheckResult::Info { .. }) | None => summary.info += 1,
                Some(CheckResult::Warn { .. }) => summary.warned += 1,
                Some(CheckResult::Fail { .. }) => summary.failed += 1,
                Some(CheckResult::Skip { .. }) => summary.skipped += 1,
            }
        }

        summary
    }
}

impl Default for DiagnosticReport {
    fn default() -> Self {
        Self::new()
    }
}
