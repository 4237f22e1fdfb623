//! Output formatting for gpg-fwd-doctor.
//!
//! The report is streamed: the banner first, then every section header and
//! check line as the orchestrator reaches it, then the tally. Each method
//! returns a complete chunk of text ending in a newline.
//!
//! # Graceful Degradation
//!
//! - Non-TTY output or `NO_COLOR`: plain text, no escape sequences
//! - Checks without a result: rendered as `[----]`
//! - Timestamps outside chrono's range: printed as raw seconds
//!
//! No function in this module will panic.

use chrono::{DateTime, Utc};

use crate::engine::result::DiagnosticReport;
use crate::{Check, CheckResult, Section};

/// Trait for output formatters
pub trait OutputFormatter {
    /// Opening lines naming the hosts involved
    fn banner(&self, host: &str, local_host: &str, timestamp: i64) -> String;
    fn section_header(&self, section: Section) -> String;
    /// One check with its evidence lines
    fn check_line(&self, check: &Check) -> String;
    /// Closing tally of the local checks
    fn summary(&self, report: &DiagnosticReport) -> String;
}

/// Terminal (human-readable) formatter
pub struct TerminalFormatter {
    color: bool,
}

impl TerminalFormatter {
    pub fn new(color: bool) -> Self {
        TerminalFormatter { color }
    }

    fn colorize(&self, text: &str, color_code: &str) -> String {
        if self.color {
            format!("\x1b[{}m{}\x1b[0m", color_code, text)
        } else {
            text.to_string()
        }
    }

    fn green(&self, text: &str) -> String {
        self.colorize(text, "32")
    }

    fn yellow(&self, text: &str) -> String {
        self.colorize(text, "33")
    }

    fn red(&self, text: &str) -> String {
        self.colorize(text, "31")
    }

    fn gray(&self, text: &str) -> String {
        self.colorize(text, "90")
    }

    fn bold(&self, text: &str) -> String {
        self.colorize(text, "1")
    }

    fn status(&self, result: Option<&CheckResult>) -> String {
        match result {
            Some(CheckResult::Pass { .. }) => self.green("[PASS]"),
            Some(CheckResult::Info { .. }) => "[INFO]".to_string(),
            Some(CheckResult::Warn { .. }) => self.yellow("[WARN]"),
            Some(CheckResult::Fail { .. }) => self.red("[FAIL]"),
            Some(CheckResult::Skip { .. }) => self.gray("[SKIP]"),
            None => self.gray("[----]"),
        }
    }
}

const RULE: &str =
    "--------------------------------------------------------------------------------";

impl OutputFormatter for TerminalFormatter {
    fn banner(&self, host: &str, local_host: &str, timestamp: i64) -> String {
        let mut output = String::new();
        output.push_str(RULE);
        output.push('\n');
        output.push_str(&self.bold("gpg-fwd-doctor: GnuPG agent forwarding report"));
        output.push('\n');
        output.push_str(&format!("Local host: {}\n", local_host));
        output.push_str(&format!("Remote host: {}\n", host));
        output.push_str(&format!("Timestamp: {}\n", format_timestamp(timestamp)));
        output.push_str(RULE);
        output.push('\n');
        output
    }

    fn section_header(&self, section: Section) -> String {
        format!("\n{}\n", self.bold(&format!("== {} ==", section.title())))
    }

    fn check_line(&self, check: &Check) -> String {
        let status = self.status(check.result.as_ref());
        let mut output = match &check.result {
            Some(result) => format!(
                "  {} {} {}: {}\n",
                status,
                check.id,
                check.name,
                result.message()
            ),
            None => format!("  {} {} {}: not executed\n", status, check.id, check.name),
        };

        if let Some(CheckResult::Warn { details, .. } | CheckResult::Fail { details, .. }) =
            &check.result
        {
            if !details.is_empty() {
                output.push_str(&format!("      {}\n", self.gray(&format!("hint: {}", details))));
            }
        }

        for line in &check.evidence {
            output.push_str(&format!("      | {}\n", line));
        }

        output
    }

    fn summary(&self, report: &DiagnosticReport) -> String {
        let summary = report.summary();
        let mut output = String::new();
        output.push('\n');
        output.push_str(RULE);
        output.push('\n');
        output.push_str(&format!(
            "LOCAL SUMMARY: {} passed, {} info, {} warnings, {} failed, {} skipped\n",
            summary.passed, summary.info, summary.warned, summary.failed, summary.skipped
        ));
        output.push_str(&format!(
            "Total time: {:.1}s (remote results are in the session output above)\n",
            report.total_duration_ms as f64 / 1000.0
        ));
        output.push_str(RULE);
        output.push('\n');
        output
    }
}

/// Format a Unix timestamp as ISO 8601
fn format_timestamp(timestamp: i64) -> String {
    match DateTime::<Utc>::from_timestamp(timestamp, 0) {
        Some(time) => time.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        None => timestamp.to_string(),
    }
}
