//! CLI module: argument parsing, report formatting and the closing guide.

pub mod args;
pub mod guide;
pub mod output;
