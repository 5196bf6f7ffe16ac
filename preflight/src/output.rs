//! Output formatting for the preflight CLI.
//!
//! Operator messages and progress go to stderr one line at a time through
//! [`write_stderr_line`]. A successful run's [`PreflightSummary`] can be
//! rendered for humans or as JSON.

use crate::pipeline::PreflightSummary;
use std::io::Write;

/// Write `message` and a newline to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}

/// Format a summary for human-readable output.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use release_preflight::output::format_human;
/// use release_preflight::pipeline::PreflightSummary;
///
/// let summary = PreflightSummary {
///     name: "demo".to_owned(),
///     version: "1.0.0".to_owned(),
///     jobs: vec!["worker".to_owned()],
///     packages: Vec::new(),
///     deployment: Utf8PathBuf::from("deploy.yml"),
/// };
/// assert!(format_human(&summary).starts_with("Release 'demo/1.0.0' is ready to deploy"));
/// ```
#[must_use]
pub fn format_human(summary: &PreflightSummary) -> String {
    let mut output = format!(
        "Release '{}/{}' is ready to deploy with {}\n",
        summary.name, summary.version, summary.deployment
    );

    output.push_str(&format!("  Jobs ({}):\n", summary.jobs.len()));
    for job in &summary.jobs {
        output.push_str(&format!("    - {job}\n"));
    }
    output.push_str(&format!("  Packages ({}):\n", summary.packages.len()));
    for package in &summary.packages {
        output.push_str(&format!("    - {package}\n"));
    }

    output
}

/// Format a summary as pretty-printed JSON.
#[must_use]
pub fn format_json(summary: &PreflightSummary) -> String {
    serde_json::to_string_pretty(summary).unwrap_or_else(|_| "{}".to_owned())
}
