//! Report rendering for the terminal and for machines.

use anyhow::{Context, Result};
use colored::Colorize;
use posture_conventions::{CheckOutcome, ConventionReport};
use serde::Serialize;

#[derive(Serialize)]
struct JsonReport<'a> {
    files_scanned: usize,
    passed: bool,
    #[serde(flatten)]
    report: &'a ConventionReport,
}

/// Render the report as pretty-printed JSON.
///
/// # Errors
///
/// Fails only if serialization fails.
pub fn render_json(report: &ConventionReport, files_scanned: usize) -> Result<String> {
    let wrapped = JsonReport {
        files_scanned,
        passed: report.passed(),
        report,
    };
    serde_json::to_string_pretty(&wrapped).context("failed to serialize report")
}

fn render_outcome(outcome: &CheckOutcome) -> Vec<String> {
    let head = format!("{} {}", outcome.rule.code().bold(), outcome.title);
    if outcome.passed() {
        return vec![format!("{head} ... {}", "ok".green())];
    }

    let mut lines = vec![format!(
        "{head} ... {} ({})",
        "FAILED".red().bold(),
        outcome.findings.len()
    )];
    for finding in &outcome.findings {
        lines.push(format!(
            "    {}: {}",
            finding.subject.to_string().yellow(),
            finding.kind.describe()
        ));
        lines.push(format!("      {}", finding.remediation.dimmed()));
    }
    lines
}

/// Render the report for a terminal.
#[must_use]
pub fn render_text(report: &ConventionReport, files_scanned: usize) -> String {
    let mut lines = vec![format!(
        "Checked {} controller(s) from {files_scanned} manifest file(s)",
        report.controllers_scanned
    )];
    lines.push(String::new());
    lines.extend(report.outcomes.iter().flat_map(render_outcome));
    lines.push(String::new());

    let failed = report.failed().count();
    if failed == 0 {
        lines.push(format!(
            "{} all {} rule(s) passed",
            "OK".green().bold(),
            report.outcomes.len()
        ));
    } else {
        lines.push(format!(
            "{} {failed} of {} rule(s) failed with {} finding(s)",
            "FAILED".red().bold(),
            report.outcomes.len(),
            report.finding_count()
        ));
    }
    lines.join("\n")
}
