//! Rendering of a finished run to a human- or machine-readable sink
//!
//! The reporter is a pure function of (ledger, outcome): it never mutates the
//! ledger, never recomputes status, and rendering the same inputs twice
//! produces byte-identical output. The returned value is the process exit
//! code taken straight from the outcome.

use crate::check::{RunOutcome, StatusLedger};
use serde::Serialize;
use std::io::{self, Write};

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    Text,
    Json,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    checks: &'a [crate::check::CheckResult],
    overall: crate::check::Overall,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: &'a Option<String>,
    exit_code: i32,
}

/// Render the ledger and outcome to a string.
///
/// With `quiet` set, per-component lines are suppressed and only the overall
/// verdict is rendered (text format only; JSON always carries everything).
pub fn render(ledger: &StatusLedger, outcome: &RunOutcome, format: Format, quiet: bool) -> String {
    match format {
        Format::Json => {
            let report = JsonReport {
                checks: ledger.all(),
                overall: outcome.overall,
                message: &outcome.message,
                exit_code: outcome.exit_code(),
            };
            // A plain struct of strings and enums cannot fail to serialize
            serde_json::to_string_pretty(&report).unwrap_or_default()
        }
        Format::Text => {
            let mut out = String::new();
            if !quiet {
                for result in ledger.all() {
                    out.push_str(&format!(
                        "[{:<8}] {:<20} {}\n",
                        result.status.tag(),
                        result.component,
                        result.message
                    ));
                }
            }
            match &outcome.message {
                Some(message) => {
                    out.push_str(&format!("overall: {} ({})\n", outcome.overall, message))
                }
                None => out.push_str(&format!("overall: {}\n", outcome.overall)),
            }
            out
        }
    }
}

/// Write the rendered report to a sink and return the exit code.
pub fn report<W: Write>(
    sink: &mut W,
    ledger: &StatusLedger,
    outcome: &RunOutcome,
    format: Format,
    quiet: bool,
) -> io::Result<i32> {
    sink.write_all(render(ledger, outcome, format, quiet).as_bytes())?;
    Ok(outcome.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{aggregate, CheckResult, RunOutcome, StatusLedger};

    fn sample_ledger() -> StatusLedger {
        let mut ledger = StatusLedger::new();
        ledger.record(CheckResult::healthy("workload", "3/3 pods ready"));
        ledger.record(CheckResult::warning("cache", "no endpoints found"));
        ledger
    }

    #[test]
    fn test_text_report_lines() {
        let ledger = sample_ledger();
        let outcome = aggregate(&ledger);
        let rendered = render(&ledger, &outcome, Format::Text, false);

        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("[HEALTHY "));
        assert!(lines[0].contains("workload"));
        assert!(lines[1].contains("no endpoints found"));
        assert_eq!(lines[2], "overall: WARNING");
    }

    #[test]
    fn test_quiet_text_report_only_summary() {
        let ledger = sample_ledger();
        let outcome = aggregate(&ledger);
        let rendered = render(&ledger, &outcome, Format::Text, true);
        assert_eq!(rendered, "overall: WARNING\n");
    }

    #[test]
    fn test_fatal_report_with_empty_ledger() {
        let ledger = StatusLedger::new();
        let outcome = RunOutcome::fatal("cannot reach Kubernetes API: connection refused");
        let rendered = render(&ledger, &outcome, Format::Text, false);
        assert_eq!(
            rendered,
            "overall: FATAL (cannot reach Kubernetes API: connection refused)\n"
        );
    }

    #[test]
    fn test_report_is_idempotent_and_returns_exit_code() {
        let ledger = sample_ledger();
        let outcome = aggregate(&ledger);

        let mut first = Vec::new();
        let mut second = Vec::new();
        let code_first = report(&mut first, &ledger, &outcome, Format::Text, false).unwrap();
        let code_second = report(&mut second, &ledger, &outcome, Format::Text, false).unwrap();

        assert_eq!(first, second);
        assert_eq!(code_first, 1);
        assert_eq!(code_second, 1);
    }

    #[test]
    fn test_json_report_shape() {
        let ledger = sample_ledger();
        let outcome = aggregate(&ledger);
        let rendered = render(&ledger, &outcome, Format::Json, false);

        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed["overall"], "warning");
        assert_eq!(parsed["exit_code"], 1);
        assert_eq!(parsed["checks"].as_array().unwrap().len(), 2);
        assert_eq!(parsed["checks"][0]["component"], "workload");
        assert_eq!(parsed["checks"][1]["status"], "warning");
    }
}
