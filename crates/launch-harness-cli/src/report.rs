// crates/launch-harness-cli/src/report.rs
// ============================================================================
// Module: CLI Reports
// Description: Text and JSON rendering of case outcomes.
// Purpose: Give humans and tooling a stable view of what each case did.
// Dependencies: launch-harness-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Reports are built from [`CaseOutcome`] values. Captured bytes are rendered
//! lossily as UTF-8; byte totals and truncation flags are reported alongside
//! so a capped or binary stream is never mistaken for complete text.

// ============================================================================
// SECTION: Imports
// ============================================================================

use launch_harness_core::CaseOutcome;
use launch_harness_core::CapturedStream;
use launch_harness_core::ExitOutcome;
use launch_harness_core::OutcomeKind;
use serde::Serialize;

// ============================================================================
// SECTION: Report Types
// ============================================================================

/// Serializable view of one captured stream.
#[derive(Debug, Serialize)]
pub(crate) struct StreamReport {
    /// Captured bytes as lossy UTF-8.
    text: String,
    /// Bytes retained in the capture.
    captured_bytes: usize,
    /// Bytes the child wrote in total.
    total_bytes: u64,
    /// True when bytes past the cap were discarded.
    truncated: bool,
    /// True when the pipe was abandoned before end of file.
    incomplete: bool,
}

impl StreamReport {
    /// Builds a stream report from a capture.
    fn from_stream(stream: &CapturedStream) -> Self {
        Self {
            text: stream.to_text(),
            captured_bytes: stream.bytes.len(),
            total_bytes: stream.total_bytes,
            truncated: stream.truncated,
            incomplete: stream.incomplete,
        }
    }
}

/// Serializable view of one case outcome.
#[derive(Debug, Serialize)]
pub(crate) struct CaseReport {
    /// Case label.
    name: String,
    /// Display form of the argv.
    command_line: String,
    /// Stable outcome label.
    outcome: &'static str,
    /// Exit code the case expected.
    expected_exit_code: i32,
    /// Actual exit code (128 + signal when signaled).
    exit_code: Option<i32>,
    /// Terminating signal, when any.
    signal: Option<i32>,
    /// Wall-clock duration in milliseconds.
    duration_ms: u64,
    /// Failure description.
    detail: Option<String>,
    /// Captured stdout.
    stdout: StreamReport,
    /// Captured stderr.
    stderr: StreamReport,
}

impl CaseReport {
    /// Builds a report from an outcome.
    pub(crate) fn from_outcome(outcome: &CaseOutcome) -> Self {
        let signal = match outcome.exit {
            Some(ExitOutcome::Signaled(signal)) => Some(signal),
            _ => None,
        };
        Self {
            name: outcome.name.clone(),
            command_line: outcome.command_line.clone(),
            outcome: outcome.kind.as_str(),
            expected_exit_code: outcome.expected_exit_code,
            exit_code: outcome.exit_code(),
            signal,
            duration_ms: millis(outcome.output.duration),
            detail: outcome.detail.clone(),
            stdout: StreamReport::from_stream(&outcome.output.stdout),
            stderr: StreamReport::from_stream(&outcome.output.stderr),
        }
    }
}

/// Aggregate counts for a suite run.
#[derive(Debug, Serialize)]
pub(crate) struct SummaryReport {
    /// Cases executed.
    total: usize,
    /// Cases whose exit code matched.
    passed: usize,
    /// Cases that failed for any reason.
    failed: usize,
    /// Exit code of the harness process.
    exit_code: u8,
}

/// Serializable view of a suite run.
#[derive(Debug, Serialize)]
pub(crate) struct SuiteReport {
    /// Per-case reports in suite order.
    cases: Vec<CaseReport>,
    /// Aggregate counts.
    summary: SummaryReport,
}

impl SuiteReport {
    /// Builds a suite report from outcomes in suite order.
    pub(crate) fn from_outcomes(outcomes: &[CaseOutcome]) -> Self {
        let passed = outcomes.iter().filter(|outcome| outcome.kind.is_passed()).count();
        Self {
            cases: outcomes.iter().map(CaseReport::from_outcome).collect(),
            summary: SummaryReport {
                total: outcomes.len(),
                passed,
                failed: outcomes.len() - passed,
                exit_code: suite_exit_code(outcomes),
            },
        }
    }
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Returns the harness exit code for a suite: the most severe outcome.
pub(crate) fn suite_exit_code(outcomes: &[CaseOutcome]) -> u8 {
    OutcomeKind::most_severe(outcomes.iter().map(|outcome| outcome.kind)).exit_code()
}

/// Renders a single outcome with both captured streams.
pub(crate) fn render_case_text(outcome: &CaseOutcome) -> String {
    let mut lines = vec![
        format!("case: {}", outcome.name),
        format!("command: {}", outcome.command_line),
        format!("outcome: {}", outcome.kind.as_str()),
    ];
    match outcome.exit {
        Some(exit) => lines.push(format!("exit: {exit} (expected {})", outcome.expected_exit_code)),
        None => lines.push(format!("exit: none (expected {})", outcome.expected_exit_code)),
    }
    lines.push(format!("duration_ms: {}", millis(outcome.output.duration)));
    if let Some(detail) = &outcome.detail {
        lines.push(format!("detail: {detail}"));
    }
    lines.push(stream_heading("stdout", &outcome.output.stdout));
    push_stream_text(&mut lines, &outcome.output.stdout);
    lines.push(stream_heading("stderr", &outcome.output.stderr));
    push_stream_text(&mut lines, &outcome.output.stderr);
    lines.join("\n")
}

/// Renders one summary line per outcome followed by totals.
pub(crate) fn render_suite_text(outcomes: &[CaseOutcome]) -> String {
    let report = SuiteReport::from_outcomes(outcomes);
    let mut lines = Vec::with_capacity(outcomes.len() + 1);
    for outcome in outcomes {
        let exit = outcome.exit.map_or_else(|| "no exit".to_string(), |exit| exit.to_string());
        let mut line = format!(
            "[{}] {} ({exit}, {} ms)",
            outcome.kind.as_str(),
            outcome.name,
            millis(outcome.output.duration)
        );
        if let Some(detail) = &outcome.detail {
            line.push_str(": ");
            line.push_str(detail);
        }
        lines.push(line);
    }
    lines.push(format!(
        "total={} passed={} failed={} exit_code={}",
        report.summary.total, report.summary.passed, report.summary.failed, report.summary.exit_code
    ));
    lines.join("\n")
}

/// Renders a serializable report as pretty JSON.
pub(crate) fn render_json<T: Serialize>(report: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Formats the heading line for a captured stream.
fn stream_heading(label: &str, stream: &CapturedStream) -> String {
    let mut size = if stream.truncated {
        format!("{} of {} bytes, truncated", stream.bytes.len(), stream.total_bytes)
    } else {
        format!("{} bytes", stream.bytes.len())
    };
    if stream.incomplete {
        size.push_str(", incomplete");
    }
    format!("--- {label} ({size}) ---")
}

/// Appends captured text without a trailing empty line.
fn push_stream_text(lines: &mut Vec<String>, stream: &CapturedStream) {
    if stream.is_empty() {
        return;
    }
    let text = stream.to_text();
    lines.push(text.strip_suffix('\n').unwrap_or(&text).to_string());
}

/// Converts a duration to whole milliseconds.
fn millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
