// crates/launch-harness-core/src/outcome.rs
// ============================================================================
// Module: Case Outcomes
// Description: Reportable outcome of one case, success or failure.
// Purpose: Fold results, verdicts, and errors into a single value for reports.
// Dependencies: crate::result, crate::error
// ============================================================================

//! ## Overview
//! A [`CaseOutcome`] is what reporters consume: a stable outcome kind, the
//! captured output (complete or partial), and a human-readable detail
//! message. [`OutcomeKind::exit_code`] maps each kind onto the harness CLI
//! exit-code contract.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::capture::CapturedOutput;
use crate::case::TestCase;
use crate::error::HarnessError;
use crate::result::ExitOutcome;
use crate::result::InvocationResult;
use crate::result::Verdict;

// ============================================================================
// SECTION: Outcome Kind
// ============================================================================

/// Classification of a case outcome.
///
/// # Invariants
/// - Variants and labels are stable for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    /// Exit code matched the expectation.
    Passed,
    /// Process ran but exited with an unexpected code.
    ExitMismatch,
    /// Case rejected before spawning.
    InvalidCase,
    /// Executable missing or not runnable.
    SpawnError,
    /// Stream capture failed mid-run.
    IoError,
    /// Deadline elapsed; process tree killed.
    TimeoutError,
}

impl OutcomeKind {
    /// Returns a stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::ExitMismatch => "exit_mismatch",
            Self::InvalidCase => "invalid_case",
            Self::SpawnError => "spawn_error",
            Self::IoError => "io_error",
            Self::TimeoutError => "timeout_error",
        }
    }

    /// Returns the harness exit code: 0 pass, 1 mismatch, 2 spawn/io, 3 timeout.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Passed => 0,
            Self::ExitMismatch => 1,
            Self::InvalidCase | Self::SpawnError | Self::IoError => 2,
            Self::TimeoutError => 3,
        }
    }

    /// Returns true for [`OutcomeKind::Passed`].
    #[must_use]
    pub const fn is_passed(self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Returns the kind with the highest exit code, or `Passed` when empty.
    #[must_use]
    pub fn most_severe<I>(kinds: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        kinds.into_iter().max_by_key(|kind| kind.exit_code()).unwrap_or(Self::Passed)
    }
}

// ============================================================================
// SECTION: Case Outcome
// ============================================================================

/// Reportable outcome of one case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseOutcome {
    /// Case label.
    pub name: String,
    /// Display form of the argv.
    pub command_line: String,
    /// Outcome classification.
    pub kind: OutcomeKind,
    /// Exit code the case expected.
    pub expected_exit_code: i32,
    /// Terminal status when the child ran to completion.
    pub exit: Option<ExitOutcome>,
    /// Captured output, partial on timeout or capture failure.
    pub output: CapturedOutput,
    /// Failure description; `None` when passed.
    pub detail: Option<String>,
}

impl CaseOutcome {
    /// Builds an outcome from a case and its run result.
    #[must_use]
    pub fn from_run(case: &TestCase, run: Result<InvocationResult, HarnessError>) -> Self {
        let mut outcome = Self {
            name: case.display_name(),
            command_line: case.command_line(),
            kind: OutcomeKind::Passed,
            expected_exit_code: case.expected_exit_code,
            exit: None,
            output: CapturedOutput::default(),
            detail: None,
        };
        match run {
            Ok(result) => {
                outcome.exit = Some(result.exit);
                outcome.output = result.output();
                if let Verdict::ExitMismatch(mismatch) = result.verdict(case.expected_exit_code) {
                    outcome.kind = OutcomeKind::ExitMismatch;
                    outcome.detail = Some(mismatch.to_string());
                }
            }
            Err(err) => {
                outcome.kind = match &err {
                    HarnessError::InvalidCase(_) => OutcomeKind::InvalidCase,
                    HarnessError::Spawn {
                        ..
                    } => OutcomeKind::SpawnError,
                    HarnessError::Timeout {
                        ..
                    } => OutcomeKind::TimeoutError,
                    HarnessError::Io {
                        ..
                    } => OutcomeKind::IoError,
                };
                outcome.detail = Some(err.to_string());
                if let Some(partial) = err.partial_output() {
                    outcome.output = partial.clone();
                }
            }
        }
        outcome
    }

    /// Returns the actual exit code when the child completed.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        self.exit.map(ExitOutcome::code)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
