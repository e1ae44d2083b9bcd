// crates/launch-harness-core/src/result.rs
// ============================================================================
// Module: Invocation Results
// Description: Terminal status, captured output, and exit-code verdicts.
// Purpose: Hand the caller an owned record of what the child did.
// Dependencies: std, thiserror
// ============================================================================

//! ## Overview
//! An [`InvocationResult`] is created once the child has terminated and all
//! of its output has been collected. It is owned solely by the caller.
//! Comparing the exit code against an expectation yields a [`Verdict`];
//! a mismatch is reportable but never fatal to the harness.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

use crate::capture::CapturedOutput;
use crate::capture::CapturedStream;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Offset added to a signal number to form a shell-style exit code.
const SIGNAL_EXIT_OFFSET: i32 = 128;

// ============================================================================
// SECTION: Exit Outcome
// ============================================================================

/// Terminal status of a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The child exited with a code.
    Exited(i32),
    /// The child was terminated by a signal (unix only).
    Signaled(i32),
}

impl ExitOutcome {
    /// Returns the exit code, mapping signal `n` to `128 + n`.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Exited(code) => code,
            Self::Signaled(signal) => SIGNAL_EXIT_OFFSET.saturating_add(signal),
        }
    }

    /// Converts an OS exit status.
    #[must_use]
    pub fn from_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self::Exited(code);
        }
        signal_of(status).map_or(Self::Exited(-1), Self::Signaled)
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exit code {code}"),
            Self::Signaled(signal) => write!(f, "signal {signal}"),
        }
    }
}

// ============================================================================
// SECTION: Invocation Result
// ============================================================================

/// Captured outcome of a completed invocation.
///
/// # Invariants
/// - `exit` reflects the child's terminal status exactly.
/// - Streams are complete unless their `truncated` flag is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    /// Terminal status.
    pub exit: ExitOutcome,
    /// Captured standard output.
    pub stdout: CapturedStream,
    /// Captured standard error.
    pub stderr: CapturedStream,
    /// Wall-clock time from spawn to completion.
    pub duration: Duration,
}

impl InvocationResult {
    /// Returns the exit code (see [`ExitOutcome::code`]).
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.exit.code()
    }

    /// Judges the exit code against `expected`.
    #[must_use]
    pub const fn verdict(&self, expected: i32) -> Verdict {
        let actual = self.exit_code();
        if actual == expected {
            Verdict::Passed
        } else {
            Verdict::ExitMismatch(ExitMismatch {
                expected,
                actual,
            })
        }
    }

    /// Returns `Err` when the exit code differs from `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`ExitMismatch`] describing both codes.
    pub const fn check(&self, expected: i32) -> Result<(), ExitMismatch> {
        match self.verdict(expected) {
            Verdict::Passed => Ok(()),
            Verdict::ExitMismatch(mismatch) => Err(mismatch),
        }
    }

    /// Returns true when either stream was truncated by a cap.
    #[must_use]
    pub const fn any_truncated(&self) -> bool {
        self.stdout.truncated || self.stderr.truncated
    }

    /// Returns the captured streams and duration as a [`CapturedOutput`].
    #[must_use]
    pub fn output(&self) -> CapturedOutput {
        CapturedOutput {
            stdout: self.stdout.clone(),
            stderr: self.stderr.clone(),
            duration: self.duration,
        }
    }
}

/// Exit-code judgement for a completed invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The exit code matched the expectation.
    Passed,
    /// The process ran but exited with an unexpected code.
    ExitMismatch(ExitMismatch),
}

/// Expected versus actual exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("exit code mismatch: expected {expected}, got {actual}")]
pub struct ExitMismatch {
    /// Expected exit code.
    pub expected: i32,
    /// Actual exit code.
    pub actual: i32,
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the terminating signal on unix.
#[cfg(unix)]
fn signal_of(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

/// Signals do not exist off unix.
#[cfg(not(unix))]
const fn signal_of(_status: ExitStatus) -> Option<i32> {
    None
}

// ============================================================================
// SECTION: Tests
// ============================================================================
