// crates/launch-harness-core/src/error.rs
// ============================================================================
// Module: Harness Errors
// Description: Failure taxonomy for a single invocation.
// Purpose: Return structured failures that always carry captured output.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`HarnessError`] covers the fatal outcomes of one invocation. Exit code
//! mismatches are not errors here: the process ran to completion and the
//! caller judges the result with [`InvocationResult::verdict`](crate::InvocationResult::verdict).
//! The harness never retries; retry policy belongs to the caller.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::capture::CapturedOutput;
use crate::case::CaseError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fatal outcome of an invocation.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The case was rejected before spawning.
    #[error("invalid test case: {0}")]
    InvalidCase(#[from] CaseError),
    /// The executable could not be found or executed.
    #[error("failed to spawn {}: {source}", .program.display())]
    Spawn {
        /// Executable that failed to start.
        program: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
    /// The deadline elapsed; the child and its descendants were killed.
    #[error("timed out after {} ms", .timeout.as_millis())]
    Timeout {
        /// Configured deadline.
        timeout: Duration,
        /// Output captured before termination.
        partial: CapturedOutput,
    },
    /// Stream capture or process supervision failed mid-run.
    #[error("stream capture failed: {message}")]
    Io {
        /// Description of the failure.
        message: String,
        /// Output captured before the failure.
        partial: CapturedOutput,
    },
}

impl HarnessError {
    /// Returns the output captured before the failure, when any was taken.
    #[must_use]
    pub const fn partial_output(&self) -> Option<&CapturedOutput> {
        match self {
            Self::Timeout {
                partial, ..
            }
            | Self::Io {
                partial, ..
            } => Some(partial),
            Self::InvalidCase(_)
            | Self::Spawn {
                ..
            } => None,
        }
    }
}
