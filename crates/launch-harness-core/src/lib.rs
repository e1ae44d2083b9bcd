// crates/launch-harness-core/src/lib.rs
// ============================================================================
// Module: Launch Harness Core Library
// Description: Invocation harness for exercising external pipeline tools.
// Purpose: Spawn one external process per test case and report its outcome.
// Dependencies: tokio, thiserror, tracing, nix (unix)
// ============================================================================

//! ## Overview
//! `launch-harness-core` turns a declarative [`TestCase`] into exactly one
//! child process, captures its standard streams, waits for termination or a
//! deadline, and returns an [`InvocationResult`]. Arguments are passed as an
//! argv vector and never through a shell.
//!
//! Invariants:
//! - Argument order is preserved exactly as declared.
//! - Invocations share no mutable state and may run concurrently.
//! - Timeouts terminate the child and its descendants before returning.
//! - Timeouts and capture failures carry the output captured so far.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod capture;
pub mod case;
pub mod error;
pub mod launch;
pub mod outcome;
mod process;
pub mod result;
pub mod runner;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use capture::CapturedOutput;
pub use capture::CapturedStream;
pub use case::CaseError;
pub use case::MAX_TIMEOUT;
pub use case::TestCase;
pub use error::HarnessError;
pub use launch::DEFAULT_LAUNCH_TOOL;
pub use launch::DebugEntry;
pub use launch::DebugFilter;
pub use launch::DebugFilterError;
pub use launch::LaunchSpec;
pub use outcome::CaseOutcome;
pub use outcome::OutcomeKind;
pub use result::ExitMismatch;
pub use result::ExitOutcome;
pub use result::InvocationResult;
pub use result::Verdict;
pub use runner::Harness;
