// crates/launch-harness-core/src/runner.rs
// ============================================================================
// Module: Invocation Runner
// Description: Spawn, capture, wait, and time out external invocations.
// Purpose: Turn a TestCase into an InvocationResult or a structured failure.
// Dependencies: tokio, tracing
// ============================================================================

//! ## Overview
//! [`Harness::run`] spawns exactly one child per [`TestCase`], drains both
//! output pipes concurrently with the wait, and enforces the case deadline.
//! On timeout the whole process group is killed, the child is reaped, and the
//! output captured so far is returned inside [`HarnessError::Timeout`].
//!
//! Invariants:
//! - The wait is the only suspension point that depends on the child.
//! - Each invocation owns its child and buffers; nothing is shared between
//!   concurrent runs.
//! - Errors are returned, never swallowed; the harness never retries.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::ChildStdin;
use tokio::sync::Semaphore;
use tokio::task::AbortHandle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::Instrument;
use tracing::debug;
use tracing::info_span;
use tracing::warn;

use crate::capture::CapturedOutput;
use crate::capture::SharedCapture;
use crate::case::CaseError;
use crate::case::TestCase;
use crate::error::HarnessError;
use crate::outcome::CaseOutcome;
use crate::process::build_command;
use crate::process::kill_process_tree;
use crate::result::ExitOutcome;
use crate::result::InvocationResult;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default time allowed for pipes to close after the child exits or is killed.
pub const DEFAULT_DRAIN_GRACE: Duration = Duration::from_secs(5);
/// Floor for the post-exit drain budget when a deadline is nearly spent.
const MIN_DRAIN_BUDGET: Duration = Duration::from_millis(100);

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Runs [`TestCase`]s as child processes.
///
/// # Invariants
/// - Cheap to clone; clones share no mutable state.
#[derive(Debug, Clone)]
pub struct Harness {
    /// Time allowed for output pipes to close after exit or kill.
    drain_grace: Duration,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    /// Creates a harness with the default drain grace period.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            drain_grace: DEFAULT_DRAIN_GRACE,
        }
    }

    /// Overrides how long to wait for output pipes to close.
    ///
    /// When the child exits but descendants keep its pipes open, the harness
    /// waits for the remaining deadline (or this grace period without one)
    /// before killing the process group.
    #[must_use]
    pub const fn with_drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace = grace;
        self
    }

    /// Runs `case` to completion or timeout.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidCase`] when validation fails,
    /// [`HarnessError::Spawn`] when the executable cannot be started,
    /// [`HarnessError::Timeout`] when the deadline elapses, and
    /// [`HarnessError::Io`] when stream capture fails.
    pub async fn run(&self, case: &TestCase) -> Result<InvocationResult, HarnessError> {
        case.validate()?;
        let span = info_span!("invocation", case = %case.display_name());
        self.run_validated(case).instrument(span).await
    }

    /// Runs `case` on a private current-thread runtime, blocking the caller.
    ///
    /// # Errors
    ///
    /// Same as [`Harness::run`]. Calling from inside an async runtime, or a
    /// runtime that fails to start, is reported as [`HarnessError::Io`]
    /// without spawning anything.
    pub fn run_blocking(&self, case: &TestCase) -> Result<InvocationResult, HarnessError> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(HarnessError::Io {
                message: "run_blocking called from within an async runtime; use Harness::run"
                    .to_string(),
                partial: CapturedOutput::default(),
            });
        }
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(
            |err| HarnessError::Io {
                message: format!("failed to start runtime: {err}"),
                partial: CapturedOutput::default(),
            },
        )?;
        runtime.block_on(self.run(case))
    }

    /// Runs every case with at most `parallelism` children in flight.
    ///
    /// Results are returned in input order, one per case.
    pub async fn run_all(
        &self,
        cases: Vec<TestCase>,
        parallelism: NonZeroUsize,
    ) -> Vec<Result<InvocationResult, HarnessError>> {
        let limiter = Arc::new(Semaphore::new(parallelism.get()));
        let handles: Vec<JoinHandle<Result<InvocationResult, HarnessError>>> = cases
            .into_iter()
            .map(|case| {
                let harness = self.clone();
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    let _permit = limiter.acquire_owned().await;
                    harness.run(&case).await
                })
            })
            .collect();
        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            let result = handle.await.unwrap_or_else(|err| {
                Err(HarnessError::Io {
                    message: format!("invocation task failed: {err}"),
                    partial: CapturedOutput::default(),
                })
            });
            results.push(result);
        }
        results
    }

    /// Runs `case` and folds the result and verdict into a [`CaseOutcome`].
    pub async fn evaluate(&self, case: &TestCase) -> CaseOutcome {
        CaseOutcome::from_run(case, self.run(case).await)
    }

    /// Evaluates every case concurrently; outcomes keep input order.
    pub async fn evaluate_all(
        &self,
        cases: Vec<TestCase>,
        parallelism: NonZeroUsize,
    ) -> Vec<CaseOutcome> {
        let results = self.run_all(cases.clone(), parallelism).await;
        cases.iter().zip(results).map(|(case, result)| CaseOutcome::from_run(case, result)).collect()
    }

    /// Spawns and supervises an already validated case.
    async fn run_validated(&self, case: &TestCase) -> Result<InvocationResult, HarnessError> {
        let started = Instant::now();
        let deadline = match case.timeout {
            Some(timeout) => Some(
                started
                    .checked_add(timeout)
                    .ok_or(HarnessError::InvalidCase(CaseError::TimeoutTooLarge(timeout)))?,
            ),
            None => None,
        };
        let mut child = build_command(case).spawn().map_err(|source| {
            debug!(error = %source, "spawn failed");
            HarnessError::Spawn {
                program: case.executable.clone(),
                source,
            }
        })?;
        let pid = child.id();
        debug!(pid, command = %case.command_line(), "spawned child");

        let stdout = SharedCapture::new(case.output_limit);
        let stderr = SharedCapture::new(case.output_limit);
        let mut tasks: Vec<JoinHandle<std::io::Result<()>>> = Vec::with_capacity(3);
        if let Some(pipe) = child.stdout.take() {
            tasks.push(tokio::spawn(stdout.clone().drain(pipe)));
        }
        if let Some(pipe) = child.stderr.take() {
            tasks.push(tokio::spawn(stderr.clone().drain(pipe)));
        }
        if let (Some(pipe), Some(bytes)) = (child.stdin.take(), case.stdin.clone()) {
            tasks.push(tokio::spawn(feed_stdin(pipe, bytes)));
        }
        let collect = || CapturedOutput {
            stdout: stdout.snapshot(),
            stderr: stderr.snapshot(),
            duration: started.elapsed(),
        };
        let settle = |drained: Drained| {
            if matches!(drained, Drained::Expired) {
                stdout.mark_abandoned();
                stderr.mark_abandoned();
            }
            drained
        };

        let waited = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, child.wait()).await.ok(),
            None => Some(child.wait().await),
        };
        let status = match waited {
            Some(Ok(status)) => status,
            Some(Err(err)) => {
                warn!(pid, error = %err, "waiting for child failed; killing process tree");
                kill_process_tree(&mut child, pid);
                settle(drain(tasks, self.drain_grace).await);
                return Err(HarnessError::Io {
                    message: format!("wait for child failed: {err}"),
                    partial: collect(),
                });
            }
            None => {
                let timeout = case.timeout.unwrap_or_default();
                warn!(pid, timeout_ms = millis(timeout), "deadline elapsed; killing process tree");
                kill_process_tree(&mut child, pid);
                if tokio::time::timeout(self.drain_grace, child.wait()).await.is_err() {
                    warn!(pid, "child not reaped within grace period after kill");
                }
                settle(drain(tasks, self.drain_grace).await);
                return Err(HarnessError::Timeout {
                    timeout,
                    partial: collect(),
                });
            }
        };

        let exit = ExitOutcome::from_status(status);
        let budget = deadline.map_or(self.drain_grace, |deadline| {
            deadline.saturating_duration_since(Instant::now()).max(MIN_DRAIN_BUDGET)
        });
        let failures = match settle(drain(tasks, budget).await) {
            Drained::Complete(failures) => failures,
            Drained::Expired => {
                kill_process_tree(&mut child, pid);
                if let Some(timeout) = case.timeout {
                    warn!(pid, "descendants held output pipes past the deadline");
                    return Err(HarnessError::Timeout {
                        timeout,
                        partial: collect(),
                    });
                }
                warn!(
                    pid,
                    "descendants held output pipes after exit; process group killed, output marked incomplete"
                );
                Vec::new()
            }
        };
        if let Some(message) = failures.into_iter().next() {
            warn!(pid, error = %message, "stream capture failed");
            return Err(HarnessError::Io {
                message,
                partial: collect(),
            });
        }

        let output = collect();
        debug!(pid, %exit, duration_ms = millis(output.duration), "child completed");
        Ok(InvocationResult {
            exit,
            stdout: output.stdout,
            stderr: output.stderr,
            duration: output.duration,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Result of waiting for capture tasks.
enum Drained {
    /// All tasks finished; carries any failure messages.
    Complete(Vec<String>),
    /// The budget elapsed and the remaining tasks were aborted.
    Expired,
}

/// Waits up to `budget` for capture tasks, aborting stragglers.
async fn drain(tasks: Vec<JoinHandle<std::io::Result<()>>>, budget: Duration) -> Drained {
    let aborts: Vec<AbortHandle> = tasks.iter().map(JoinHandle::abort_handle).collect();
    let joined = async move {
        let mut failures = Vec::new();
        for task in tasks {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => failures.push(err.to_string()),
                Err(err) => failures.push(format!("capture task failed: {err}")),
            }
        }
        failures
    };
    if let Ok(failures) = tokio::time::timeout(budget, joined).await {
        Drained::Complete(failures)
    } else {
        for abort in aborts {
            abort.abort();
        }
        Drained::Expired
    }
}

/// Converts a duration to whole milliseconds for log fields.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Writes `bytes` to the child's stdin and closes it.
///
/// A child that exits without reading its input is not a capture failure.
async fn feed_stdin(mut pipe: ChildStdin, bytes: Vec<u8>) -> std::io::Result<()> {
    match pipe.write_all(&bytes).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        Err(err) => Err(err),
    }
}
