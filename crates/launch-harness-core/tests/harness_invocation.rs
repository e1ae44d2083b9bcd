// crates/launch-harness-core/tests/harness_invocation.rs
// ============================================================================
// Module: Harness Invocation Tests
// Description: End-to-end invocations of real executables through the harness.
// Purpose: Verify exit codes, argv order, capture, timeouts, and concurrency.
// Dependencies: launch-harness-core, tokio
// ============================================================================

//! ## Overview
//! Runs small, well-known unix executables (`sh`, `printf`, `head`, `cat`,
//! `true`, `false`) through the harness and checks the observable contract:
//! exact exit codes, argv order, complete or explicitly truncated capture,
//! bounded timeouts that leave no orphans, and independent concurrent runs.

#![cfg(unix)]
#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::num::NonZeroUsize;
use std::time::Duration;
use std::time::Instant;

use launch_harness_core::CaseError;
use launch_harness_core::ExitMismatch;
use launch_harness_core::ExitOutcome;
use launch_harness_core::Harness;
use launch_harness_core::HarnessError;
use launch_harness_core::OutcomeKind;
use launch_harness_core::TestCase;
use launch_harness_core::Verdict;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a case that runs `script` through `sh -c`.
fn sh(script: &str) -> TestCase {
    TestCase::new("sh").args(["-c", script])
}

/// Returns true while `pid` names a live (non-zombie) process.
#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => {
            let state = stat.rsplit_once(')').and_then(|(_, rest)| rest.trim_start().chars().next());
            !matches!(state, Some('Z' | 'X'))
        }
        Err(_) => false,
    }
}

// ============================================================================
// SECTION: Exit Codes
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn reports_exact_exit_code() {
    let result = Harness::new().run(&sh("exit 7").expect_exit_code(7)).await.unwrap();
    assert_eq!(result.exit_code(), 7);
    assert_eq!(result.exit, ExitOutcome::Exited(7));
    assert_eq!(result.verdict(7), Verdict::Passed);
}

#[tokio::test(flavor = "multi_thread")]
async fn true_exits_zero_with_empty_streams() {
    let result = Harness::new().run(&TestCase::new("true")).await.unwrap();
    assert_eq!(result.exit_code(), 0);
    assert!(result.stdout.is_empty());
    assert!(result.stderr.is_empty());
    assert!(!result.any_truncated());
}

#[tokio::test(flavor = "multi_thread")]
async fn false_expecting_zero_is_exit_mismatch() {
    let case = TestCase::new("false").expect_exit_code(0);
    let result = Harness::new().run(&case).await.unwrap();
    assert_eq!(
        result.verdict(case.expected_exit_code),
        Verdict::ExitMismatch(ExitMismatch {
            expected: 0,
            actual: 1,
        })
    );

    let outcome = Harness::new().evaluate(&case).await;
    assert_eq!(outcome.kind, OutcomeKind::ExitMismatch);
    assert_eq!(outcome.kind.exit_code(), 1);
    assert_eq!(outcome.exit_code(), Some(1));
    assert_eq!(outcome.detail.as_deref(), Some("exit code mismatch: expected 0, got 1"));
}

#[tokio::test(flavor = "multi_thread")]
async fn signal_termination_maps_to_shell_code() {
    let result = Harness::new().run(&sh("kill -9 $$")).await.unwrap();
    assert_eq!(result.exit, ExitOutcome::Signaled(9));
    assert_eq!(result.exit_code(), 137);
}

// ============================================================================
// SECTION: Arguments and Environment
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn argv_order_is_preserved_verbatim() {
    let args = ["a", "b c", "", "--flag=x", "$HOME", "*", "name=sink", "!", "sink."];
    let case = TestCase::new("printf").arg("%s\\n").args(args);
    let result = Harness::new().run(&case).await.unwrap();
    let expected: String = args.iter().map(|arg| format!("{arg}\n")).collect();
    assert_eq!(result.stdout.to_text(), expected);
}

#[tokio::test(flavor = "multi_thread")]
async fn env_overrides_and_removals_apply_per_case() {
    let case = sh("printf '%s|%s' \"$HARNESS_MARKER\" \"${HOME-unset}\"")
        .env("HARNESS_MARKER", "marker-value")
        .env_remove("HOME");
    let result = Harness::new().run(&case).await.unwrap();
    assert_eq!(result.stdout.to_text(), "marker-value|unset");
}

#[tokio::test(flavor = "multi_thread")]
async fn working_dir_is_applied() {
    let dir = std::env::temp_dir().canonicalize().unwrap();
    let result = Harness::new().run(&TestCase::new("pwd").working_dir(&dir)).await.unwrap();
    let printed = std::path::PathBuf::from(result.stdout.to_text().trim_end());
    assert_eq!(printed.canonicalize().unwrap(), dir);
}

#[tokio::test(flavor = "multi_thread")]
async fn stdin_bytes_reach_the_child() {
    let result = Harness::new().run(&TestCase::new("cat").stdin("fed through stdin")).await.unwrap();
    assert_eq!(result.stdout.to_text(), "fed through stdin");
}

// ============================================================================
// SECTION: Capture
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn uncapped_capture_is_complete() {
    let case = TestCase::new("head").args(["-c", "200000", "/dev/zero"]);
    let result = Harness::new().run(&case).await.unwrap();
    assert_eq!(result.stdout.bytes.len(), 200_000);
    assert_eq!(result.stdout.total_bytes, 200_000);
    assert!(!result.stdout.truncated);
}

#[tokio::test(flavor = "multi_thread")]
async fn capped_capture_flags_truncation() {
    let case = TestCase::new("head").args(["-c", "200000", "/dev/zero"]).output_limit(1_000);
    let result = Harness::new().run(&case).await.unwrap();
    assert_eq!(result.exit_code(), 0);
    assert_eq!(result.stdout.bytes.len(), 1_000);
    assert_eq!(result.stdout.total_bytes, 200_000);
    assert!(result.stdout.truncated);
    assert!(!result.stderr.truncated);
}

#[tokio::test(flavor = "multi_thread")]
async fn stderr_is_captured_separately() {
    let result = Harness::new().run(&sh("printf out; printf err >&2")).await.unwrap();
    assert_eq!(result.stdout.to_text(), "out");
    assert_eq!(result.stderr.to_text(), "err");
}

// ============================================================================
// SECTION: Failures
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn missing_executable_is_spawn_error() {
    let case = TestCase::new("/nonexistent/launch-harness-missing-tool");
    let err = Harness::new().run(&case).await.unwrap_err();
    assert!(matches!(err, HarnessError::Spawn { .. }), "unexpected error: {err}");
    assert!(err.partial_output().is_none());
    let outcome = Harness::new().evaluate(&case).await;
    assert_eq!(outcome.kind, OutcomeKind::SpawnError);
    assert_eq!(outcome.kind.exit_code(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_case_never_spawns() {
    let err = Harness::new().run(&TestCase::new("")).await.unwrap_err();
    assert!(matches!(err, HarnessError::InvalidCase(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn unrepresentable_timeout_is_rejected_without_panicking() {
    let case = TestCase::new("true").timeout(Duration::MAX);
    let err = Harness::new().run(&case).await.unwrap_err();
    assert!(
        matches!(err, HarnessError::InvalidCase(CaseError::TimeoutTooLarge(_))),
        "unexpected error: {err}"
    );
    let outcome = Harness::new().evaluate(&case).await;
    assert_eq!(outcome.kind, OutcomeKind::InvalidCase);
    assert_eq!(outcome.kind.exit_code(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn key_both_set_and_removed_is_rejected() {
    let case = sh("printf %s \"${FOO-unset}\"").env("FOO", "x").env_remove("FOO");
    let err = Harness::new().run(&case).await.unwrap_err();
    assert!(
        matches!(err, HarnessError::InvalidCase(CaseError::ConflictingEnv(ref key)) if key == "FOO"),
        "unexpected error: {err}"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn timeout_returns_promptly_with_partial_output() {
    let case = sh("echo started; sleep 30").timeout(Duration::from_millis(500));
    let started = Instant::now();
    let err = Harness::new().run(&case).await.unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(4), "took {:?}", started.elapsed());
    let HarnessError::Timeout {
        timeout,
        partial,
    } = err
    else {
        panic!("expected timeout, got {err}");
    };
    assert_eq!(timeout, Duration::from_millis(500));
    assert_eq!(partial.stdout.to_text(), "started\n");

    let outcome = Harness::new().evaluate(&case).await;
    assert_eq!(outcome.kind, OutcomeKind::TimeoutError);
    assert_eq!(outcome.kind.exit_code(), 3);
    assert!(outcome.exit.is_none());
}

#[cfg(target_os = "linux")]
#[tokio::test(flavor = "multi_thread")]
async fn timeout_kills_descendants() {
    let case = sh("sleep 30 & echo $!; wait").timeout(Duration::from_millis(500));
    let err = Harness::new().run(&case).await.unwrap_err();
    let partial = err.partial_output().expect("timeout carries partial output");
    let grandchild: u32 = partial.stdout.to_text().trim().parse().expect("background pid");
    let deadline = Instant::now() + Duration::from_secs(3);
    while process_alive(grandchild) && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert!(!process_alive(grandchild), "descendant {grandchild} survived the timeout");
}

#[tokio::test(flavor = "multi_thread")]
async fn lingering_descendants_do_not_hang_untimed_runs() {
    let harness = Harness::new().with_drain_grace(Duration::from_millis(300));
    let started = Instant::now();
    let result = harness.run(&sh("sleep 30 & echo parent-done")).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(result.exit_code(), 0);
    assert_eq!(result.stdout.to_text(), "parent-done\n");
    assert!(result.stdout.incomplete);
    assert!(result.stderr.incomplete);
    assert!(!result.stdout.truncated);
}

// ============================================================================
// SECTION: Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_runs_are_independent() {
    let cases: Vec<TestCase> = (0..8)
        .map(|index| {
            sh("printf '%s-' \"$0\"; sleep 0.2; printf '%s' \"$0\"")
                .arg(format!("case{index}"))
                .named(format!("case{index}"))
        })
        .collect();
    let parallelism = NonZeroUsize::new(4).unwrap();
    let results = Harness::new().run_all(cases, parallelism).await;
    assert_eq!(results.len(), 8);
    for (index, result) in results.into_iter().enumerate() {
        let result = result.unwrap();
        assert_eq!(result.stdout.to_text(), format!("case{index}-case{index}"));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn evaluate_all_keeps_input_order() {
    let cases = vec![
        TestCase::new("true").named("ok"),
        TestCase::new("false").named("mismatch"),
        TestCase::new("/nonexistent/tool").named("missing"),
    ];
    let outcomes = Harness::new().evaluate_all(cases, NonZeroUsize::MIN).await;
    let kinds: Vec<(String, OutcomeKind)> =
        outcomes.into_iter().map(|outcome| (outcome.name, outcome.kind)).collect();
    assert_eq!(
        kinds,
        vec![
            ("ok".to_string(), OutcomeKind::Passed),
            ("mismatch".to_string(), OutcomeKind::ExitMismatch),
            ("missing".to_string(), OutcomeKind::SpawnError),
        ]
    );
}

// ============================================================================
// SECTION: Blocking API
// ============================================================================

#[test]
fn run_blocking_drives_its_own_runtime() {
    let result = Harness::new().run_blocking(&TestCase::new("sh").args(["-c", "printf hi; exit 3"]));
    let result = result.unwrap();
    assert_eq!(result.exit_code(), 3);
    assert_eq!(result.stdout.to_text(), "hi");
}

#[tokio::test]
async fn run_blocking_inside_runtime_returns_error() {
    let err = Harness::new().run_blocking(&TestCase::new("true")).unwrap_err();
    let HarnessError::Io {
        message,
        partial,
    } = err
    else {
        panic!("expected io error, got {err}");
    };
    assert!(message.contains("within an async runtime"), "{message}");
    assert!(partial.stdout.is_empty());
}
