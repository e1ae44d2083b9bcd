// crates/launch-harness-cli/tests/cli_exit_codes.rs
// ============================================================================
// Module: CLI Exit Code Tests
// Description: Integration tests for the run and launch exit-code contract.
// Purpose: Ensure 0/1/2/3 map to pass, mismatch, spawn failure, and timeout.
// Dependencies: launch-harness binary
// ============================================================================
//! ## Overview
//! Drives the built `launch-harness` binary against small unix executables
//! and checks both the process exit code and the rendered reports.

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

use std::path::PathBuf;
use std::process::Command;
use std::process::Output;
use std::time::Duration;
use std::time::Instant;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the path of the built binary.
fn harness_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_launch-harness"))
}

/// Runs the binary with a clean harness environment.
fn run_harness(args: &[&str]) -> Output {
    Command::new(harness_bin())
        .args(args)
        .env_remove("LAUNCH_HARNESS_CONFIG")
        .env_remove("LAUNCH_HARNESS_TIMEOUT_SEC")
        .env_remove("LAUNCH_HARNESS_LOG")
        .output()
        .expect("run launch-harness")
}

/// Parses stdout as a JSON report.
fn json_stdout(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("json report on stdout")
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn version_flag_prints_version() {
    let output = run_harness(&["--version"]);
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("launch-harness {}", env!("CARGO_PKG_VERSION")));
}

#[test]
fn matching_exit_code_exits_zero() {
    let output = run_harness(&["run", "--", "true"]);
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("outcome: passed"), "{stdout}");
}

#[test]
fn expected_nonzero_exit_code_passes() {
    let output = run_harness(&["run", "--expect-exit", "7", "--", "sh", "-c", "exit 7"]);
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn exit_mismatch_exits_one() {
    let output = run_harness(&["run", "--format", "json", "--", "false"]);
    assert_eq!(output.status.code(), Some(1));
    let report = json_stdout(&output);
    assert_eq!(report["outcome"], "exit_mismatch");
    assert_eq!(report["expected_exit_code"], 0);
    assert_eq!(report["exit_code"], 1);
    assert_eq!(report["detail"], "exit code mismatch: expected 0, got 1");
}

#[test]
fn missing_executable_exits_two() {
    let output = run_harness(&["run", "--format", "json", "--", "/nonexistent/launch-harness-tool"]);
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(json_stdout(&output)["outcome"], "spawn_error");
}

#[test]
fn timeout_exits_three_with_partial_output() {
    let started = Instant::now();
    let output = run_harness(&[
        "run",
        "--timeout-ms",
        "300",
        "--format",
        "json",
        "--",
        "sh",
        "-c",
        "echo before; sleep 30",
    ]);
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(output.status.code(), Some(3));
    let report = json_stdout(&output);
    assert_eq!(report["outcome"], "timeout_error");
    assert_eq!(report["exit_code"], serde_json::Value::Null);
    assert_eq!(report["stdout"]["text"], "before\n");
}

#[test]
fn argv_reaches_child_in_order() {
    let output = run_harness(&[
        "run",
        "--format",
        "json",
        "--",
        "printf",
        "%s|",
        "a b",
        "--flag",
        "",
        "*",
    ]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(json_stdout(&output)["stdout"]["text"], "a b|--flag||*|");
}

#[test]
fn capped_output_reports_truncation() {
    let output = run_harness(&[
        "run",
        "--max-output-bytes",
        "16",
        "--format",
        "json",
        "--",
        "head",
        "-c",
        "5000",
        "/dev/zero",
    ]);
    assert_eq!(output.status.code(), Some(0));
    let report = json_stdout(&output);
    assert_eq!(report["stdout"]["captured_bytes"], 16);
    assert_eq!(report["stdout"]["total_bytes"], 5000);
    assert_eq!(report["stdout"]["truncated"], true);
}

#[test]
fn launch_renders_flags_before_pipeline() {
    let output = run_harness(&[
        "launch",
        "--tool",
        "echo",
        "--verbose",
        "--no-color",
        "--debug",
        "tcpserversrc:5",
        "--format",
        "json",
        "--",
        "tcpserversrc",
        "name=source",
        "port=3000",
        "fdsink",
        "name=sink",
        "fd=2",
        "source.",
        "!",
        "sink.",
    ]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        json_stdout(&output)["stdout"]["text"],
        "-v --debug-no-color --debug=tcpserversrc:5 tcpserversrc name=source port=3000 fdsink \
         name=sink fd=2 source. ! sink.\n"
    );
}

#[test]
fn invalid_arguments_exit_two() {
    let output = run_harness(&["run", "--env", "NOEQUALS", "--", "true"]);
    assert_eq!(output.status.code(), Some(2));
    let output = run_harness(&["launch", "--debug", "bad", "--", "fakesrc"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn invalid_timeout_env_exits_two() {
    let output = Command::new(harness_bin())
        .args(["run", "--", "true"])
        .env("LAUNCH_HARNESS_TIMEOUT_SEC", "soon")
        .output()
        .expect("run launch-harness");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("LAUNCH_HARNESS_TIMEOUT_SEC"), "{stderr}");
}

#[test]
fn oversized_timeout_env_exits_two() {
    let output = Command::new(harness_bin())
        .args(["run", "--timeout-ms", "100", "--", "true"])
        .env("LAUNCH_HARNESS_TIMEOUT_SEC", "18446744073709551615")
        .env_remove("LAUNCH_HARNESS_CONFIG")
        .env_remove("LAUNCH_HARNESS_LOG")
        .output()
        .expect("run launch-harness");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("LAUNCH_HARNESS_TIMEOUT_SEC must be at most"), "{stderr}");
}

#[test]
fn oversized_timeout_flag_is_an_invalid_case() {
    let output = run_harness(&[
        "run",
        "--timeout-ms",
        "18446744073709551615",
        "--format",
        "json",
        "--",
        "true",
    ]);
    assert_eq!(output.status.code(), Some(2));
    let report = json_stdout(&output);
    assert_eq!(report["outcome"], "invalid_case");
}

#[test]
fn env_set_and_removed_is_an_invalid_case() {
    let output = run_harness(&[
        "run", "--env", "FOO=x", "--env-remove", "FOO", "--format", "json", "--", "true",
    ]);
    assert_eq!(output.status.code(), Some(2));
    let report = json_stdout(&output);
    assert_eq!(report["outcome"], "invalid_case");
    assert!(report["detail"].as_str().unwrap().contains("both set and removed"));
}

#[test]
fn diagnostics_stay_off_stdout() {
    let output = Command::new(harness_bin())
        .args(["run", "--format", "json", "--", "true"])
        .env("LAUNCH_HARNESS_LOG", "debug")
        .env_remove("LAUNCH_HARNESS_TIMEOUT_SEC")
        .output()
        .expect("run launch-harness");
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(json_stdout(&output)["outcome"], "passed");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("spawned child"), "{stderr}");
}
