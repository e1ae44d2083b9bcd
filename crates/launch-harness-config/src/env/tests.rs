// crates/launch-harness-config/src/env/tests.rs
// ============================================================================
// Module: Harness Environment Unit Tests
// Description: Unit coverage for environment override parsing.
// Purpose: Ensure timeout overrides fail closed and act as a floor.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Exercises the pure parsing paths so no test mutates process state.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use std::time::Duration;

use super::EnvOverrides;
use super::HarnessEnv;
use super::MAX_TIMEOUT_FLOOR_SECONDS;
use super::parse_timeout_seconds;

#[test]
fn env_names_are_stable() {
    assert_eq!(HarnessEnv::Config.as_str(), "LAUNCH_HARNESS_CONFIG");
    assert_eq!(HarnessEnv::TimeoutSeconds.as_str(), "LAUNCH_HARNESS_TIMEOUT_SEC");
    assert_eq!(HarnessEnv::Log.as_str(), "LAUNCH_HARNESS_LOG");
}

#[test]
fn timeout_seconds_accepts_positive_integers() {
    assert_eq!(parse_timeout_seconds("T", " 15 ").unwrap(), Duration::from_secs(15));
}

#[test]
fn timeout_seconds_rejects_zero_and_garbage() {
    let err = parse_timeout_seconds("T", "0").unwrap_err();
    assert!(err.to_string().contains("greater than zero"));
    for raw in ["", "-3", "1.5", "ten"] {
        let err = parse_timeout_seconds("T", raw).unwrap_err();
        assert!(err.to_string().contains("positive integer"), "{raw}: {err}");
    }
}

#[test]
fn timeout_seconds_are_bounded() {
    let max = MAX_TIMEOUT_FLOOR_SECONDS.to_string();
    assert_eq!(parse_timeout_seconds("T", &max).unwrap(), Duration::from_secs(86_400));
    let over = (MAX_TIMEOUT_FLOOR_SECONDS + 1).to_string();
    let err = parse_timeout_seconds("T", &over).unwrap_err();
    assert!(err.to_string().contains("must be at most 86400"), "{err}");
    let err = EnvOverrides::from_raw(Some("18446744073709551615")).unwrap_err();
    assert!(err.to_string().contains("must be at most"), "{err}");
}

#[test]
fn absent_override_leaves_timeouts_alone() {
    let overrides = EnvOverrides::from_raw(None).unwrap();
    assert_eq!(overrides, EnvOverrides::default());
    let timeout = Some(Duration::from_millis(250));
    assert_eq!(overrides.effective_timeout(timeout), timeout);
}

#[test]
fn override_acts_as_minimum() {
    let overrides = EnvOverrides::from_raw(Some("2")).unwrap();
    assert_eq!(
        overrides.effective_timeout(Some(Duration::from_millis(500))),
        Some(Duration::from_secs(2))
    );
    assert_eq!(
        overrides.effective_timeout(Some(Duration::from_secs(30))),
        Some(Duration::from_secs(30))
    );
    assert_eq!(overrides.effective_timeout(None), None);
}
