// crates/launch-harness-cli/src/logging.rs
// ============================================================================
// Module: CLI Logging
// Description: Tracing subscriber setup for the harness binary.
// Purpose: Route diagnostics to stderr so reports on stdout stay clean.
// Dependencies: launch-harness-config, tracing-subscriber
// ============================================================================

//! ## Overview
//! The filter directive comes from `LAUNCH_HARNESS_LOG` and defaults to
//! `warn`. A malformed directive fails closed instead of silently logging
//! nothing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use launch_harness_config::HarnessEnv;
use launch_harness_config::read_env_strict;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Filter used when `LAUNCH_HARNESS_LOG` is unset or blank.
pub(crate) const DEFAULT_LOG_FILTER: &str = "warn";

// ============================================================================
// SECTION: Setup
// ============================================================================

/// Builds the log filter from an optional directive.
pub(crate) fn build_filter(directive: Option<&str>) -> Result<EnvFilter, String> {
    let directive = directive.map(str::trim).filter(|value| !value.is_empty());
    let directive = directive.unwrap_or(DEFAULT_LOG_FILTER);
    EnvFilter::try_new(directive).map_err(|err| {
        format!("{} is not a valid log filter: {err}", HarnessEnv::Log.as_str())
    })
}

/// Installs the global stderr subscriber.
///
/// A subscriber installed earlier (for example by a test harness) is kept.
pub(crate) fn init_logging() -> Result<(), String> {
    let directive = read_env_strict(HarnessEnv::Log.as_str()).map_err(|err| err.to_string())?;
    let filter = build_filter(directive.as_deref())?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
    Ok(())
}
