// crates/launch-harness-config/src/env.rs
// ============================================================================
// Module: Harness Environment
// Description: Environment-backed overrides for suite runs.
// Purpose: Centralize env parsing with strict UTF-8 validation.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Environment values are parsed with strict UTF-8 enforcement to avoid silent
//! misconfiguration. Invalid UTF-8 or empty values fail closed.
//!
//! `LAUNCH_HARNESS_TIMEOUT_SEC` stretches deadlines on slow hosts: it acts as
//! a minimum for every configured timeout and never adds a timeout to a case
//! that has none.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use crate::config::ConfigError;
use crate::config::MAX_TIMEOUT_MS;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Largest accepted timeout floor in seconds; matches the per-case timeout cap.
pub const MAX_TIMEOUT_FLOOR_SECONDS: u64 = MAX_TIMEOUT_MS / 1000;

// ============================================================================
// SECTION: Environment Constants
// ============================================================================

/// Environment keys read by the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessEnv {
    /// Suite file path override.
    Config,
    /// Timeout floor in seconds (positive integer).
    TimeoutSeconds,
    /// Log filter directive for the CLI subscriber.
    Log,
}

impl HarnessEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Config => "LAUNCH_HARNESS_CONFIG",
            Self::TimeoutSeconds => "LAUNCH_HARNESS_TIMEOUT_SEC",
            Self::Log => "LAUNCH_HARNESS_LOG",
        }
    }
}

// ============================================================================
// SECTION: Overrides
// ============================================================================

/// Typed overrides derived from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnvOverrides {
    /// Minimum applied to every configured timeout.
    pub timeout_floor: Option<Duration>,
}

impl EnvOverrides {
    /// Loads overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a value is not valid UTF-8, is
    /// empty, or fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let raw = read_env_nonempty(HarnessEnv::TimeoutSeconds.as_str())?;
        Self::from_raw(raw.as_deref())
    }

    /// Builds overrides from raw values without touching the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the timeout is not a positive
    /// integer number of seconds.
    pub fn from_raw(timeout_seconds: Option<&str>) -> Result<Self, ConfigError> {
        let timeout_floor = timeout_seconds
            .map(|value| parse_timeout_seconds(HarnessEnv::TimeoutSeconds.as_str(), value))
            .transpose()?;
        Ok(Self {
            timeout_floor,
        })
    }

    /// Applies the floor to a configured timeout.
    #[must_use]
    pub fn effective_timeout(&self, configured: Option<Duration>) -> Option<Duration> {
        match (configured, self.timeout_floor) {
            (Some(timeout), Some(floor)) => Some(timeout.max(floor)),
            (configured, _) => configured,
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads an environment variable and enforces UTF-8 validity.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the variable contains invalid UTF-8.
pub fn read_env_strict(name: &str) -> Result<Option<String>, ConfigError> {
    std::env::var_os(name).map_or(Ok(None), |raw| {
        raw.into_string()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(format!("{name} must be valid UTF-8")))
    })
}

/// Reads an environment variable and rejects empty values.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the variable is set but empty or
/// whitespace.
pub(crate) fn read_env_nonempty(name: &str) -> Result<Option<String>, ConfigError> {
    match read_env_strict(name)? {
        Some(value) if value.trim().is_empty() => {
            Err(ConfigError::Invalid(format!("{name} must not be empty")))
        }
        Some(value) => Ok(Some(value)),
        None => Ok(None),
    }
}

/// Parses a bounded positive timeout value from an environment variable string.
fn parse_timeout_seconds(name: &str, raw: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::Invalid(format!("{name} must be a positive integer number of seconds"));
    let secs: u64 = raw.trim().parse().map_err(|_| invalid())?;
    if secs == 0 {
        return Err(ConfigError::Invalid(format!("{name} must be greater than zero")));
    }
    if secs > MAX_TIMEOUT_FLOOR_SECONDS {
        return Err(ConfigError::Invalid(format!(
            "{name} must be at most {MAX_TIMEOUT_FLOOR_SECONDS}"
        )));
    }
    Ok(Duration::from_secs(secs))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
