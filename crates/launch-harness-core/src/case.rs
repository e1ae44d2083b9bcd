// crates/launch-harness-core/src/case.rs
// ============================================================================
// Module: Test Case Model
// Description: Declarative description of a single external invocation.
// Purpose: Capture executable, argv, environment, and expectations up front.
// Dependencies: std, thiserror
// ============================================================================

//! ## Overview
//! A [`TestCase`] is built by the caller immediately before invocation and is
//! consumed by the [`Harness`](crate::Harness). It owns everything needed to
//! spawn the child: argv, working directory, environment overrides, optional
//! stdin bytes, and the expectations used to judge the result.
//!
//! Invariants:
//! - `args` order is the order the child observes in its argv.
//! - Environment is inherited unchanged except for `env` and `env_remove`.
//! - Nothing in a `TestCase` is ever interpreted by a shell.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Longest deadline a case may carry (one day).
pub const MAX_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

// ============================================================================
// SECTION: Types
// ============================================================================

/// Declarative description of one invocation of an external tool.
///
/// # Invariants
/// - `args` are passed to the child verbatim and in order.
/// - `expected_exit_code` defaults to `0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// Optional label used in logs and reports.
    pub name: Option<String>,
    /// Executable path or bare program name resolved through `PATH`.
    pub executable: PathBuf,
    /// Ordered argument vector (excluding the program name).
    pub args: Vec<String>,
    /// Working directory for the child; inherits the caller's when `None`.
    pub working_dir: Option<PathBuf>,
    /// Environment variables set or replaced for this case only.
    pub env: BTreeMap<String, String>,
    /// Environment variables removed for this case only.
    pub env_remove: Vec<String>,
    /// Exit code the caller expects the child to report.
    pub expected_exit_code: i32,
    /// Deadline for the whole invocation; unbounded when `None`.
    pub timeout: Option<Duration>,
    /// Per-stream capture cap in bytes; uncapped when `None`.
    pub output_limit: Option<usize>,
    /// Bytes written to the child's stdin before it is closed.
    pub stdin: Option<Vec<u8>>,
}

impl TestCase {
    /// Creates a case for `executable` with no arguments and default expectations.
    #[must_use]
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            name: None,
            executable: executable.into(),
            args: Vec::new(),
            working_dir: None,
            env: BTreeMap::new(),
            env_remove: Vec::new(),
            expected_exit_code: 0,
            timeout: None,
            output_limit: None,
            stdin: None,
        }
    }

    /// Sets the report label.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Appends a single argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends arguments in iteration order.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Sets an environment override.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Removes an inherited environment variable for this case.
    #[must_use]
    pub fn env_remove(mut self, key: impl Into<String>) -> Self {
        self.env_remove.push(key.into());
        self
    }

    /// Sets the expected exit code.
    #[must_use]
    pub const fn expect_exit_code(mut self, code: i32) -> Self {
        self.expected_exit_code = code;
        self
    }

    /// Sets the invocation deadline.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Caps each captured stream at `limit` bytes.
    #[must_use]
    pub const fn output_limit(mut self, limit: usize) -> Self {
        self.output_limit = Some(limit);
        self
    }

    /// Feeds `bytes` to the child's stdin.
    #[must_use]
    pub fn stdin(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(bytes.into());
        self
    }

    /// Returns the label for logs and reports (falls back to the executable).
    #[must_use]
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.executable.display().to_string())
    }

    /// Renders the argv as a single human-readable line.
    ///
    /// Tokens containing whitespace or quotes are single-quoted for display
    /// only; the child never sees this string.
    #[must_use]
    pub fn command_line(&self) -> String {
        let mut line = quote_for_display(&self.executable.display().to_string());
        for arg in &self.args {
            line.push(' ');
            line.push_str(&quote_for_display(arg));
        }
        line
    }

    /// Validates the case before spawning.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError`] when the executable is empty, any argv or
    /// environment entry contains a NUL byte, an environment key is
    /// malformed or both set and removed, or the timeout is zero or longer
    /// than [`MAX_TIMEOUT`].
    pub fn validate(&self) -> Result<(), CaseError> {
        validate_executable(&self.executable)?;
        for (index, arg) in self.args.iter().enumerate() {
            if arg.contains('\0') {
                return Err(CaseError::NulByte(format!("argument {index}")));
            }
        }
        for (key, value) in &self.env {
            validate_env_key(key)?;
            if value.contains('\0') {
                return Err(CaseError::NulByte(format!("environment value for {key}")));
            }
        }
        for key in &self.env_remove {
            validate_env_key(key)?;
            if self.env.contains_key(key) {
                return Err(CaseError::ConflictingEnv(key.clone()));
            }
        }
        match self.timeout {
            Some(timeout) if timeout.is_zero() => Err(CaseError::ZeroTimeout),
            Some(timeout) if timeout > MAX_TIMEOUT => Err(CaseError::TimeoutTooLarge(timeout)),
            _ => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Reasons a [`TestCase`] is rejected before any process is spawned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaseError {
    /// The executable path is empty.
    #[error("executable must be non-empty")]
    EmptyExecutable,
    /// A NUL byte cannot cross the process boundary.
    #[error("{0} contains a NUL byte")]
    NulByte(String),
    /// Environment keys must be non-empty and free of `=`.
    #[error("invalid environment key: '{0}'")]
    InvalidEnvKey(String),
    /// A key cannot be both set and removed.
    #[error("environment key '{0}' is both set and removed")]
    ConflictingEnv(String),
    /// A zero timeout can never be met.
    #[error("timeout must be greater than zero")]
    ZeroTimeout,
    /// Deadlines are capped at [`MAX_TIMEOUT`].
    #[error("timeout of {} ms exceeds the {} ms limit", .0.as_millis(), MAX_TIMEOUT.as_millis())]
    TimeoutTooLarge(Duration),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rejects empty executables and embedded NUL bytes.
fn validate_executable(executable: &Path) -> Result<(), CaseError> {
    let text = executable.to_string_lossy();
    if text.trim().is_empty() {
        return Err(CaseError::EmptyExecutable);
    }
    if text.contains('\0') {
        return Err(CaseError::NulByte("executable".to_string()));
    }
    Ok(())
}

/// Rejects environment keys the OS cannot represent.
fn validate_env_key(key: &str) -> Result<(), CaseError> {
    if key.is_empty() || key.contains('=') || key.contains('\0') {
        return Err(CaseError::InvalidEnvKey(key.to_string()));
    }
    Ok(())
}

/// Quotes a token for log output when it would otherwise be ambiguous.
fn quote_for_display(token: &str) -> String {
    let needs_quotes = token.is_empty()
        || token.chars().any(|ch| ch.is_whitespace() || ch == '\'' || ch == '"' || ch == '\\');
    if !needs_quotes {
        return token.to_string();
    }
    let mut quoted = String::with_capacity(token.len() + 2);
    quoted.push('\'');
    for ch in token.chars() {
        if ch == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(ch);
        }
    }
    quoted.push('\'');
    quoted
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions favor direct unwrap/expect for clarity."
    )]

    use std::time::Duration;

    use super::CaseError;
    use super::MAX_TIMEOUT;
    use super::TestCase;

    #[test]
    fn builder_preserves_argument_order() {
        let case = TestCase::new("tool").arg("-v").args(["b", "a"]).arg("c");
        assert_eq!(case.args, vec!["-v", "b", "a", "c"]);
        assert_eq!(case.expected_exit_code, 0);
    }

    #[test]
    fn display_name_falls_back_to_executable() {
        assert_eq!(TestCase::new("/usr/bin/true").display_name(), "/usr/bin/true");
        assert_eq!(TestCase::new("true").named("smoke").display_name(), "smoke");
    }

    #[test]
    fn command_line_quotes_ambiguous_tokens() {
        let case = TestCase::new("tool").args(["plain", "two words", "", "it's"]);
        assert_eq!(case.command_line(), "tool plain 'two words' '' 'it'\\''s'");
    }

    #[test]
    fn validate_rejects_empty_executable() {
        assert_eq!(TestCase::new("  ").validate(), Err(CaseError::EmptyExecutable));
    }

    #[test]
    fn validate_rejects_nul_in_args() {
        let err = TestCase::new("tool").arg("a\0b").validate().unwrap_err();
        assert_eq!(err, CaseError::NulByte("argument 0".to_string()));
    }

    #[test]
    fn validate_rejects_bad_env_keys() {
        let err = TestCase::new("tool").env("A=B", "x").validate().unwrap_err();
        assert!(matches!(err, CaseError::InvalidEnvKey(_)));
        let err = TestCase::new("tool").env_remove("").validate().unwrap_err();
        assert!(matches!(err, CaseError::InvalidEnvKey(_)));
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let err = TestCase::new("tool").timeout(Duration::ZERO).validate().unwrap_err();
        assert_eq!(err, CaseError::ZeroTimeout);
    }

    #[test]
    fn validate_bounds_timeout() {
        assert!(TestCase::new("tool").timeout(MAX_TIMEOUT).validate().is_ok());
        let err = TestCase::new("tool").timeout(Duration::MAX).validate().unwrap_err();
        assert_eq!(err, CaseError::TimeoutTooLarge(Duration::MAX));
        let just_over = MAX_TIMEOUT + Duration::from_millis(1);
        assert!(matches!(
            TestCase::new("tool").timeout(just_over).validate(),
            Err(CaseError::TimeoutTooLarge(_))
        ));
    }

    #[test]
    fn validate_rejects_key_both_set_and_removed() {
        let err = TestCase::new("tool").env("FOO", "x").env_remove("FOO").validate().unwrap_err();
        assert_eq!(err, CaseError::ConflictingEnv("FOO".to_string()));
        assert!(TestCase::new("tool").env("FOO", "x").env_remove("BAR").validate().is_ok());
    }
}
