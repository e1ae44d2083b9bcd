// crates/launch-harness-config/src/config.rs
// ============================================================================
// Module: Suite Configuration
// Description: Suite file loading, validation, and case construction.
// Purpose: Provide strict, fail-closed suite parsing with hard limits.
// Dependencies: launch-harness-core, serde, toml, tracing
// ============================================================================

//! ## Overview
//! A suite file is TOML with an optional `[defaults]` table, an optional
//! `[run]` table, and one `[[case]]` entry per invocation. Each case names
//! either an `executable` with `args` or a `[case.launch]` table that renders
//! a launcher command line. Per-case fields override defaults; environment
//! maps merge with case keys winning.
//!
//! Files are size-limited, must be UTF-8, and reject unknown keys. Relative
//! working directories resolve against the directory holding the suite file.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use launch_harness_core::DEFAULT_LAUNCH_TOOL;
use launch_harness_core::DebugFilter;
use launch_harness_core::LaunchSpec;
use launch_harness_core::TestCase;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::env::EnvOverrides;
use crate::env::HarnessEnv;
use crate::env::read_env_nonempty;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default suite filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "launch-harness.toml";
/// Maximum suite file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of cases in one suite.
pub const MAX_CASES: usize = 1024;
/// Maximum length of a case name.
pub const MAX_CASE_NAME_LENGTH: usize = 128;
/// Maximum number of arguments or pipeline tokens per case.
pub const MAX_CASE_ARGS: usize = 4096;
/// Maximum number of environment overrides per table.
pub const MAX_ENV_ENTRIES: usize = 256;
/// Maximum timeout in milliseconds (one day).
pub const MAX_TIMEOUT_MS: u64 = 24 * 60 * 60 * 1000;
/// Maximum per-stream capture cap in bytes.
pub const MAX_OUTPUT_BYTES: usize = 256 * 1024 * 1024;
/// Maximum stdin payload per case in bytes.
pub const MAX_STDIN_BYTES: usize = 1024 * 1024;
/// Maximum suite parallelism.
pub const MAX_JOBS: usize = 256;

// ============================================================================
// SECTION: Suite Config
// ============================================================================

/// Parsed suite file.
///
/// # Invariants
/// - After [`SuiteConfig::validate`], case names are unique and non-empty and
///   every case converts into a valid [`TestCase`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuiteConfig {
    /// Values applied to every case unless overridden.
    #[serde(default)]
    pub defaults: DefaultsConfig,
    /// Suite execution settings.
    #[serde(default)]
    pub run: RunConfig,
    /// Case declarations in file order.
    #[serde(default, rename = "case")]
    pub cases: Vec<CaseConfig>,
    /// Directory relative working directories resolve against (not serialized).
    #[serde(skip)]
    pub source_dir: Option<PathBuf>,
}

impl SuiteConfig {
    /// Loads a suite from disk using the default resolution rules.
    ///
    /// The path is taken from `path`, then `LAUNCH_HARNESS_CONFIG`, then
    /// [`DEFAULT_CONFIG_NAME`] in the current directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", resolved.display())))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.source_dir =
            resolved.parent().filter(|dir| !dir.as_os_str().is_empty()).map(Path::to_path_buf);
        config.validate()?;
        debug!(path = %resolved.display(), cases = config.cases.len(), "loaded suite");
        Ok(config)
    }

    /// Parses and validates a suite from TOML text.
    ///
    /// Relative working directories stay relative to the caller's directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        if content.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the suite for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the suite is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.defaults.validate()?;
        self.run.validate()?;
        if self.cases.is_empty() {
            return Err(ConfigError::Invalid("suite must define at least one case".to_string()));
        }
        if self.cases.len() > MAX_CASES {
            return Err(ConfigError::Invalid(format!("suite exceeds {MAX_CASES} cases")));
        }
        let mut names = BTreeSet::new();
        for case in &self.cases {
            case.validate()?;
            if !names.insert(case.name.trim()) {
                return Err(ConfigError::Invalid(format!("duplicate case name '{}'", case.name)));
            }
            self.build_case(case, &EnvOverrides::default())?;
        }
        Ok(())
    }

    /// Returns the configured parallelism, if any.
    #[must_use]
    pub fn jobs(&self) -> Option<NonZeroUsize> {
        self.run.jobs.and_then(NonZeroUsize::new)
    }

    /// Converts every case into a [`TestCase`], in file order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a case cannot be converted.
    pub fn test_cases(&self, overrides: &EnvOverrides) -> Result<Vec<TestCase>, ConfigError> {
        self.cases.iter().map(|case| self.build_case(case, overrides)).collect()
    }

    /// Merges defaults into `case` and builds the invocation.
    fn build_case(
        &self,
        case: &CaseConfig,
        overrides: &EnvOverrides,
    ) -> Result<TestCase, ConfigError> {
        let invalid = |message: String| ConfigError::Invalid(format!("case '{}': {message}", case.name));
        let mut test_case = match (&case.executable, &case.launch) {
            (Some(executable), None) => TestCase::new(executable).args(case.args.iter().cloned()),
            (None, Some(launch)) => launch.to_spec().map_err(invalid)?.into_test_case(),
            _ => return Err(invalid("exactly one of executable or launch is required".to_string())),
        };
        test_case = test_case.named(case.name.trim());
        if let Some(dir) = case.working_dir.as_ref().or(self.defaults.working_dir.as_ref()) {
            test_case = test_case.working_dir(self.resolve_dir(dir));
        }
        // Case-level removals win over inherited defaults.
        let defaults =
            self.defaults.env.iter().filter(|(key, _)| !case.env_remove.contains(*key));
        for (key, value) in defaults.chain(&case.env) {
            test_case = test_case.env(key, value);
        }
        for key in &case.env_remove {
            test_case = test_case.env_remove(key);
        }
        test_case = test_case.expect_exit_code(
            case.expected_exit_code.or(self.defaults.expected_exit_code).unwrap_or(0),
        );
        let configured =
            case.timeout_ms.or(self.defaults.timeout_ms).map(Duration::from_millis);
        if let Some(timeout) = overrides.effective_timeout(configured) {
            test_case = test_case.timeout(timeout);
        }
        if let Some(limit) = case.max_output_bytes.or(self.defaults.max_output_bytes) {
            test_case = test_case.output_limit(limit);
        }
        if let Some(stdin) = &case.stdin {
            test_case = test_case.stdin(stdin.as_bytes());
        }
        test_case.validate().map_err(|err| invalid(err.to_string()))?;
        Ok(test_case)
    }

    /// Resolves a configured directory against the suite location.
    fn resolve_dir(&self, dir: &str) -> PathBuf {
        let path = PathBuf::from(dir);
        match &self.source_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        }
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Values inherited by every case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultsConfig {
    /// Default deadline in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Default per-stream capture cap in bytes.
    #[serde(default)]
    pub max_output_bytes: Option<usize>,
    /// Default working directory.
    #[serde(default)]
    pub working_dir: Option<String>,
    /// Default expected exit code.
    #[serde(default)]
    pub expected_exit_code: Option<i32>,
    /// Environment overrides applied before case overrides.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl DefaultsConfig {
    /// Validates default values.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_timeout("defaults.timeout_ms", self.timeout_ms)?;
        validate_output_cap("defaults.max_output_bytes", self.max_output_bytes)?;
        if let Some(dir) = &self.working_dir {
            validate_path_string("defaults.working_dir", dir)?;
        }
        validate_env_table("defaults.env", &self.env)
    }
}

/// Suite execution settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Maximum cases in flight.
    #[serde(default)]
    pub jobs: Option<usize>,
}

impl RunConfig {
    /// Validates execution settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.jobs {
            Some(0) => Err(ConfigError::Invalid("run.jobs must be greater than zero".to_string())),
            Some(jobs) if jobs > MAX_JOBS => {
                Err(ConfigError::Invalid(format!("run.jobs must be at most {MAX_JOBS}")))
            }
            _ => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Cases
// ============================================================================

/// One `[[case]]` entry.
///
/// # Invariants
/// - Exactly one of `executable` and `launch` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaseConfig {
    /// Unique case name.
    pub name: String,
    /// Executable path or program name.
    #[serde(default)]
    pub executable: Option<String>,
    /// Arguments passed to `executable`, in order.
    #[serde(default)]
    pub args: Vec<String>,
    /// Launcher command line built from a structured spec.
    #[serde(default)]
    pub launch: Option<LaunchConfig>,
    /// Working directory override.
    #[serde(default)]
    pub working_dir: Option<String>,
    /// Environment overrides; win over defaults.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Inherited variables removed for this case.
    #[serde(default)]
    pub env_remove: Vec<String>,
    /// Expected exit code override.
    #[serde(default)]
    pub expected_exit_code: Option<i32>,
    /// Deadline override in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Capture cap override in bytes.
    #[serde(default)]
    pub max_output_bytes: Option<usize>,
    /// Text written to the child's stdin.
    #[serde(default)]
    pub stdin: Option<String>,
}

impl CaseConfig {
    /// Validates the case shape and limits.
    fn validate(&self) -> Result<(), ConfigError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ConfigError::Invalid("case name must be non-empty".to_string()));
        }
        if name.len() > MAX_CASE_NAME_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "case name exceeds {MAX_CASE_NAME_LENGTH} characters"
            )));
        }
        let field = |suffix: &str| format!("case '{name}': {suffix}");
        match (&self.executable, &self.launch) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::Invalid(field("executable and launch are mutually exclusive")));
            }
            (None, None) => {
                return Err(ConfigError::Invalid(field("one of executable or launch is required")));
            }
            (None, Some(launch)) => {
                if !self.args.is_empty() {
                    return Err(ConfigError::Invalid(field("args require executable; use launch.pipeline")));
                }
                launch.validate(&field("launch"))?;
            }
            (Some(executable), None) => {
                if executable.trim().is_empty() {
                    return Err(ConfigError::Invalid(field("executable must be non-empty")));
                }
            }
        }
        if self.args.len() > MAX_CASE_ARGS {
            return Err(ConfigError::Invalid(field(&format!("args exceed {MAX_CASE_ARGS} entries"))));
        }
        if let Some(dir) = &self.working_dir {
            validate_path_string(&field("working_dir"), dir)?;
        }
        validate_env_table(&field("env"), &self.env)?;
        if self.env_remove.len() > MAX_ENV_ENTRIES {
            return Err(ConfigError::Invalid(field(&format!(
                "env_remove exceeds {MAX_ENV_ENTRIES} entries"
            ))));
        }
        validate_timeout(&field("timeout_ms"), self.timeout_ms)?;
        validate_output_cap(&field("max_output_bytes"), self.max_output_bytes)?;
        if self.stdin.as_ref().is_some_and(|stdin| stdin.len() > MAX_STDIN_BYTES) {
            return Err(ConfigError::Invalid(field(&format!(
                "stdin exceeds {MAX_STDIN_BYTES} bytes"
            ))));
        }
        Ok(())
    }
}

/// Structured launcher command line for a case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LaunchConfig {
    /// Launcher executable; defaults to [`DEFAULT_LAUNCH_TOOL`].
    #[serde(default)]
    pub tool: Option<String>,
    /// Emit `-v`.
    #[serde(default)]
    pub verbose: bool,
    /// Emit `--debug-no-color`.
    #[serde(default)]
    pub no_color: bool,
    /// Debug filter in `category:level,...` form.
    #[serde(default)]
    pub debug: Option<String>,
    /// Opaque pipeline tokens, in order.
    #[serde(default)]
    pub pipeline: Vec<String>,
}

impl LaunchConfig {
    /// Validates the launch table.
    fn validate(&self, field: &str) -> Result<(), ConfigError> {
        if self.tool.as_ref().is_some_and(|tool| tool.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("{field}.tool must be non-empty")));
        }
        if self.pipeline.is_empty() {
            return Err(ConfigError::Invalid(format!("{field}.pipeline must be non-empty")));
        }
        if self.pipeline.len() > MAX_CASE_ARGS {
            return Err(ConfigError::Invalid(format!(
                "{field}.pipeline exceeds {MAX_CASE_ARGS} tokens"
            )));
        }
        self.to_spec().map(|_| ()).map_err(|message| ConfigError::Invalid(format!("{field}.{message}")))
    }

    /// Builds the launcher spec, parsing the debug filter.
    fn to_spec(&self) -> Result<LaunchSpec, String> {
        let debug = match &self.debug {
            Some(raw) => raw.parse::<DebugFilter>().map_err(|err| format!("debug: {err}"))?,
            None => DebugFilter::new(),
        };
        Ok(LaunchSpec::new(self.tool.as_deref().unwrap_or(DEFAULT_LAUNCH_TOOL))
            .verbose(self.verbose)
            .no_color(self.no_color)
            .debug(debug)
            .pipeline(self.pipeline.iter().cloned()))
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Suite loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading the suite.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the suite path from the caller or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Some(env_path) = read_env_nonempty(HarnessEnv::Config.as_str())? {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates an optional timeout in milliseconds.
fn validate_timeout(field: &str, timeout_ms: Option<u64>) -> Result<(), ConfigError> {
    match timeout_ms {
        Some(0) => Err(ConfigError::Invalid(format!("{field} must be greater than zero"))),
        Some(ms) if ms > MAX_TIMEOUT_MS => {
            Err(ConfigError::Invalid(format!("{field} must be at most {MAX_TIMEOUT_MS}")))
        }
        _ => Ok(()),
    }
}

/// Validates an optional capture cap.
fn validate_output_cap(field: &str, cap: Option<usize>) -> Result<(), ConfigError> {
    match cap {
        Some(0) => Err(ConfigError::Invalid(format!("{field} must be greater than zero"))),
        Some(bytes) if bytes > MAX_OUTPUT_BYTES => {
            Err(ConfigError::Invalid(format!("{field} must be at most {MAX_OUTPUT_BYTES}")))
        }
        _ => Ok(()),
    }
}

/// Validates the size of an environment table.
///
/// Key syntax is checked when the case converts into a [`TestCase`].
fn validate_env_table(field: &str, env: &BTreeMap<String, String>) -> Result<(), ConfigError> {
    if env.len() > MAX_ENV_ENTRIES {
        return Err(ConfigError::Invalid(format!("{field} exceeds {MAX_ENV_ENTRIES} entries")));
    }
    Ok(())
}
