// crates/launch-harness-core/src/launch.rs
// ============================================================================
// Module: Pipeline Launch Specification
// Description: Structured argv builder for pipeline launcher tools.
// Purpose: Model debug filters as explicit values and keep pipelines opaque.
// Dependencies: std, thiserror
// ============================================================================

//! ## Overview
//! A [`LaunchSpec`] renders the launcher command line
//! `<tool> [-v] [--debug-no-color] [--debug=<filter>] <pipeline...>`.
//! The debug filter is an explicit [`DebugFilter`] value owned by the spec,
//! so concurrent cases can carry different filters without touching any
//! process-wide state.
//!
//! Invariants:
//! - Pipeline tokens are passed through untouched and in order; their
//!   grammar belongs to the external tool.
//! - Rendered filters parse back to an equal [`DebugFilter`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::case::TestCase;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Launcher used when a spec does not name one.
pub const DEFAULT_LAUNCH_TOOL: &str = "gst-launch-1.0";
/// Highest debug level accepted by the launcher.
pub const MAX_DEBUG_LEVEL: u8 = 9;
/// Category matching every debug category.
const WILDCARD_CATEGORY: &str = "*";
/// Flag enabling verbose pipeline output.
const VERBOSE_FLAG: &str = "-v";
/// Flag disabling colored debug output.
const NO_COLOR_FLAG: &str = "--debug-no-color";
/// Prefix of the debug filter flag.
const DEBUG_FLAG_PREFIX: &str = "--debug=";

/// Named debug levels in ascending order of verbosity.
const NAMED_LEVELS: &[(&str, u8)] = &[
    ("none", 0),
    ("error", 1),
    ("warning", 2),
    ("fixme", 3),
    ("info", 4),
    ("debug", 5),
    ("log", 6),
    ("trace", 7),
    ("memdump", 9),
];

// ============================================================================
// SECTION: Debug Filter
// ============================================================================

/// One `category:level` entry of a debug filter.
///
/// # Invariants
/// - `category` is non-empty and contains no `,`, `:` or whitespace.
/// - `level` is at most [`MAX_DEBUG_LEVEL`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugEntry {
    /// Category name; `*` acts as a wildcard in the external tool.
    category: String,
    /// Numeric verbosity level.
    level: u8,
}

impl DebugEntry {
    /// Creates a validated entry.
    ///
    /// # Errors
    ///
    /// Returns [`DebugFilterError`] when the category or level is invalid.
    pub fn new(category: impl Into<String>, level: u8) -> Result<Self, DebugFilterError> {
        let category = category.into();
        validate_category(&category)?;
        if level > MAX_DEBUG_LEVEL {
            return Err(DebugFilterError::LevelOutOfRange(level.to_string()));
        }
        Ok(Self {
            category,
            level,
        })
    }

    /// Returns the category name.
    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Returns the numeric level.
    #[must_use]
    pub const fn level(&self) -> u8 {
        self.level
    }
}

/// Ordered debug filter passed to the launcher as `--debug=<filter>`.
///
/// Parses comma-separated `category:level` entries. A bare level such as
/// `3` is read as `*:3` and renders in that form.
///
/// # Invariants
/// - Entry order is preserved; later entries override earlier ones in the
///   external tool, so reordering would change meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugFilter {
    /// Filter entries in declaration order.
    entries: Vec<DebugEntry>,
}

impl DebugFilter {
    /// Creates an empty filter.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Appends a `category:level` entry.
    ///
    /// # Errors
    ///
    /// Returns [`DebugFilterError`] when the entry is invalid.
    pub fn with(mut self, category: impl Into<String>, level: u8) -> Result<Self, DebugFilterError> {
        self.entries.push(DebugEntry::new(category, level)?);
        Ok(self)
    }

    /// Returns the entries in order.
    #[must_use]
    pub fn entries(&self) -> &[DebugEntry] {
        &self.entries
    }

    /// Returns true when the filter has no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for DebugFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, entry) in self.entries.iter().enumerate() {
            if index > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}:{}", entry.category, entry.level)?;
        }
        Ok(())
    }
}

impl FromStr for DebugFilter {
    type Err = DebugFilterError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::new());
        }
        let mut entries = Vec::new();
        for part in trimmed.split(',') {
            let part = part.trim();
            let Some((category, level)) = part.split_once(':') else {
                // A bare level sets the default threshold for every category.
                let level = parse_level(part)
                    .map_err(|_| DebugFilterError::MissingLevel(part.to_string()))?;
                entries.push(DebugEntry::new(WILDCARD_CATEGORY, level)?);
                continue;
            };
            entries.push(DebugEntry::new(category.trim(), parse_level(level.trim())?)?);
        }
        Ok(Self {
            entries,
        })
    }
}

/// Errors raised while building or parsing a [`DebugFilter`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DebugFilterError {
    /// Categories must be non-empty.
    #[error("debug category must be non-empty")]
    EmptyCategory,
    /// Categories must not contain separators or whitespace.
    #[error("debug category '{0}' contains a separator or whitespace")]
    InvalidCategory(String),
    /// Entries must have the form `category:level`.
    #[error("debug entry '{0}' is missing ':<level>'")]
    MissingLevel(String),
    /// Levels must be a number up to 9 or a known level name.
    #[error("debug level '{0}' is not a number in 0..=9 or a level name")]
    LevelOutOfRange(String),
}

// ============================================================================
// SECTION: Launch Spec
// ============================================================================

/// Structured command line for a pipeline launcher.
///
/// # Invariants
/// - Rendered argv order is flags first, then pipeline tokens in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Launcher executable.
    pub tool: PathBuf,
    /// Emit `-v`.
    pub verbose: bool,
    /// Emit `--debug-no-color`.
    pub no_color: bool,
    /// Debug filter; omitted from argv when empty.
    pub debug: DebugFilter,
    /// Opaque pipeline description tokens.
    pub pipeline: Vec<String>,
}

impl Default for LaunchSpec {
    fn default() -> Self {
        Self {
            tool: PathBuf::from(DEFAULT_LAUNCH_TOOL),
            verbose: false,
            no_color: false,
            debug: DebugFilter::new(),
            pipeline: Vec::new(),
        }
    }
}

impl LaunchSpec {
    /// Creates a spec for `tool` with no flags and an empty pipeline.
    #[must_use]
    pub fn new(tool: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.into(),
            ..Self::default()
        }
    }

    /// Enables `-v`.
    #[must_use]
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Enables `--debug-no-color`.
    #[must_use]
    pub const fn no_color(mut self, no_color: bool) -> Self {
        self.no_color = no_color;
        self
    }

    /// Replaces the debug filter.
    #[must_use]
    pub fn debug(mut self, filter: DebugFilter) -> Self {
        self.debug = filter;
        self
    }

    /// Appends pipeline tokens in order.
    #[must_use]
    pub fn pipeline<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pipeline.extend(tokens.into_iter().map(Into::into));
        self
    }

    /// Renders the argument vector (excluding the tool itself).
    #[must_use]
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.pipeline.len() + 3);
        if self.verbose {
            argv.push(VERBOSE_FLAG.to_string());
        }
        if self.no_color {
            argv.push(NO_COLOR_FLAG.to_string());
        }
        if !self.debug.is_empty() {
            argv.push(format!("{DEBUG_FLAG_PREFIX}{}", self.debug));
        }
        argv.extend(self.pipeline.iter().cloned());
        argv
    }

    /// Converts the spec into a [`TestCase`] with default expectations.
    #[must_use]
    pub fn into_test_case(self) -> TestCase {
        let args = self.argv();
        TestCase::new(self.tool).args(args)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates a debug category token.
fn validate_category(category: &str) -> Result<(), DebugFilterError> {
    if category.is_empty() {
        return Err(DebugFilterError::EmptyCategory);
    }
    if category.chars().any(|ch| ch == ',' || ch == ':' || ch.is_whitespace()) {
        return Err(DebugFilterError::InvalidCategory(category.to_string()));
    }
    Ok(())
}

/// Parses a numeric or named debug level.
fn parse_level(raw: &str) -> Result<u8, DebugFilterError> {
    if let Ok(level) = raw.parse::<u8>() {
        return Ok(level);
    }
    let lowered = raw.to_ascii_lowercase();
    NAMED_LEVELS
        .iter()
        .find(|(name, _)| *name == lowered)
        .map(|(_, level)| *level)
        .ok_or_else(|| DebugFilterError::LevelOutOfRange(raw.to_string()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
