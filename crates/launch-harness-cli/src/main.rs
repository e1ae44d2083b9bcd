// crates/launch-harness-cli/src/main.rs
// ============================================================================
// Module: Launch Harness CLI Entry Point
// Description: Command dispatcher for single runs, launcher runs, and suites.
// Purpose: Expose the invocation harness with a stable exit-code contract.
// Dependencies: clap, launch-harness-core, launch-harness-config, serde_json, tokio.
// ============================================================================

//! ## Overview
//! `launch-harness` runs external executables as test cases and reports
//! what they did. The process exit code is the contract: `0` when the exit
//! code matched, `1` on mismatch, `2` on spawn, capture, configuration, or
//! usage errors, and `3` when a deadline elapsed. Suites exit with the most
//! severe case outcome.
//!
//! Reports go to stdout; diagnostics go to stderr through `tracing`.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod logging;
mod report;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use launch_harness_config::ConfigError;
use launch_harness_config::EnvOverrides;
use launch_harness_config::SuiteConfig;
use launch_harness_core::DEFAULT_LAUNCH_TOOL;
use launch_harness_core::DebugFilter;
use launch_harness_core::Harness;
use launch_harness_core::LaunchSpec;
use launch_harness_core::TestCase;
use thiserror::Error;
use tracing::debug;

use crate::report::CaseReport;
use crate::report::SuiteReport;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Exit code for usage, configuration, and output errors.
const USAGE_EXIT_CODE: u8 = 2;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "launch-harness", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one executable with an explicit argument vector.
    Run(RunCommand),
    /// Run a pipeline launcher built from structured flags.
    Launch(LaunchCommand),
    /// Run every case in a suite file.
    Suite(SuiteCommand),
    /// Suite file utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Report formats.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Pretty-printed JSON output.
    Json,
}

/// Per-invocation settings shared by `run` and `launch`.
#[derive(Args, Debug)]
struct ExpectationArgs {
    /// Label used in reports.
    #[arg(long, value_name = "NAME")]
    name: Option<String>,
    /// Working directory for the child.
    #[arg(long, value_name = "DIR")]
    cwd: Option<PathBuf>,
    /// Environment override for the child (repeatable).
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    env: Vec<(String, String)>,
    /// Inherited environment variable to remove (repeatable).
    #[arg(long = "env-remove", value_name = "KEY")]
    env_remove: Vec<String>,
    /// Deadline in milliseconds.
    #[arg(long = "timeout-ms", value_name = "MS", value_parser = clap::value_parser!(u64).range(1 ..))]
    timeout_ms: Option<u64>,
    /// Exit code the child is expected to report.
    #[arg(long = "expect-exit", value_name = "CODE", default_value_t = 0, allow_negative_numbers = true)]
    expect_exit: i32,
    /// Per-stream capture cap in bytes.
    #[arg(long = "max-output-bytes", value_name = "BYTES", value_parser = parse_positive_usize)]
    max_output_bytes: Option<usize>,
    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

impl ExpectationArgs {
    /// Applies the flags to `case`, honoring environment overrides.
    fn apply(&self, mut case: TestCase, overrides: &EnvOverrides) -> TestCase {
        if let Some(name) = &self.name {
            case = case.named(name);
        }
        if let Some(dir) = &self.cwd {
            case = case.working_dir(dir);
        }
        for (key, value) in &self.env {
            case = case.env(key, value);
        }
        for key in &self.env_remove {
            case = case.env_remove(key);
        }
        case = case.expect_exit_code(self.expect_exit);
        if let Some(timeout) =
            overrides.effective_timeout(self.timeout_ms.map(Duration::from_millis))
        {
            case = case.timeout(timeout);
        }
        if let Some(limit) = self.max_output_bytes {
            case = case.output_limit(limit);
        }
        case
    }
}

/// Arguments for `run`.
#[derive(Args, Debug)]
struct RunCommand {
    /// Shared invocation settings.
    #[command(flatten)]
    expect: ExpectationArgs,
    /// Executable followed by its arguments, after `--`.
    #[arg(last = true, required = true, value_name = "COMMAND")]
    command: Vec<String>,
}

/// Arguments for `launch`.
#[derive(Args, Debug)]
struct LaunchCommand {
    /// Launcher executable.
    #[arg(long, value_name = "TOOL", default_value = DEFAULT_LAUNCH_TOOL)]
    tool: PathBuf,
    /// Pass `-v` to the launcher.
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
    /// Pass `--debug-no-color` to the launcher.
    #[arg(long = "no-color", action = ArgAction::SetTrue)]
    no_color: bool,
    /// Debug filter in `category:level,...` form.
    #[arg(long, value_name = "FILTER", value_parser = parse_debug_filter)]
    debug: Option<DebugFilter>,
    /// Shared invocation settings.
    #[command(flatten)]
    expect: ExpectationArgs,
    /// Pipeline description tokens, after `--`.
    #[arg(last = true, required = true, value_name = "PIPELINE")]
    pipeline: Vec<String>,
}

/// Arguments for `suite`.
#[derive(Args, Debug)]
struct SuiteCommand {
    /// Suite file path (defaults to `LAUNCH_HARNESS_CONFIG` or `launch-harness.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Maximum cases in flight.
    #[arg(long, value_name = "N")]
    jobs: Option<NonZeroUsize>,
    /// Only run cases whose name contains this text.
    #[arg(long, value_name = "TEXT")]
    filter: Option<String>,
    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate a suite file.
    Validate(ConfigValidateCommand),
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Suite file path (defaults to `LAUNCH_HARNESS_CONFIG` or `launch-harness.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error carrying a single user-facing message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::new(err.to_string())
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    logging::init_logging().map_err(CliError::new)?;

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&format!("launch-harness {version}")).map_err(output_error)?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Run(command) => command_run(command).await,
        Commands::Launch(command) => command_launch(command).await,
        Commands::Suite(command) => command_suite(command).await,
        Commands::Config {
            command,
        } => command_config(command),
    }
}

// ============================================================================
// SECTION: Single Invocations
// ============================================================================

/// Executes the `run` command.
async fn command_run(command: RunCommand) -> CliResult<ExitCode> {
    let RunCommand {
        expect,
        command,
    } = command;
    let Some((executable, args)) = command.split_first() else {
        return Err(CliError::new("missing executable after `--`".to_string()));
    };
    let case = TestCase::new(executable).args(args.iter().cloned());
    execute_single(case, &expect).await
}

/// Executes the `launch` command.
async fn command_launch(command: LaunchCommand) -> CliResult<ExitCode> {
    let spec = LaunchSpec::new(command.tool)
        .verbose(command.verbose)
        .no_color(command.no_color)
        .debug(command.debug.unwrap_or_default())
        .pipeline(command.pipeline);
    execute_single(spec.into_test_case(), &command.expect).await
}

/// Runs one case and writes its report.
async fn execute_single(case: TestCase, expect: &ExpectationArgs) -> CliResult<ExitCode> {
    let overrides = EnvOverrides::load()?;
    let case = expect.apply(case, &overrides);
    let outcome = Harness::new().evaluate(&case).await;
    let rendered = match expect.format {
        OutputFormat::Text => report::render_case_text(&outcome),
        OutputFormat::Json => {
            report::render_json(&CaseReport::from_outcome(&outcome)).map_err(json_error)?
        }
    };
    write_stdout_line(&rendered).map_err(output_error)?;
    Ok(ExitCode::from(outcome.kind.exit_code()))
}

// ============================================================================
// SECTION: Suite Command
// ============================================================================

/// Executes the `suite` command.
async fn command_suite(command: SuiteCommand) -> CliResult<ExitCode> {
    let suite = SuiteConfig::load(command.config.as_deref())?;
    let overrides = EnvOverrides::load()?;
    let mut cases = suite.test_cases(&overrides)?;
    if let Some(filter) = &command.filter {
        cases.retain(|case| case.display_name().contains(filter.as_str()));
        if cases.is_empty() {
            return Err(CliError::new(format!("no cases match filter '{filter}'")));
        }
    }
    let jobs = command.jobs.or_else(|| suite.jobs()).unwrap_or_else(default_jobs);
    debug!(cases = cases.len(), jobs = jobs.get(), "running suite");
    let outcomes = Harness::new().evaluate_all(cases, jobs).await;
    let rendered = match command.format {
        OutputFormat::Text => report::render_suite_text(&outcomes),
        OutputFormat::Json => {
            report::render_json(&SuiteReport::from_outcomes(&outcomes)).map_err(json_error)?
        }
    };
    write_stdout_line(&rendered).map_err(output_error)?;
    Ok(ExitCode::from(report::suite_exit_code(&outcomes)))
}

/// Returns the default suite parallelism.
fn default_jobs() -> NonZeroUsize {
    std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let suite = SuiteConfig::load(command.config.as_deref())?;
    write_stdout_line(&format!("suite ok: {} cases", suite.cases.len())).map_err(output_error)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Argument Parsers
// ============================================================================

/// Parses a `KEY=VALUE` environment override.
fn parse_env_pair(raw: &str) -> Result<(String, String), String> {
    if raw.contains('\0') {
        return Err("environment override must not contain NUL bytes".to_string());
    }
    let (key, value) =
        raw.split_once('=').ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("environment key must be non-empty in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Parses a launcher debug filter.
fn parse_debug_filter(raw: &str) -> Result<DebugFilter, String> {
    raw.parse::<DebugFilter>().map_err(|err| err.to_string())
}

/// Parses a byte count greater than zero.
fn parse_positive_usize(raw: &str) -> Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err("value must be greater than zero".to_string()),
        Ok(value) => Ok(value),
        Err(err) => Err(err.to_string()),
    }
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes the top-level help text to stdout.
fn show_help() -> CliResult<()> {
    let help = Cli::command().render_help();
    write_stdout_line(&help.to_string()).map_err(output_error)
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Wraps an output failure.
fn output_error(err: std::io::Error) -> CliError {
    CliError::new(format!("failed to write output: {err}"))
}

/// Wraps a report serialization failure.
fn json_error(err: serde_json::Error) -> CliError {
    CliError::new(format!("failed to render report: {err}"))
}

/// Emits an error message to stderr and returns the usage exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(&format!("error: {message}"));
    ExitCode::from(USAGE_EXIT_CODE)
}
