// crates/launch-harness-config/src/lib.rs
// ============================================================================
// Module: Launch Harness Config Library
// Description: Suite file model and environment overrides.
// Purpose: Single source of truth for launch-harness.toml semantics.
// Dependencies: launch-harness-core, serde, toml
// ============================================================================

//! ## Overview
//! `launch-harness-config` loads declarative suite files and turns each
//! `[[case]]` entry into a [`TestCase`](launch_harness_core::TestCase).
//! Validation is strict and fail-closed: unknown keys, oversized files,
//! duplicate names, and malformed launch specs are rejected before anything
//! is spawned.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod env;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use env::EnvOverrides;
pub use env::HarnessEnv;
pub use env::MAX_TIMEOUT_FLOOR_SECONDS;
pub use env::read_env_strict;
