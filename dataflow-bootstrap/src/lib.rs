// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

// Production code safety enforced via CI and `make lint-strict`
// (lib/bins checked separately from tests - tests may use unwrap/expect)

//! # Bootstrap Module
//!
//! The bootstrap module sits **outside** `dataflow-core` and
//! `dataflow-engine` and provides everything a process entry point needs
//! that the engine itself deliberately does not: CLI argument parsing,
//! signal handling, platform abstraction, and exit-code mapping.
//!
//! ## Key Design Principles
//!
//! 1. **Separation from the engine** - bootstrap depends on
//!    `dataflow-engine`, never the reverse.
//! 2. **Platform abstraction** - OS-specific functionality lives behind
//!    the [`platform::Platform`] trait, with a POSIX and a Windows
//!    implementation selected at compile time.
//! 3. **Graceful shutdown** - signal handlers cancel both a
//!    [`shutdown::ShutdownCoordinator`] and the running
//!    [`dataflow_engine::Context`]'s own cancellation token.
//! 4. **Security first** - every CLI argument is validated for path
//!    traversal and injection characters before it reaches the engine.
//!
//! ## Usage Example
//!
//! ```rust
//! use dataflow_bootstrap::platform::create_platform;
//!
//! let platform = create_platform();
//! println!("Running on: {}", platform.platform_name());
//! ```
//!
//! ## Module Structure
//!
//! - `cli` - Secure argument parsing
//! - `config` - Bridges validated CLI flags into `DATAFLOW_*` env overrides
//! - `exit_code` - Maps `EngineError` onto `sysexits.h` codes
//! - `platform` - OS abstraction (Unix/Windows)
//! - `shutdown` - Shutdown coordination
//! - `signals` - Signal handling (SIGTERM, SIGINT, SIGHUP)

pub mod cli;
pub mod config;
pub mod exit_code;
pub mod platform;
pub mod shutdown;
pub mod signals;

pub use cli::{parse_and_validate, ValidatedCli, ValidatedCommand};
pub use exit_code::{map_error_to_exit_code, result_to_exit_code, ExitCode};

/// Parses and validates CLI arguments.
///
/// The caller is responsible for running the pipeline and mapping the
/// result to an exit code with [`result_to_exit_code`].
///
/// # Errors
///
/// Returns `cli::ParseError` if CLI parsing or validation fails. `clap`
/// handles `--help` and `--version` itself and exits the process before
/// this function returns.
pub fn bootstrap_cli() -> Result<ValidatedCli, cli::ParseError> {
    cli::parse_and_validate()
}
