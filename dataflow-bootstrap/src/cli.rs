// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface Module
//!
//! Bootstrap-layer CLI handling with security-first design.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  1. parser::parse()                 │  Parse CLI with clap
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  2. validator::validate()           │  Security validation
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  3. ValidatedCli                    │  Safe, validated config
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `parser` - CLI structure and clap parsing
//! - `validator` - Security validation layer

pub mod parser;
pub mod validator;

pub use parser::{parse_cli, Cli, Commands};
pub use validator::{ParseError, SecureArgParser};

use std::path::PathBuf;

/// Validated CLI configuration: every path exists and every string
/// argument is free of injection-prone characters.
#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub verbose: bool,
    pub config: Option<PathBuf>,
    pub cpu_threads: Option<usize>,
    pub channel_depth: usize,
    pub storage_type: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ValidatedCommand {
    Run { input: PathBuf, category: String, name: String },
}

/// Parses CLI arguments with `clap`, then applies security validation.
///
/// # Errors
///
/// Returns [`ParseError`] if any path does not exist or any string
/// argument contains a disallowed character.
pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    let cli = parse_cli();
    validate_cli(cli)
}

fn validate_cli(cli: Cli) -> Result<ValidatedCli, ParseError> {
    let config = if let Some(ref path) = cli.config {
        SecureArgParser::validate_argument(&path.to_string_lossy())?;
        Some(path.clone())
    } else {
        None
    };

    if cli.channel_depth == 0 {
        return Err(ParseError::InvalidValue {
            arg: "channel-depth".to_string(),
            reason: "must be greater than 0".to_string(),
        });
    }

    if let Some(threads) = cli.cpu_threads {
        if threads == 0 || threads > 128 {
            return Err(ParseError::InvalidValue {
                arg: "cpu-threads".to_string(),
                reason: "must be between 1 and 128".to_string(),
            });
        }
    }

    if let Some(storage_type) = &cli.storage_type {
        SecureArgParser::validate_argument(storage_type)?;
    }

    let command = match cli.command {
        Commands::Run { input, category, name } => {
            let validated_input = SecureArgParser::validate_path(&input.to_string_lossy())?;
            SecureArgParser::validate_argument(&category)?;
            SecureArgParser::validate_argument(&name)?;
            ValidatedCommand::Run {
                input: validated_input,
                category,
                name,
            }
        }
    };

    Ok(ValidatedCli {
        command,
        verbose: cli.verbose,
        config,
        cpu_threads: cli.cpu_threads,
        channel_depth: cli.channel_depth,
        storage_type: cli.storage_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_channel_depth() {
        let cli = Cli {
            command: Commands::Run {
                input: PathBuf::from("Cargo.toml"),
                category: "demo".to_string(),
                name: "run".to_string(),
            },
            verbose: false,
            config: None,
            cpu_threads: None,
            channel_depth: 0,
            storage_type: None,
        };
        assert!(validate_cli(cli).is_err());
    }

    #[test]
    fn rejects_out_of_range_cpu_threads() {
        let cli = Cli {
            command: Commands::Run {
                input: PathBuf::from("Cargo.toml"),
                category: "demo".to_string(),
                name: "run".to_string(),
            },
            verbose: false,
            config: None,
            cpu_threads: Some(0),
            channel_depth: 64,
            storage_type: None,
        };
        assert!(validate_cli(cli).is_err());
    }
}
