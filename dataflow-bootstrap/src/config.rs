// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap Configuration Bridge
//!
//! Translates [`crate::cli::ValidatedCli`] flags into the `DATAFLOW_*`
//! environment variables [`dataflow_engine::EngineConfig::load`] reads, so
//! a CLI flag always wins over a `pipeline.toml` value, which in turn wins
//! over the compiled-in default. This bridge exists only to avoid asking
//! `EngineConfig` to know about `clap`; the two crates stay independent.

use crate::cli::ValidatedCli;

/// Sets `DATAFLOW_*` overrides for the flags the CLI exposes directly.
/// Must run before [`dataflow_engine::EngineConfig::load`] is called.
pub fn apply_cli_overrides(cli: &ValidatedCli) {
    if let Some(threads) = cli.cpu_threads {
        std::env::set_var("DATAFLOW_DEFAULTS__STAGE_PARALLELISM", threads.to_string());
    }
    std::env::set_var("DATAFLOW_DEFAULTS__STAGE_CAPACITY", cli.channel_depth.to_string());
    if let Some(storage_type) = &cli.storage_type {
        std::env::set_var("DATAFLOW_PERSISTENCE__DATABASE_URL", storage_type);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ValidatedCommand;
    use std::path::PathBuf;

    #[test]
    fn overrides_set_expected_env_vars() {
        let cli = ValidatedCli {
            command: ValidatedCommand::Run {
                input: PathBuf::from("items.txt"),
                category: "demo".to_string(),
                name: "run".to_string(),
            },
            verbose: false,
            config: None,
            cpu_threads: Some(8),
            channel_depth: 32,
            storage_type: None,
        };
        apply_cli_overrides(&cli);
        assert_eq!(std::env::var("DATAFLOW_DEFAULTS__STAGE_PARALLELISM").unwrap(), "8");
        assert_eq!(std::env::var("DATAFLOW_DEFAULTS__STAGE_CAPACITY").unwrap(), "32");
    }
}
