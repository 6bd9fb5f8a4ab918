// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! CLI structure and `clap` parsing, unvalidated.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "dataflow-demo", about = "Runs a stage-graph demo pipeline", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Emit debug-level tracing.
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Optional `pipeline.toml` path (overrides the default search path).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Overrides `defaults.stage_parallelism` for every stage in the run.
    #[arg(long, global = true)]
    pub cpu_threads: Option<usize>,

    /// Overrides `defaults.stage_capacity`, the bounded channel depth between stages.
    #[arg(long, global = true, default_value_t = 64)]
    pub channel_depth: usize,

    /// Overrides the persistence backend (`sqlite::memory:` or a `sqlite://` file path).
    #[arg(long, global = true)]
    pub storage_type: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Runs the word-count demo pipeline over a newline-delimited input file.
    Run {
        /// Path to a UTF-8 text file, one item per line.
        input: PathBuf,

        /// Run category recorded on the `pipeline_runs` row.
        #[arg(long, default_value = "demo")]
        category: String,

        /// Run name recorded on the `pipeline_runs` row.
        #[arg(long, default_value = "word-count")]
        name: String,
    },
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
