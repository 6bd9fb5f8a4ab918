// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # `dataflow-demo` Binary
//!
//! Wires the bootstrap layer's CLI, config bridge, platform abstraction,
//! and shutdown coordination to a small end-to-end pipeline: reads one
//! item per line from the input file, counts its words, and logs a
//! summary line per item as the sink.

use std::io::BufRead;
use std::process::ExitCode;
use std::sync::Arc;

use dataflow_bootstrap::platform::create_platform;
use dataflow_bootstrap::shutdown::ShutdownCoordinator;
use dataflow_bootstrap::{cli::ValidatedCommand, config, exit_code, result_to_exit_code, ExitCode as AppExitCode};
use dataflow_core::RunMetadata;
use dataflow_engine::artifact::storage::InMemoryArtifactStorage;
use dataflow_engine::persistence::SqlitePersistence;
use dataflow_engine::{init_logging, EngineConfig, EngineFactory, PipelineBuilder, StageConfig};
use sqlx::sqlite::SqlitePoolOptions;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match dataflow_bootstrap::bootstrap_cli() {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("error: {err}");
            return exit_code::parse_error_exit_code(&err).into();
        }
    };

    init_logging();

    let platform = create_platform();
    tracing::info!(
        platform = platform.platform_name(),
        cpu_count = platform.cpu_count(),
        "starting dataflow-demo"
    );
    if platform.is_elevated() {
        tracing::warn!("running with elevated privileges; dataflow-demo needs none");
    }

    let cli_had_explicit_parallelism = cli.cpu_threads.is_some();
    config::apply_cli_overrides(&cli);
    let engine_config = match EngineConfig::load() {
        Ok(cfg) => cfg,
        Err(err) => return result_to_exit_code(Err(err)),
    };

    let stage_parallelism = if cli_had_explicit_parallelism {
        engine_config.defaults.stage_parallelism
    } else {
        platform.cpu_count()
    };
    let stage_capacity = dataflow_engine::Capacity::Bounded(engine_config.defaults.stage_capacity);
    let database_url = engine_config.persistence.database_url.clone();
    let pool = match SqlitePoolOptions::new().connect(&database_url).await {
        Ok(pool) => pool,
        Err(err) => {
            tracing::error!(error = %err, "failed to open storage pool");
            return AppExitCode::Unavailable.into();
        }
    };

    let persistence = SqlitePersistence::new(pool);
    if let Err(err) = persistence.migrate().await {
        return result_to_exit_code(Err(err));
    }

    let factory = EngineFactory::new(
        engine_config,
        Arc::new(persistence),
        Arc::new(InMemoryArtifactStorage::new()),
    );

    let coordinator = ShutdownCoordinator::default();

    let result = run(&cli.command, &factory, coordinator, stage_parallelism, stage_capacity).await;
    result_to_exit_code(result)
}

async fn run(
    command: &ValidatedCommand,
    factory: &EngineFactory,
    coordinator: ShutdownCoordinator,
    stage_parallelism: usize,
    stage_capacity: dataflow_engine::Capacity,
) -> Result<(), dataflow_core::EngineError> {
    let ValidatedCommand::Run { input, category, name } = command;

    let items: Vec<(usize, String)> = read_lines(input)?.into_iter().enumerate().collect();

    let run_guard = coordinator.track_run();
    let handle = factory.start_run(RunMetadata::fresh(category.clone(), name.clone())).await?;
    dataflow_bootstrap::signals::install_signal_handlers(coordinator.clone(), handle.context.clone());

    let ctx = handle.context.clone();
    let outcome = PipelineBuilder::from_iter(
        ctx.clone(),
        StageConfig::new("read").with_capacity(stage_capacity.clone()),
        "line",
        |(idx, _): &(usize, String)| format!("line-{idx}"),
        items,
    )?
    .transform(
        StageConfig::new("count-words")
            .with_parallelism(stage_parallelism)?
            .with_capacity(stage_capacity),
        |(_, line): (usize, String)| async move { Ok::<_, String>(line.split_whitespace().count()) },
    )?
    .execute(StageConfig::new("log-count"), |count: usize| async move {
        tracing::info!(word_count = count, "item processed");
        Ok::<_, String>(())
    })
    .await?;

    handle.shutdown().await;
    drop(run_guard);
    coordinator.initiate_shutdown();
    coordinator.wait_for_shutdown().await;

    tracing::info!(
        run_id = %outcome.run_id,
        status = ?outcome.status,
        completed = outcome.counts.completed,
        failed = outcome.counts.failed,
        "run finished"
    );

    if matches!(outcome.status, dataflow_core::RunStatus::Failed) {
        return Err(dataflow_core::EngineError::StageFailure {
            step: "log-count".to_string(),
            source_message: format!("{} resource(s) failed", outcome.counts.failed),
        });
    }
    Ok(())
}

fn read_lines(path: &std::path::Path) -> Result<Vec<String>, dataflow_core::EngineError> {
    let file = std::fs::File::open(path)
        .map_err(|e| dataflow_core::EngineError::InvalidConfiguration(format!("cannot open {}: {e}", path.display())))?;
    std::io::BufReader::new(file)
        .lines()
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| dataflow_core::EngineError::InvalidConfiguration(format!("cannot read {}: {e}", path.display())))
}
