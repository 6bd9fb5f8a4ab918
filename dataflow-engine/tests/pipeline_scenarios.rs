// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! End-to-end stage-graph scenarios exercising the engine through its
//! public factory and builder API against real (in-process) persistence
//! and artifact adapters.

use std::sync::Arc;
use std::time::Duration;

use dataflow_core::RunMetadata;
use dataflow_engine::artifact::storage::InMemoryArtifactStorage;
use dataflow_engine::persistence::SqlitePersistence;
use dataflow_engine::{ArtifactSpec, Capacity, EngineConfig, EngineFactory, PipelineBuilder, StageConfig};
use sqlx::sqlite::SqlitePoolOptions;

async fn new_factory() -> (EngineFactory, Arc<InMemoryArtifactStorage>) {
    let pool = SqlitePoolOptions::new()
        .connect("sqlite::memory:")
        .await
        .expect("open in-memory sqlite pool");
    let persistence = SqlitePersistence::new(pool);
    persistence.migrate().await.expect("run migrations");
    let artifact_storage = Arc::new(InMemoryArtifactStorage::new());
    let factory = EngineFactory::new(EngineConfig::default(), Arc::new(persistence), artifact_storage.clone());
    (factory, artifact_storage)
}

#[tokio::test]
async fn linear_success_uppercases_every_item() {
    let (factory, _) = new_factory().await;
    let handle = factory.start_run(RunMetadata::fresh("test", "linear")).await.unwrap();
    let ctx = handle.context.clone();

    let sink_out = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink_out2 = sink_out.clone();

    let outcome = PipelineBuilder::from_iter(
        ctx,
        StageConfig::new("read"),
        "letter",
        |item: &&str| item.to_string(),
        vec!["a", "b", "c"],
    )
    .unwrap()
    .transform(StageConfig::new("upper"), |s: &'static str| async move { Ok::<_, String>(s.to_uppercase()) })
    .unwrap()
    .execute(StageConfig::new("collect"), move |s: String| {
        let sink_out2 = sink_out2.clone();
        async move {
            sink_out2.lock().unwrap().push(s);
            Ok::<_, String>(())
        }
    })
    .await
    .unwrap();

    handle.shutdown().await;

    assert_eq!(outcome.counts.total, 3);
    assert_eq!(outcome.counts.completed, 3);
    assert_eq!(outcome.counts.failed, 0);
    let mut collected = sink_out.lock().unwrap().clone();
    collected.sort();
    assert_eq!(collected, vec!["A".to_string(), "B".to_string(), "C".to_string()]);
}

#[tokio::test]
async fn fan_out_completes_parent_once_both_children_finish() {
    let (factory, _) = new_factory().await;
    let handle = factory.start_run(RunMetadata::fresh("test", "fan-out")).await.unwrap();
    let ctx = handle.context.clone();

    let outcome = PipelineBuilder::from_iter(
        ctx,
        StageConfig::new("read"),
        "parent",
        |_: &&str| "p1".to_string(),
        vec!["p1"],
    )
    .unwrap()
    .transform_many(StageConfig::new("explode"), "child", |_: &'static str| async move {
        Ok::<_, String>(vec![("x".to_string(), "x".to_string()), ("y".to_string(), "y".to_string())])
    })
    .unwrap()
    .execute(StageConfig::new("sink"), |_: String| async move { Ok::<_, String>(()) })
    .await
    .unwrap();

    handle.shutdown().await;

    // Parent + two children = 3 resource-runs total, all completed: the
    // parent rolls up once its last child finishes (§4.5 fan-out).
    assert_eq!(outcome.counts.total, 3);
    assert_eq!(outcome.counts.completed, 3);
    assert_eq!(outcome.counts.failed, 0);
}

#[tokio::test]
async fn failure_propagates_with_error_step() {
    let (factory, _) = new_factory().await;
    let handle = factory.start_run(RunMetadata::fresh("test", "failure")).await.unwrap();
    let ctx = handle.context.clone();

    let outcome = PipelineBuilder::from_iter(ctx, StageConfig::new("read"), "number", |n: &i32| n.to_string(), vec![1, 2, 3])
        .unwrap()
        .transform(StageConfig::new("divide"), |n: i32| async move {
            if n == 2 {
                Err("division blew up".to_string())
            } else {
                Ok(n * 10)
            }
        })
        .unwrap()
        .execute(StageConfig::new("sink"), |_: i32| async move { Ok::<_, String>(()) })
        .await
        .unwrap();

    handle.shutdown().await;

    assert_eq!(outcome.counts.total, 3);
    assert_eq!(outcome.counts.completed, 2);
    assert_eq!(outcome.counts.failed, 1);
}

#[tokio::test]
async fn batch_splits_at_the_configured_boundary() {
    let (factory, _) = new_factory().await;
    let handle = factory.start_run(RunMetadata::fresh("test", "batch")).await.unwrap();
    let ctx = handle.context.clone();

    let batch_sizes = Arc::new(std::sync::Mutex::new(Vec::new()));
    let batch_sizes2 = batch_sizes.clone();

    let items: Vec<i32> = (0..250).collect();
    let outcome = PipelineBuilder::from_iter(ctx, StageConfig::new("read"), "item", |n: &i32| n.to_string(), items)
        .unwrap()
        .batch(StageConfig::new("batch").with_capacity(Capacity::Bounded(8)), 100, Duration::from_secs(30))
        .unwrap()
        .execute(StageConfig::new("sink"), move |batch: Vec<i32>| {
            let batch_sizes2 = batch_sizes2.clone();
            async move {
                batch_sizes2.lock().unwrap().push(batch.len());
                Ok::<_, String>(())
            }
        })
        .await
        .unwrap();

    handle.shutdown().await;

    let mut sizes = batch_sizes.lock().unwrap().clone();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![50, 100, 100]);
    assert_eq!(outcome.status, dataflow_core::RunStatus::Completed);
}

#[tokio::test]
async fn with_artifact_writes_one_entry_per_resource() {
    let (factory, artifacts) = new_factory().await;
    let handle = factory.start_run(RunMetadata::fresh("test", "artifact")).await.unwrap();
    let ctx = handle.context.clone();
    let run_id = ctx.run_id;

    PipelineBuilder::from_iter(ctx, StageConfig::new("read"), "item", |n: &i32| n.to_string(), vec![1, 2])
        .unwrap()
        .with_artifact(StageConfig::new("snapshot"), |n: &i32| ArtifactSpec {
            artifact_name: "value".to_string(),
            payload: serde_json::json!({ "n": n }),
            metadata: None,
        })
        .unwrap()
        .execute(StageConfig::new("sink"), |_: i32| async move { Ok::<_, String>(()) })
        .await
        .unwrap();

    handle.shutdown().await;

    assert_eq!(artifacts.len(), 2);
    assert!(artifacts.get(&format!("{run_id}/snapshot/value")).is_some());
}

#[tokio::test]
async fn cancellation_mid_run_stops_the_source_and_drains_cleanly() {
    let (factory, _) = new_factory().await;
    let handle = factory.start_run(RunMetadata::fresh("test", "cancel")).await.unwrap();
    let ctx = handle.context.clone();
    let cancel_ctx = ctx.clone();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel_ctx.cancel();
    });

    // An effectively unbounded source; cancellation is expected to cut it
    // short well before all one million items are produced.
    let items = 0..1_000_000i64;
    let outcome = PipelineBuilder::from_iter(ctx, StageConfig::new("read"), "n", |n: &i64| n.to_string(), items)
        .unwrap()
        .execute(StageConfig::new("sink"), |_: i64| async move {
            tokio::time::sleep(Duration::from_millis(1)).await;
            Ok::<_, String>(())
        })
        .await
        .unwrap();

    handle.shutdown().await;

    assert_eq!(outcome.status, dataflow_core::RunStatus::Cancelled);
    assert!(outcome.counts.total < 1_000_000);
}
