// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stage-Graph Builder
//!
//! A typestate fluent builder over the current stage's output payload
//! type (§4.4): `StageBuilder<T>` only offers `.transform(...)` calls whose
//! user function accepts `T`, so wiring two incompatible stages together
//! is a compile error rather than a runtime one. Each method consumes
//! `self` and returns a `StageBuilder<U>` wired to a freshly spawned
//! worker pool; `execute()` is the only method that does not return a
//! builder, draining the graph to a [`RunOutcome`].
//!
//! Every stage reads from a single shared input receiver
//! (`Arc<tokio::sync::Mutex<StageReceiver<_>>>`) so `max_parallelism`
//! workers can fan out over one upstream channel; each owns its own clone
//! of the output sender, so the output channel only closes once every
//! worker has dropped its clone, which happens exactly when the shared
//! input has drained.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::Utc;
use dataflow_core::{ArtifactSaveRequest, Envelope, EngineError, EngineResult, ResourcePath};
use futures::Stream;
use futures::StreamExt;
use tokio::sync::Mutex as TokioMutex;
use tokio::task::JoinSet;
use tracing::warn;

use crate::context::{finalize_run, Context, RunOutcome};
use crate::stage::channel::{make_channel, StageReceiver};
use crate::stage::StageConfig;

/// One artifact to save, built from a stage's current payload by a
/// `with-artifact` closure.
pub struct ArtifactSpec {
    pub artifact_name: String,
    pub payload: serde_json::Value,
    pub metadata: Option<serde_json::Value>,
}

type StepNames = Arc<StdMutex<HashSet<String>>>;

pub struct StageBuilder<T> {
    ctx: Arc<Context>,
    rx: StageReceiver<Envelope<T>>,
    step_names: StepNames,
    tasks: JoinSet<()>,
}

pub struct PipelineBuilder;

impl PipelineBuilder {
    /// Starts a stage graph from a finite synchronous sequence (§4.3
    /// source). `id_selector` supplies each item's stable resource-id.
    pub fn from_iter<T, I>(
        ctx: Arc<Context>,
        opts: StageConfig,
        resource_type: impl Into<String>,
        id_selector: impl Fn(&T) -> String + Send + Sync + 'static,
        items: I,
    ) -> EngineResult<StageBuilder<T>>
    where
        T: Send + 'static,
        I: IntoIterator<Item = T> + Send + 'static,
        I::IntoIter: Send,
    {
        opts.validate()?;
        let (tx, rx) = make_channel::<Envelope<T>>(opts.capacity);
        let mut tasks = JoinSet::new();
        let ctx2 = ctx.clone();
        let resource_type = resource_type.into();
        let tracking = opts.enable_progress_tracking;
        tasks.spawn(async move {
            for item in items {
                if ctx2.is_cancelled() {
                    break;
                }
                let resource_id = id_selector(&item);
                if tracking {
                    let path = ResourcePath::root(resource_id.clone());
                    if let Err(err) = ctx2
                        .progress_tracker
                        .record_resource_start(&path, &resource_type, Utc::now())
                    {
                        warn!(error = %err, resource_id = %resource_id, "dropping source item, resource-run registration failed");
                        continue;
                    }
                }
                let env = Envelope::success(item, resource_id, Duration::ZERO);
                if tx.send(env).await.is_err() {
                    break;
                }
            }
        });

        let mut step_names = HashSet::new();
        step_names.insert(opts.step_name);
        Ok(StageBuilder {
            ctx,
            rx,
            step_names: Arc::new(StdMutex::new(step_names)),
            tasks,
        })
    }

    /// Starts a stage graph from a finite asynchronous sequence (§4.3
    /// source, async variant).
    pub fn from_stream<T, S>(
        ctx: Arc<Context>,
        opts: StageConfig,
        resource_type: impl Into<String>,
        id_selector: impl Fn(&T) -> String + Send + Sync + 'static,
        stream: S,
    ) -> EngineResult<StageBuilder<T>>
    where
        T: Send + 'static,
        S: Stream<Item = T> + Send + 'static,
    {
        opts.validate()?;
        let (tx, rx) = make_channel::<Envelope<T>>(opts.capacity);
        let mut tasks = JoinSet::new();
        let ctx2 = ctx.clone();
        let resource_type = resource_type.into();
        let tracking = opts.enable_progress_tracking;
        tasks.spawn(async move {
            tokio::pin!(stream);
            while let Some(item) = stream.next().await {
                if ctx2.is_cancelled() {
                    break;
                }
                let resource_id = id_selector(&item);
                if tracking {
                    let path = ResourcePath::root(resource_id.clone());
                    if let Err(err) = ctx2
                        .progress_tracker
                        .record_resource_start(&path, &resource_type, Utc::now())
                    {
                        warn!(error = %err, resource_id = %resource_id, "dropping source item, resource-run registration failed");
                        continue;
                    }
                }
                let env = Envelope::success(item, resource_id, Duration::ZERO);
                if tx.send(env).await.is_err() {
                    break;
                }
            }
        });

        let mut step_names = HashSet::new();
        step_names.insert(opts.step_name);
        Ok(StageBuilder {
            ctx,
            rx,
            step_names: Arc::new(StdMutex::new(step_names)),
            tasks,
        })
    }
}

fn elapsed_since(start: chrono::DateTime<Utc>, now: chrono::DateTime<Utc>) -> Duration {
    (now - start).to_std().unwrap_or(Duration::ZERO)
}

impl<T: Send + 'static> StageBuilder<T> {
    fn register_step_name(&self, name: &str) -> EngineResult<()> {
        let mut names = self.step_names.lock().expect("step-name registry poisoned");
        if !names.insert(name.to_string()) {
            return Err(EngineError::DuplicateStepName(name.to_string()));
        }
        Ok(())
    }

    /// A one-in, one-out stage (§4.3 transform). `f` is applied to every
    /// `Success` payload; a `Failure` is forwarded untouched and `f` is
    /// never invoked for it.
    pub fn transform<U, F, Fut>(mut self, opts: StageConfig, f: F) -> EngineResult<StageBuilder<U>>
    where
        U: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<U, String>> + Send + 'static,
    {
        opts.validate()?;
        self.register_step_name(&opts.step_name)?;
        let (tx, out_rx) = make_channel::<Envelope<U>>(opts.capacity);
        let shared_in = Arc::new(TokioMutex::new(self.rx));
        let f = Arc::new(f);
        let tracking = opts.enable_progress_tracking;

        for _ in 0..opts.max_parallelism.get() {
            let shared_in = shared_in.clone();
            let tx = tx.clone();
            let ctx = self.ctx.clone();
            let f = f.clone();
            let step_name = opts.step_name.clone();
            self.tasks.spawn(async move {
                loop {
                    if ctx.is_cancelled() {
                        break;
                    }
                    let env = { shared_in.lock().await.recv().await };
                    let Some(env) = env else { break };

                    let out = match env {
                        Envelope::Failure {
                            resource_id,
                            error_message,
                            error_step,
                            duration,
                        } => Envelope::Failure {
                            resource_id,
                            error_message,
                            error_step,
                            duration,
                        },
                        Envelope::Success { payload, resource_id, .. } => {
                            let path = ResourcePath::parse(&resource_id).unwrap_or_else(|_| ResourcePath::root(resource_id.clone()));
                            let start = Utc::now();
                            if tracking {
                                ctx.progress_tracker.record_step_start(&path, &step_name, start);
                            }
                            match f(payload).await {
                                Ok(new_payload) => {
                                    let now = Utc::now();
                                    if tracking {
                                        ctx.progress_tracker.record_step_complete(&path, &step_name, start, now);
                                    }
                                    Envelope::success(new_payload, resource_id, elapsed_since(start, now))
                                }
                                Err(error_message) => {
                                    let now = Utc::now();
                                    if tracking {
                                        ctx.progress_tracker
                                            .record_step_failed(&path, &step_name, start, now, Some(error_message.clone()));
                                    }
                                    Envelope::failure(resource_id, error_message, step_name.clone(), elapsed_since(start, now))
                                }
                            }
                        }
                    };
                    if tx.send(out).await.is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        Ok(StageBuilder {
            ctx: self.ctx,
            rx: out_rx,
            step_names: self.step_names,
            tasks: self.tasks,
        })
    }

    /// A one-in, zero-or-more-out stage (§4.3 transform-many). `f` returns
    /// `(child_id, payload)` pairs; each becomes a new resource-run whose
    /// [`ResourcePath`] extends the parent's with `child_id`. The parent
    /// itself reaches a terminal state once every child it produced does
    /// (§4.5 supplement); it never flows downstream itself.
    pub fn transform_many<U, F, Fut>(
        mut self,
        opts: StageConfig,
        child_resource_type: impl Into<String>,
        f: F,
    ) -> EngineResult<StageBuilder<U>>
    where
        U: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<(String, U)>, String>> + Send + 'static,
    {
        opts.validate()?;
        self.register_step_name(&opts.step_name)?;
        let (tx, out_rx) = make_channel::<Envelope<U>>(opts.capacity);
        let shared_in = Arc::new(TokioMutex::new(self.rx));
        let f = Arc::new(f);
        let tracking = opts.enable_progress_tracking;
        let child_resource_type = child_resource_type.into();

        for _ in 0..opts.max_parallelism.get() {
            let shared_in = shared_in.clone();
            let tx = tx.clone();
            let ctx = self.ctx.clone();
            let f = f.clone();
            let step_name = opts.step_name.clone();
            let child_resource_type = child_resource_type.clone();
            self.tasks.spawn(async move {
                loop {
                    if ctx.is_cancelled() {
                        break;
                    }
                    let env = { shared_in.lock().await.recv().await };
                    let Some(env) = env else { break };

                    match env {
                        Envelope::Failure {
                            resource_id,
                            error_message,
                            error_step,
                            duration,
                        } => {
                            if tx
                                .send(Envelope::Failure {
                                    resource_id,
                                    error_message,
                                    error_step,
                                    duration,
                                })
                                .await
                                .is_err()
                            {
                                break;
                            }
                        }
                        Envelope::Success { payload, resource_id, .. } => {
                            let parent_path =
                                ResourcePath::parse(&resource_id).unwrap_or_else(|_| ResourcePath::root(resource_id.clone()));
                            let start = Utc::now();
                            if tracking {
                                ctx.progress_tracker.record_step_start(&parent_path, &step_name, start);
                            }
                            match f(payload).await {
                                Ok(children) => {
                                    let now = Utc::now();
                                    if tracking {
                                        ctx.progress_tracker.record_step_complete(&parent_path, &step_name, start, now);
                                        ctx.progress_tracker.begin_fan_out(&parent_path, children.len(), now);
                                    }
                                    for (child_id, child_payload) in children {
                                        let child_path = parent_path.child(child_id);
                                        if tracking {
                                            if let Err(err) = ctx.progress_tracker.record_resource_start(
                                                &child_path,
                                                &child_resource_type,
                                                now,
                                            ) {
                                                warn!(error = %err, path = %child_path, "dropping transform-many child, duplicate resource id");
                                                continue;
                                            }
                                        }
                                        let out = Envelope::success(child_payload, child_path.to_string(), Duration::ZERO);
                                        if tx.send(out).await.is_err() {
                                            return;
                                        }
                                    }
                                }
                                Err(error_message) => {
                                    let now = Utc::now();
                                    if tracking {
                                        ctx.progress_tracker.record_step_failed(
                                            &parent_path,
                                            &step_name,
                                            start,
                                            now,
                                            Some(error_message.clone()),
                                        );
                                        ctx.progress_tracker.record_resource_complete(
                                            &parent_path,
                                            dataflow_core::ResourceRunStatus::Failed,
                                            Some(error_message.clone()),
                                            Some(step_name.clone()),
                                            now,
                                        );
                                    }
                                    let out: Envelope<U> =
                                        Envelope::failure(resource_id, error_message, step_name.clone(), elapsed_since(start, now));
                                    if tx.send(out).await.is_err() {
                                        break;
                                    }
                                }
                            }
                        }
                    }
                }
            });
        }
        drop(tx);

        Ok(StageBuilder {
            ctx: self.ctx,
            rx: out_rx,
            step_names: self.step_names,
            tasks: self.tasks,
        })
    }

    /// Groups `batch_size` `Success` payloads into one `Vec<T>` (§4.3
    /// batch). A `Failure` is forwarded immediately, never batched. The
    /// final, possibly-partial batch is flushed when the input closes or
    /// `flush_interval` elapses with a non-empty buffer, whichever comes
    /// first. Runs with a single worker regardless of `opts`'s
    /// parallelism, since the buffer is inherently sequential state.
    pub fn batch(mut self, opts: StageConfig, batch_size: usize, flush_interval: Duration) -> EngineResult<StageBuilder<Vec<T>>> {
        opts.validate()?;
        self.register_step_name(&opts.step_name)?;
        let (tx, out_rx) = make_channel::<Envelope<Vec<T>>>(opts.capacity);
        let mut rx = self.rx;
        let ctx = self.ctx.clone();
        let tracking = opts.enable_progress_tracking;
        let batch_size = batch_size.max(1);

        self.tasks.spawn(async move {
            let mut buffer: Vec<T> = Vec::with_capacity(batch_size);
            let mut ticker = tokio::time::interval(flush_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut seq: u64 = 0;

            loop {
                tokio::select! {
                    biased;
                    env = rx.recv() => {
                        match env {
                            Some(Envelope::Failure { resource_id, error_message, error_step, duration }) => {
                                if tx.send(Envelope::Failure { resource_id, error_message, error_step, duration }).await.is_err() {
                                    return;
                                }
                            }
                            Some(Envelope::Success { payload, .. }) => {
                                buffer.push(payload);
                                if buffer.len() >= batch_size {
                                    if flush_batch(&tx, &ctx, &mut buffer, &mut seq, tracking).await.is_err() {
                                        return;
                                    }
                                }
                            }
                            None => {
                                let _ = flush_batch(&tx, &ctx, &mut buffer, &mut seq, tracking).await;
                                return;
                            }
                        }
                    }
                    _ = ticker.tick() => {
                        if !buffer.is_empty() && flush_batch(&tx, &ctx, &mut buffer, &mut seq, tracking).await.is_err() {
                            return;
                        }
                    }
                }
            }
        });

        Ok(StageBuilder {
            ctx: self.ctx,
            rx: out_rx,
            step_names: self.step_names,
            tasks: self.tasks,
        })
    }

    /// Tees the current payload to the artifact batcher without altering
    /// the main dataflow (§4.3 broadcast / with-artifact). `T` must be
    /// `Clone` since the payload both continues downstream and is copied
    /// into the artifact save request.
    pub fn with_artifact<F>(mut self, opts: StageConfig, f: F) -> EngineResult<StageBuilder<T>>
    where
        T: Clone,
        F: Fn(&T) -> ArtifactSpec + Send + Sync + 'static,
    {
        opts.validate()?;
        self.register_step_name(&opts.step_name)?;
        let (tx, out_rx) = make_channel::<Envelope<T>>(opts.capacity);
        let shared_in = Arc::new(TokioMutex::new(self.rx));
        let f = Arc::new(f);

        for _ in 0..opts.max_parallelism.get() {
            let shared_in = shared_in.clone();
            let tx = tx.clone();
            let ctx = self.ctx.clone();
            let f = f.clone();
            let step_name = opts.step_name.clone();
            self.tasks.spawn(async move {
                loop {
                    if ctx.is_cancelled() {
                        break;
                    }
                    let env = { shared_in.lock().await.recv().await };
                    let Some(env) = env else { break };

                    if let Envelope::Success { payload, resource_id, duration } = &env {
                        let path = ResourcePath::parse(resource_id).unwrap_or_else(|_| ResourcePath::root(resource_id.clone()));
                        if let Some(resource_run_id) = ctx.resource_cache.get(ctx.run_id, path.leaf_id()) {
                            let spec = f(payload);
                            let request = ArtifactSaveRequest {
                                resource_run_id,
                                step_name: step_name.clone(),
                                artifact_name: spec.artifact_name,
                                payload: spec.payload,
                                storage_override: None,
                                metadata: spec.metadata,
                            };
                            ctx.artifact_batcher.enqueue(request).await;
                        } else {
                            warn!(path = %path, "with-artifact: no resource-run registered, skipping artifact");
                        }
                        let _ = duration;
                    }

                    if tx.send(env).await.is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        Ok(StageBuilder {
            ctx: self.ctx,
            rx: out_rx,
            step_names: self.step_names,
            tasks: self.tasks,
        })
    }

    /// The terminal sink (§4.3 sink). Drains the graph, calls `sink_fn` on
    /// every surviving `Success` payload, records each resource's terminal
    /// status, waits for every upstream stage task to finish, and finally
    /// flushes the tracker and artifact batcher before computing the
    /// run's overall outcome.
    pub async fn execute<F, Fut>(mut self, opts: StageConfig, sink_fn: F) -> EngineResult<RunOutcome>
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        opts.validate()?;
        self.register_step_name(&opts.step_name)?;
        let shared_in = Arc::new(TokioMutex::new(self.rx));
        let sink_fn = Arc::new(sink_fn);
        let tracking = opts.enable_progress_tracking;
        let mut sink_tasks = JoinSet::new();

        for _ in 0..opts.max_parallelism.get() {
            let shared_in = shared_in.clone();
            let ctx = self.ctx.clone();
            let sink_fn = sink_fn.clone();
            let step_name = opts.step_name.clone();
            sink_tasks.spawn(async move {
                loop {
                    if ctx.is_cancelled() {
                        break;
                    }
                    let env = { shared_in.lock().await.recv().await };
                    let Some(env) = env else { break };

                    match env {
                        Envelope::Failure {
                            resource_id,
                            error_message,
                            error_step,
                            ..
                        } => {
                            let path = ResourcePath::parse(&resource_id).unwrap_or_else(|_| ResourcePath::root(resource_id.clone()));
                            if tracking {
                                ctx.progress_tracker.record_resource_complete(
                                    &path,
                                    dataflow_core::ResourceRunStatus::Failed,
                                    Some(error_message),
                                    Some(error_step),
                                    Utc::now(),
                                );
                            }
                        }
                        Envelope::Success { payload, resource_id, .. } => {
                            let path = ResourcePath::parse(&resource_id).unwrap_or_else(|_| ResourcePath::root(resource_id.clone()));
                            let start = Utc::now();
                            if tracking {
                                ctx.progress_tracker.record_step_start(&path, &step_name, start);
                            }
                            let result = sink_fn(payload).await;
                            let now = Utc::now();
                            match result {
                                Ok(()) => {
                                    if tracking {
                                        ctx.progress_tracker.record_step_complete(&path, &step_name, start, now);
                                        ctx.progress_tracker.record_resource_complete(
                                            &path,
                                            dataflow_core::ResourceRunStatus::Completed,
                                            None,
                                            None,
                                            now,
                                        );
                                    }
                                }
                                Err(error_message) => {
                                    if tracking {
                                        ctx.progress_tracker
                                            .record_step_failed(&path, &step_name, start, now, Some(error_message.clone()));
                                        ctx.progress_tracker.record_resource_complete(
                                            &path,
                                            dataflow_core::ResourceRunStatus::Failed,
                                            Some(error_message),
                                            Some(step_name.clone()),
                                            now,
                                        );
                                    }
                                }
                            }
                        }
                    }
                }
            });
        }

        // Drain every upstream producer/transform task first, so any panic
        // there surfaces before we report a (possibly misleadingly clean)
        // outcome.
        while let Some(result) = self.tasks.join_next().await {
            if let Err(err) = result {
                warn!(error = %err, "stage worker task panicked");
            }
        }
        while let Some(result) = sink_tasks.join_next().await {
            if let Err(err) = result {
                warn!(error = %err, "sink worker task panicked");
            }
        }

        finalize_run(&self.ctx).await
    }
}

async fn flush_batch<T: Send + 'static>(
    tx: &crate::stage::channel::StageSender<Envelope<Vec<T>>>,
    ctx: &Arc<Context>,
    buffer: &mut Vec<T>,
    seq: &mut u64,
    tracking: bool,
) -> Result<(), ()> {
    if buffer.is_empty() {
        return Ok(());
    }
    let drained = std::mem::take(buffer);
    let synthetic_id = format!("batch-{seq}");
    *seq += 1;
    if tracking {
        let path = ResourcePath::root(synthetic_id.clone());
        let _ = ctx.progress_tracker.record_resource_start(&path, "batch", Utc::now());
    }
    let env = Envelope::success(drained, synthetic_id, Duration::ZERO);
    tx.send(env).await.map_err(|_| ())
}
