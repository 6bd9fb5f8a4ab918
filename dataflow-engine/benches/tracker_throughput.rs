// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Throughput of the progress tracker's hot path (§4.5): one
//! `record_resource_start` / `record_step_start` / `record_step_complete` /
//! `record_resource_complete` cycle per resource, the sequence every stage
//! worker drives once per item. No persistence or channel I/O is on this
//! path, so the benchmark isolates the tracker's own lock contention and
//! bookkeeping cost.

use std::sync::Arc;

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dataflow_core::{ResourcePath, ResourceRunStatus, RunId};
use dataflow_engine::{DuplicatePolicy, ProgressTracker, ResourceRunCache};

fn run_cycle(tracker: &ProgressTracker, resource_id: &str) {
    let path = ResourcePath::root(resource_id);
    let now = Utc::now();
    tracker.record_resource_start(&path, "item", now).unwrap();
    tracker.record_step_start(&path, "transform", now);
    tracker.record_step_complete(&path, "transform", now, now);
    tracker.record_resource_complete(&path, ResourceRunStatus::Completed, None, None, now);
}

fn bench_single_threaded(c: &mut Criterion) {
    let mut group = c.benchmark_group("tracker_single_threaded");
    for count in [100usize, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let cache = Arc::new(ResourceRunCache::new(DuplicatePolicy::Reject));
                let tracker = ProgressTracker::new(RunId::new(), cache, 5);
                for i in 0..count {
                    run_cycle(&tracker, &format!("r{i}"));
                }
                black_box(tracker.snapshot());
            });
        });
    }
    group.finish();
}

fn bench_sharded_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("tracker_sharded_contention");
    for workers in [2usize, 4, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |b, &workers| {
            b.iter(|| {
                let cache = Arc::new(ResourceRunCache::new(DuplicatePolicy::Reject));
                let tracker = Arc::new(ProgressTracker::new(RunId::new(), cache, 5));
                std::thread::scope(|scope| {
                    for w in 0..workers {
                        let tracker = tracker.clone();
                        scope.spawn(move || {
                            for i in 0..500 {
                                run_cycle(&tracker, &format!("w{w}-r{i}"));
                            }
                        });
                    }
                });
                black_box(tracker.snapshot());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_single_threaded, bench_sharded_contention);
criterion_main!(benches);
