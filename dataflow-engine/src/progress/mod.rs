// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

pub mod tracker;

pub use tracker::{ProgressTracker, ResourceSnapshot, StepMetric, TrackerSnapshot};
