// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

pub mod config;
pub mod logging;
pub mod metrics;

pub use config::EngineConfig;
pub use logging::{init_logging, run_span};
pub use metrics::EngineMetrics;
