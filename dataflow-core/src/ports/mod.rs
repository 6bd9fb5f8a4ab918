// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Ports
//!
//! The infrastructure-facing traits the engine depends on but does not
//! implement itself: durable progress persistence (C6) and artifact
//! storage (C9). `dataflow-engine` ships reference implementations of
//! both; embedding applications may supply their own.

pub mod artifact_storage;
pub mod persistence;

pub use artifact_storage::ArtifactStorageAdapter;
pub use persistence::ProgressPersistence;
