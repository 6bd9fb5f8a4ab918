// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

pub mod batched;
pub mod sqlite_store;

pub use batched::PersistenceFlusher;
pub use sqlite_store::SqlitePersistence;
