// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Signal Handling
//!
//! Installs OS signal handlers (`SIGTERM`, `SIGINT`, and `SIGHUP` on Unix;
//! Ctrl-C on Windows) that trigger [`ShutdownCoordinator::initiate_shutdown`].
//! A pipeline run in progress observes this through the
//! [`dataflow_engine::Context`]'s own `cancel_token`, which
//! `install_signal_handlers` cancels alongside the coordinator's token.

use dataflow_engine::Context;
use std::sync::Arc;

use crate::shutdown::ShutdownCoordinator;

/// Spawns a background task that waits for a termination signal and then
/// cancels both `coordinator` and `ctx`'s tokens. Returns immediately; the
/// spawned task runs for the remainder of the process.
pub fn install_signal_handlers(coordinator: ShutdownCoordinator, ctx: Arc<Context>) {
    tokio::spawn(async move {
        wait_for_termination().await;
        tracing::info!("termination signal received, initiating shutdown");
        coordinator.initiate_shutdown();
        ctx.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_termination() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut sighup = signal(SignalKind::hangup()).expect("failed to install SIGHUP handler");

    tokio::select! {
        _ = sigterm.recv() => tracing::debug!("received SIGTERM"),
        _ = sigint.recv() => tracing::debug!("received SIGINT"),
        _ = sighup.recv() => tracing::debug!("received SIGHUP"),
    }
}

#[cfg(windows)]
async fn wait_for_termination() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::debug!("received Ctrl-C");
}
