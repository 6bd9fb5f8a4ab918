// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Shutdown Coordination
//!
//! Manages graceful shutdown across application components.
//!
//! ## Design Pattern
//!
//! The shutdown coordinator provides:
//! - **Cancellation tokens** for propagating shutdown signals
//! - **Run tracking** - `wait_for_shutdown` blocks until every
//!   [`RunGuard`] handed out by [`ShutdownCoordinator::track_run`] has been
//!   dropped, not just until a caller says so
//! - **Grace period** with timeout enforcement
//! - **Atomic state** for shutdown tracking
//!
//! A signal handler only knows *that* the process should stop; it doesn't
//! know whether a pipeline run is still draining its sink. Tracking real
//! run guards instead of a single `complete_shutdown()` call keeps those
//! two concerns separate: `main.rs` registers a guard for the run it starts
//! and drops it once [`dataflow_engine::EngineHandle::shutdown`] returns, so
//! `wait_for_shutdown` reports done exactly when the work actually is.
//!
//! ## Usage
//!
//! ```rust
//! use dataflow_bootstrap::shutdown::ShutdownCoordinator;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
//!     let guard = coordinator.track_run();
//!     let token = coordinator.token();
//!
//!     tokio::spawn(async move {
//!         tokio::select! {
//!             _ = token.cancelled() => {
//!                 println!("worker shutting down gracefully");
//!             }
//!             _ = tokio::time::sleep(Duration::from_millis(10)) => {
//!                 println!("work finished");
//!             }
//!         }
//!         drop(guard);
//!     });
//!
//!     coordinator.initiate_shutdown();
//!     coordinator.wait_for_shutdown().await;
//! }
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Default grace period for graceful shutdown (in seconds)
pub const DEFAULT_GRACE_PERIOD_SECS: u64 = 5;

/// Cancellation token for signaling shutdown
///
/// Lightweight clone-able token that can be passed to async tasks.
#[derive(Clone)]
pub struct CancellationToken {
    /// Shared cancellation flag
    cancelled: Arc<AtomicBool>,
    /// Notification for waiters
    notify: Arc<Notify>,
}

impl CancellationToken {
    /// Create a new cancellation token
    fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Cancel this token
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Check if cancelled (non-blocking)
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Wait for cancellation (async)
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.notify.notified().await;
    }
}

/// RAII handle for one unit of in-flight work (typically one pipeline run).
///
/// Dropping the guard decrements the coordinator's outstanding-run count;
/// once it reaches zero, any task blocked in
/// [`ShutdownCoordinator::wait_for_shutdown`] is woken.
pub struct RunGuard {
    active_runs: Arc<AtomicUsize>,
    drained: Arc<Notify>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if self.active_runs.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_waiters();
        }
    }
}

/// Shutdown coordinator
///
/// Manages graceful shutdown with grace period and timeout enforcement.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    /// Cancellation token for shutdown signal
    token: CancellationToken,

    /// Grace period before forced shutdown
    grace_period: Duration,

    /// Shutdown initiated flag
    shutdown_initiated: Arc<AtomicBool>,

    /// Number of [`RunGuard`]s currently outstanding
    active_runs: Arc<AtomicUsize>,

    /// Notified whenever `active_runs` drops to zero
    drained: Arc<Notify>,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator
    ///
    /// # Arguments
    ///
    /// * `grace_period` - Maximum time to wait for tracked runs to drain
    pub fn new(grace_period: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            grace_period,
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
            active_runs: Arc::new(AtomicUsize::new(0)),
            drained: Arc::new(Notify::new()),
        }
    }

    /// Get a cancellation token
    ///
    /// Tokens can be cloned and passed to async tasks for shutdown signaling.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Check if shutdown has been initiated
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_initiated.load(Ordering::SeqCst)
    }

    /// Register one unit of in-flight work with the coordinator.
    ///
    /// [`Self::wait_for_shutdown`] will not report completion while any
    /// guard returned from this method is still alive.
    pub fn track_run(&self) -> RunGuard {
        self.active_runs.fetch_add(1, Ordering::SeqCst);
        RunGuard {
            active_runs: self.active_runs.clone(),
            drained: self.drained.clone(),
        }
    }

    /// Initiate graceful shutdown
    ///
    /// This will:
    /// 1. Set shutdown initiated flag
    /// 2. Cancel the shared cancellation token
    pub fn initiate_shutdown(&self) {
        if self
            .shutdown_initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            tracing::info!("initiating graceful shutdown (grace period: {:?})", self.grace_period);
            self.token.cancel();
        }
    }

    /// Wait until every tracked run has finished or the grace period elapses.
    ///
    /// Returns `true` if all tracked runs drained within the grace period,
    /// `false` if the grace period expired first.
    pub async fn wait_for_shutdown(&self) -> bool {
        if !self.is_shutting_down() {
            tracing::warn!("wait_for_shutdown called but shutdown not initiated");
            return true;
        }

        tokio::select! {
            _ = self.wait_for_drain() => {
                tracing::info!("all tracked runs drained, shutdown complete");
                true
            }
            _ = tokio::time::sleep(self.grace_period) => {
                tracing::warn!("shutdown grace period expired with runs still outstanding, forcing exit");
                false
            }
        }
    }

    /// Wait for every tracked run to drain, with a caller-supplied timeout
    /// instead of the coordinator's configured grace period.
    pub async fn wait_with_timeout(&self, timeout: Duration) -> bool {
        if !self.is_shutting_down() {
            return true;
        }

        tokio::select! {
            _ = self.wait_for_drain() => true,
            _ = tokio::time::sleep(timeout) => false,
        }
    }

    async fn wait_for_drain(&self) {
        loop {
            if self.active_runs.load(Ordering::SeqCst) == 0 {
                return;
            }
            self.drained.notified().await;
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_GRACE_PERIOD_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_token_create() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_cancellation_token_cancel() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_cancellation_token_clone() {
        let token1 = CancellationToken::new();
        let token2 = token1.clone();

        token1.cancel();
        assert!(token2.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancellation_token_cancelled_already() {
        let token = CancellationToken::new();
        token.cancel();

        // Should return immediately
        token.cancelled().await;
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancellation_token_cancelled_wait() {
        let token = CancellationToken::new();
        let token_clone = token.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token_clone.cancel();
        });

        token.cancelled().await;
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_shutdown_coordinator_create() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
        assert!(!coordinator.is_shutting_down());
    }

    #[test]
    fn test_shutdown_coordinator_default() {
        let coordinator = ShutdownCoordinator::default();
        assert!(!coordinator.is_shutting_down());
    }

    #[test]
    fn test_shutdown_coordinator_initiate() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
        coordinator.initiate_shutdown();
        assert!(coordinator.is_shutting_down());
        assert!(coordinator.token().is_cancelled());
    }

    #[test]
    fn test_shutdown_coordinator_token() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
        let token = coordinator.token();

        assert!(!token.is_cancelled());

        coordinator.initiate_shutdown();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_wait_for_shutdown_with_no_tracked_runs_returns_immediately() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
        coordinator.initiate_shutdown();

        let result = tokio::time::timeout(Duration::from_millis(200), coordinator.wait_for_shutdown()).await;
        assert!(result.is_ok());
        assert!(result.unwrap());
    }

    #[tokio::test]
    async fn test_wait_for_shutdown_blocks_until_guard_drops() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
        let guard = coordinator.track_run();
        coordinator.initiate_shutdown();

        let coordinator_clone = coordinator.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            drop(guard);
            let _ = &coordinator_clone;
        });

        let result = tokio::time::timeout(Duration::from_millis(500), coordinator.wait_for_shutdown()).await;
        assert!(result.is_ok());
        assert!(result.unwrap());
    }

    #[tokio::test]
    async fn test_wait_for_shutdown_times_out_with_run_still_outstanding() {
        let coordinator = ShutdownCoordinator::new(Duration::from_millis(50));
        let _guard = coordinator.track_run();
        coordinator.initiate_shutdown();

        let result = coordinator.wait_for_shutdown().await;
        assert!(!result); // Timed out, guard never dropped
    }

    #[tokio::test]
    async fn test_multiple_tracked_runs_all_must_drain() {
        let coordinator = ShutdownCoordinator::new(Duration::from_millis(200));
        let guard_a = coordinator.track_run();
        let guard_b = coordinator.track_run();
        coordinator.initiate_shutdown();

        drop(guard_a);
        // guard_b still outstanding, so this should time out.
        let still_waiting = coordinator.wait_with_timeout(Duration::from_millis(20)).await;
        assert!(!still_waiting);

        drop(guard_b);
        let result = coordinator.wait_with_timeout(Duration::from_millis(200)).await;
        assert!(result);
    }

    #[tokio::test]
    async fn test_shutdown_coordinator_wait_custom_timeout() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(10));
        let _guard = coordinator.track_run();

        coordinator.initiate_shutdown();

        // Use shorter custom timeout; guard never dropped, so this times out.
        let result = coordinator.wait_with_timeout(Duration::from_millis(50)).await;
        assert!(!result);
    }
}
