// /////////////////////////////////////////////////////////////////////////////
// dataflow-engine
// Copyright (c) 2026 the dataflow-engine contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Platform Abstraction Module
//!
//! This module provides the handful of OS facts the demo binary needs
//! before it can size and run a pipeline.
//!
//! ## Architecture Pattern
//!
//! - **Interface**: `Platform` trait defines the contract
//! - **Implementations**:
//!   - `UnixPlatform`: POSIX implementation (Linux + macOS)
//!   - `WindowsPlatform`: Windows API implementation
//! - **Selection**: Compile-time platform selection via `#[cfg]`
//!
//! ## Usage
//!
//! ```rust
//! use dataflow_bootstrap::platform::create_platform;
//!
//! let platform = create_platform();
//! println!("Running on: {}", platform.platform_name());
//! println!("CPU cores: {}", platform.cpu_count());
//! ```

#[cfg(unix)]
mod unix;

#[cfg(windows)]
mod windows;

// Re-export implementations
#[cfg(unix)]
pub use unix::UnixPlatform;

#[cfg(windows)]
pub use windows::WindowsPlatform;

/// Platform abstraction trait for OS-specific operations.
///
/// Keeps the demo binary free of `#[cfg]` blocks: it asks the trait for
/// what it needs and the compile-time-selected implementation supplies it.
pub trait Platform: Send + Sync {
    /// Number of logical processors available to the process. Used as the
    /// default stage parallelism when `--cpu-threads` isn't given.
    fn cpu_count(&self) -> usize;

    /// Platform identifier: "linux", "macos", "windows".
    fn platform_name(&self) -> &'static str;

    /// Whether the process is running with elevated privileges (root on
    /// Unix, Administrator on Windows). Surfaced as a startup warning since
    /// the demo binary has no reason to run elevated.
    fn is_elevated(&self) -> bool;
}

// === Platform Selection ===

#[cfg(unix)]
type PlatformImpl = UnixPlatform;

#[cfg(windows)]
type PlatformImpl = WindowsPlatform;

/// Create the platform-specific implementation
///
/// This function returns the appropriate platform implementation
/// for the current operating system, selected at compile time.
///
/// # Returns
/// Boxed platform implementation
///
/// # Examples
///
/// ```rust
/// use dataflow_bootstrap::platform::create_platform;
///
/// let platform = create_platform();
/// println!("Running on: {}", platform.platform_name());
/// ```
pub fn create_platform() -> Box<dyn Platform> {
    Box::new(PlatformImpl::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_platform() {
        let platform = create_platform();

        assert!(platform.cpu_count() >= 1);
        assert!(!platform.platform_name().is_empty());
    }

    #[test]
    fn test_is_elevated_does_not_panic() {
        // Whichever way it goes on the CI runner, the call must not panic.
        let _ = create_platform().is_elevated();
    }
}
