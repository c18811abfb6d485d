//! Host Abstraction Layer trait for SimpleOS
//!
//! The simulated kernel never talks to the host directly. Everything it
//! needs from the outside world goes through the [`HAL`] trait:
//!
//! - **Time**: a monotonic clock used to stamp processes and audit events
//! - **Debug output**: the sink for kernel log lines
//!
//! # Implementations
//!
//! - `StdHal` in `sos-shell`: `std::time::Instant` + stderr
//! - `MockHal` in `sos-hal-mock`: simulated time + captured log for tests

#![no_std]

/// Host Abstraction Layer trait
///
/// Implementations are owned by the kernel for its whole lifetime. The
/// simulator is single-threaded, so no `Send`/`Sync` bound is required.
pub trait HAL: 'static {
    // === Time ===

    /// Get current time in nanoseconds (monotonic)
    fn now_nanos(&self) -> u64;

    /// Get wall-clock time in milliseconds since Unix epoch
    ///
    /// Hosts without a calendar clock may return 0.
    fn wallclock_ms(&self) -> u64 {
        0
    }

    // === Debug ===

    /// Write a debug message to the host's console/log
    fn debug_write(&self, msg: &str);
}
