//! Mock HAL implementation for testing SimpleOS
//!
//! Provides simulated time and captures every debug line so tests can
//! assert on what the kernel logged without a real host.

#![no_std]
extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use sos_hal::HAL;

/// Mock HAL for unit testing
pub struct MockHal {
    /// Simulated time in nanoseconds
    time: Cell<u64>,
    /// Nanoseconds added to the clock on every `now_nanos` call
    auto_advance: Cell<u64>,
    /// Simulated wall clock (ms since epoch)
    wallclock: Cell<u64>,
    /// Captured debug messages
    debug_log: RefCell<Vec<String>>,
}

impl MockHal {
    /// Create a new mock HAL
    pub fn new() -> Self {
        Self::with_time(0)
    }

    /// Create a mock HAL with a specific starting time
    pub fn with_time(nanos: u64) -> Self {
        Self {
            time: Cell::new(nanos),
            auto_advance: Cell::new(0),
            wallclock: Cell::new(1737504000000),
            debug_log: RefCell::new(Vec::new()),
        }
    }

    /// Advance the simulated time by the given duration
    pub fn advance_time(&self, nanos: u64) {
        self.time.set(self.time.get() + nanos);
    }

    /// Set the simulated time to a specific value
    pub fn set_time(&self, nanos: u64) {
        self.time.set(nanos);
    }

    /// Set the simulated wall clock (ms since epoch)
    pub fn set_wallclock(&self, ms: u64) {
        self.wallclock.set(ms);
    }

    /// Make every clock read advance time by `nanos`
    pub fn set_auto_advance(&self, nanos: u64) {
        self.auto_advance.set(nanos);
    }

    /// Get all captured debug messages
    pub fn get_debug_log(&self) -> Vec<String> {
        self.debug_log.borrow().clone()
    }

    /// Clear the debug log
    pub fn clear_debug_log(&self) {
        self.debug_log.borrow_mut().clear();
    }

    /// Check if a specific message was logged
    pub fn has_log_containing(&self, substr: &str) -> bool {
        self.debug_log
            .borrow()
            .iter()
            .any(|msg| msg.contains(substr))
    }

    /// Count logged lines containing `substr`
    pub fn count_log_containing(&self, substr: &str) -> usize {
        self.debug_log
            .borrow()
            .iter()
            .filter(|msg| msg.contains(substr))
            .count()
    }

    /// Get the number of debug messages
    pub fn debug_log_count(&self) -> usize {
        self.debug_log.borrow().len()
    }
}

impl Default for MockHal {
    fn default() -> Self {
        Self::new()
    }
}

impl HAL for MockHal {
    fn now_nanos(&self) -> u64 {
        let now = self.time.get();
        self.time.set(now + self.auto_advance.get());
        now
    }

    fn wallclock_ms(&self) -> u64 {
        self.wallclock.get()
    }

    fn debug_write(&self, msg: &str) {
        self.debug_log.borrow_mut().push(String::from(msg));
    }
}
