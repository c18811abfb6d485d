//! Host HAL for the interactive shell.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use sos_hal::HAL;

/// HAL backed by the host clock and stderr.
pub struct StdHal {
    start: Instant,
    verbose: bool,
}

impl StdHal {
    /// Kernel debug output goes to stderr only when `verbose` is set.
    pub fn new(verbose: bool) -> Self {
        Self {
            start: Instant::now(),
            verbose,
        }
    }
}

impl HAL for StdHal {
    fn now_nanos(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    fn wallclock_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }

    fn debug_write(&self, msg: &str) {
        if self.verbose {
            eprintln!("{}", msg);
        }
    }
}
