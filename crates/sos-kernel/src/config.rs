//! Kernel configuration

use serde::{Deserialize, Serialize};

/// Size of the simulated address space when none is configured
pub const DEFAULT_MEMORY_SIZE: usize = 1024;

/// Boot-time kernel configuration.
///
/// Missing fields fall back to their defaults when deserialized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Size of the simulated address space
    pub memory_size: usize,
    /// Install the default interrupt handler table at boot
    pub default_handlers: bool,
    /// Maximum number of SysLog events kept in memory
    pub syslog_capacity: usize,
}

impl KernelConfig {
    /// Default configuration with a specific address space size
    pub fn with_memory(memory_size: usize) -> Self {
        Self {
            memory_size,
            ..Self::default()
        }
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            memory_size: DEFAULT_MEMORY_SIZE,
            default_handlers: true,
            syslog_capacity: 10000,
        }
    }
}
