//! Kernel error types

use core::fmt;
use serde::{Deserialize, Serialize};

use crate::process::ProcessState;
use crate::types::ProcessId;

/// Errors reported by kernel operations.
///
/// Every error is returned synchronously from the call that detected it.
/// Interrupts raised alongside an error (e.g. `MemoryFull`) are
/// notifications only; the error is the authoritative outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KernelError {
    /// No single free gap can hold the request
    OutOfMemory {
        /// Requested size
        requested: usize,
        /// Largest gap available at the time of the request
        largest_free: usize,
    },
    /// Block is not currently allocated, or an access falls outside it
    InvalidBlock,
    /// Zero-sized allocation, or a write larger than its block
    InvalidSize,
    /// Unknown or already terminated process
    NotFound(ProcessId),
    /// Transition not in the process state table
    InvalidTransition {
        pid: ProcessId,
        from: ProcessState,
        to: ProcessState,
    },
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::OutOfMemory {
                requested,
                largest_free,
            } => write!(
                f,
                "Out of memory: requested {} bytes, largest free gap is {} bytes",
                requested, largest_free
            ),
            KernelError::InvalidBlock => write!(f, "Invalid memory block"),
            KernelError::InvalidSize => write!(f, "Invalid allocation size"),
            KernelError::NotFound(pid) => write!(f, "Process {} not found", pid),
            KernelError::InvalidTransition { pid, from, to } => {
                write!(f, "Process {}: invalid transition {} -> {}", pid, from, to)
            }
        }
    }
}
