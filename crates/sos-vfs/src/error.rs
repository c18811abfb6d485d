//! Error types for the file system layer.

use alloc::string::String;
use core::fmt;
use serde::{Deserialize, Serialize};
use sos_kernel::KernelError;

/// Errors from file system operations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FsError {
    /// No file with this name
    NotFound(String),

    /// A file with this name already exists
    DuplicateName(String),

    /// Empty name, or one containing `/` or control characters
    InvalidName(String),

    /// Content does not fit in the requested file size
    FileTooLarge {
        /// Content length in bytes
        size: usize,
        /// Requested file size
        capacity: usize,
    },

    /// The kernel refused the underlying process or memory operation
    Kernel(KernelError),
}

impl FsError {
    /// Check if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound(_))
    }

    /// Check if the kernel ran out of memory for the file.
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, FsError::Kernel(KernelError::OutOfMemory { .. }))
    }
}

impl From<KernelError> for FsError {
    fn from(e: KernelError) -> Self {
        FsError::Kernel(e)
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsError::NotFound(name) => write!(f, "File '{}' not found", name),
            FsError::DuplicateName(name) => write!(f, "File '{}' already exists", name),
            FsError::InvalidName(name) => write!(f, "Invalid file name '{}'", name),
            FsError::FileTooLarge { size, capacity } => write!(
                f,
                "Content of {} bytes does not fit in a file of {} bytes",
                size, capacity
            ),
            FsError::Kernel(e) => write!(f, "{}", e),
        }
    }
}
