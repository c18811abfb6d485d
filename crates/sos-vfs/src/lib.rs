//! SimpleOS File System
//!
//! A flat directory of named files, built as a client of the kernel:
//!
//! - **FileSystem**: create / read / remove / rename / list over [`Kernel`]
//! - **Snapshot**: serde image of the directory (JSON)
//! - **Bootstrap**: restore a directory from a snapshot at startup
//!
//! # Design Principles
//!
//! 1. **Files are processes**: every file owns a kernel process whose memory
//!    block stores the file's bytes
//! 2. **Kernel-accounted**: file memory shows up in the kernel's memory
//!    status and is freed by terminating the process
//! 3. **No host I/O**: snapshots are values; reading and writing them is the
//!    shell's job
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 FileSystem                   │
//! │   directory: name → (pid, len, capacity)     │
//! └──────────────────────┬───────────────────────┘
//!                        │ create_process / terminate_process
//!                        │ write/read_process_memory
//!                        ▼
//! ┌──────────────────────────────────────────────┐
//! │                 Kernel<H>                    │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! [`Kernel`]: sos_kernel::Kernel

#![no_std]
extern crate alloc;

pub mod bootstrap;
pub mod error;
pub mod fs;
pub mod snapshot;

pub use bootstrap::{bootstrap, BootstrapReport};
pub use error::FsError;
pub use fs::{validate_name, DirEntry, FileInfo, FileSystem, Names, FILE_PRIORITY, FILE_PROCESS_PREFIX};
pub use snapshot::{Snapshot, SnapshotEntry, SEED_FILE_CONTENT, SEED_FILE_NAME};
