//! SimpleOS Kernel Core - Pure State Machine
//!
//! This crate contains the **pure, HAL-free** kernel simulation: memory
//! allocation, interrupt dispatch, process lifecycle and scheduling.
//!
//! # Design Principles
//!
//! 1. **No HAL dependency**: logging and time live in `sos-kernel`
//! 2. **No I/O or side effects**: state steps return the interrupts to raise
//! 3. **Deterministic**: same input always produces same output
//! 4. **Checkable**: every invariant is an executable function
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    sos-kernel-core                          │
//! │                                                             │
//! │   ┌──────────────────────────────┐  ┌────────────────────┐  │
//! │   │         KernelState          │  │InterruptController │  │
//! │   │  - MemoryManager (first-fit) │◀─│  FIFO queue        │  │
//! │   │  - ProcessScheduler (RR)     │  │  type → handler    │  │
//! │   │  - ProcessTable (tombstones) │  └────────────────────┘  │
//! │   └──────────────────────────────┘                          │
//! │                  │                                          │
//! │                  ▼ StepResult { result, interrupts }        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ used by
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      sos-kernel                             │
//! │   - raises returned interrupts, ticks the scheduler         │
//! │   - HAL debug output, SysLog audit trail                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Module Organization
//!
//! - `types` - ProcessId, MemoryBlock, MemoryStatus
//! - `error` - KernelError
//! - `memory` - MemoryManager
//! - `interrupt` - Interrupt, InterruptController
//! - `process` - Process, ProcessState transition table
//! - `scheduler` - ProcessScheduler, ProcessTable
//! - `state` - KernelState and StepResult
//! - `handlers` - default interrupt handlers
//! - `invariants` - invariant assertions

#![no_std]
extern crate alloc;

pub mod error;
pub mod handlers;
pub mod interrupt;
pub mod invariants;
pub mod memory;
pub mod process;
pub mod scheduler;
pub mod state;
pub mod types;

// Re-export all public types for convenient access
pub use error::KernelError;
pub use handlers::default_handlers;
pub use interrupt::{
    DispatchReport, Interrupt, InterruptController, InterruptEvent, InterruptHandler,
    InterruptStats, InterruptType,
};
pub use invariants::{check_all_invariants, InvariantViolation};
pub use memory::{FreeGaps, MemoryManager};
pub use process::{Process, ProcessState};
pub use scheduler::{ProcessScheduler, ProcessTable};
pub use state::{KernelState, StepResult};
pub use types::{FreeGap, MemoryBlock, MemoryStatus, Priority, ProcessId, SequenceNumber};
