//! Kernel state - pure data structure holding all kernel state
//!
//! `KernelState` bundles the memory manager, scheduler and process table.
//! It has NO HAL dependency and never raises interrupts itself: every
//! mutating operation returns a [`StepResult`] carrying the interrupts the
//! runtime wrapper (`sos-kernel`) must raise.
//!
//! The interrupt controller is deliberately not part of this struct. It
//! dispatches handlers with `&mut KernelState` as their context.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use crate::error::KernelError;
use crate::interrupt::Interrupt;
use crate::memory::MemoryManager;
use crate::process::{Process, ProcessState};
use crate::scheduler::{retire, ProcessScheduler, ProcessTable};
use crate::types::{MemoryStatus, Priority, ProcessId};

/// Result of a state step: the outcome plus interrupts to raise.
///
/// Interrupts are returned for failures too (e.g. `MemoryFull` with
/// `OutOfMemory`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepResult<T> {
    pub result: Result<T, KernelError>,
    pub interrupts: Vec<Interrupt>,
}

impl<T> StepResult<T> {
    pub fn ok(value: T) -> Self {
        Self {
            result: Ok(value),
            interrupts: Vec::new(),
        }
    }

    pub fn err(error: KernelError) -> Self {
        Self {
            result: Err(error),
            interrupts: Vec::new(),
        }
    }

    /// Attach an interrupt to raise
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupts.push(interrupt);
        self
    }
}

impl<T> From<Result<T, KernelError>> for StepResult<T> {
    fn from(result: Result<T, KernelError>) -> Self {
        Self {
            result,
            interrupts: Vec::new(),
        }
    }
}

/// The pure kernel state - no HAL, no I/O, no side effects.
pub struct KernelState {
    /// Simulated address space
    pub memory: MemoryManager,
    /// Ready queue and CPU slot
    pub scheduler: ProcessScheduler,
    /// Process table (tombstones included)
    pub processes: ProcessTable,
    /// Next process ID to allocate
    pub next_pid: u64,
}

impl KernelState {
    /// Create a kernel state over an address space of `memory_size` units.
    pub fn new(memory_size: usize) -> Self {
        Self {
            memory: MemoryManager::new(memory_size),
            scheduler: ProcessScheduler::new(),
            processes: ProcessTable::new(),
            next_pid: 1,
        }
    }

    /// Generate next process ID
    fn alloc_pid(&mut self) -> ProcessId {
        let pid = ProcessId(self.next_pid);
        self.next_pid += 1;
        pid
    }

    // ========================================================================
    // Read-only accessors
    // ========================================================================

    /// Get process info (tombstones included)
    pub fn get_process(&self, pid: ProcessId) -> Option<&Process> {
        self.processes.get(&pid)
    }

    /// Get a process that has not terminated
    pub fn live_process(&self, pid: ProcessId) -> Result<&Process, KernelError> {
        self.processes
            .get(&pid)
            .filter(|p| !p.state().is_terminated())
            .ok_or(KernelError::NotFound(pid))
    }

    /// Processes that have not terminated, in pid order
    pub fn live_processes(&self) -> impl Iterator<Item = &Process> {
        self.processes
            .values()
            .filter(|p| !p.state().is_terminated())
    }

    /// The process currently in the RUNNING state
    pub fn running(&self) -> Option<ProcessId> {
        self.scheduler
            .current()
            .filter(|pid| self.state_of(*pid) == Some(ProcessState::Running))
    }

    pub fn state_of(&self, pid: ProcessId) -> Option<ProcessState> {
        self.processes.get(&pid).map(|p| p.state())
    }

    pub fn memory_status(&self) -> MemoryStatus {
        self.memory.status()
    }

    // ========================================================================
    // State mutations
    // ========================================================================

    /// Allocate memory, register a process, admit it and queue it.
    ///
    /// Memory is secured before anything is registered, so a failed
    /// allocation leaves no process behind and does not consume a pid.
    pub fn create_process(
        &mut self,
        name: &str,
        requested_memory: usize,
        priority: Priority,
        timestamp: u64,
    ) -> StepResult<ProcessId> {
        let owner = ProcessId(self.next_pid);
        let block = match self.memory.allocate(requested_memory, owner) {
            Ok(block) => block,
            Err(e @ KernelError::OutOfMemory {
                requested,
                largest_free,
            }) => {
                return StepResult::err(e).with_interrupt(Interrupt::MemoryFull {
                    requested,
                    largest_free,
                })
            }
            Err(e) => return StepResult::err(e),
        };

        let pid = self.alloc_pid();
        let mut process = Process::new(pid, String::from(name), priority, timestamp);
        if let Err(e) = process.admit(block) {
            // Roll back so the address space matches the registry
            return StepResult::err(match self.memory.free(&block) {
                Ok(()) => e,
                Err(free_err) => free_err,
            });
        }

        self.processes.insert(pid, process);
        self.scheduler.enqueue(pid);

        StepResult::ok(pid).with_interrupt(Interrupt::ProcessCreated { pid })
    }

    /// Terminate a process from any live state and release its memory.
    pub fn terminate_process(&mut self, pid: ProcessId) -> StepResult<()> {
        let process = match self.processes.get_mut(&pid) {
            Some(p) if !p.state().is_terminated() => p,
            _ => return StepResult::err(KernelError::NotFound(pid)),
        };

        if let Err(e) = retire(process, &mut self.memory) {
            return StepResult::err(e);
        }
        self.scheduler.remove(pid);

        StepResult::ok(()).with_interrupt(Interrupt::ProcessTerminated { pid })
    }

    /// Terminate whichever process holds the CPU.
    pub fn terminate_current(&mut self) -> StepResult<Option<ProcessId>> {
        match self
            .scheduler
            .terminate_current(&mut self.processes, &mut self.memory)
        {
            Ok(Some(pid)) => {
                StepResult::ok(Some(pid)).with_interrupt(Interrupt::ProcessTerminated { pid })
            }
            other => other.into(),
        }
    }

    /// Rename a live process.
    pub fn rename_process(&mut self, pid: ProcessId, name: &str) -> Result<(), KernelError> {
        match self.processes.get_mut(&pid) {
            Some(process) => process.rename(name),
            None => Err(KernelError::NotFound(pid)),
        }
    }

    /// Pick the ready-queue head and run it.
    pub fn schedule(&mut self) -> Result<Option<ProcessId>, KernelError> {
        self.scheduler.pick_next();
        self.scheduler.run_current(&mut self.processes)
    }

    /// Running process back to the ready-queue tail.
    pub fn yield_current(&mut self) -> Result<Option<ProcessId>, KernelError> {
        self.scheduler.yield_current(&mut self.processes)
    }

    /// Running process to WAITING.
    pub fn block_current(&mut self) -> Result<Option<ProcessId>, KernelError> {
        self.scheduler.block_current(&mut self.processes)
    }

    /// WAITING process back to the ready queue.
    pub fn wake(&mut self, pid: ProcessId) -> Result<(), KernelError> {
        self.live_process(pid)?;
        self.scheduler.wake(&mut self.processes, pid)
    }

    /// Overwrite the start of a live process's block.
    pub fn write_memory(&mut self, pid: ProcessId, data: &[u8]) -> Result<(), KernelError> {
        let block = self
            .live_process(pid)?
            .memory_block()
            .ok_or(KernelError::InvalidBlock)?;
        self.memory.write(&block, data)
    }

    /// Read the first `len` units of a live process's block.
    pub fn read_memory(&self, pid: ProcessId, len: usize) -> Result<&[u8], KernelError> {
        let block = self
            .live_process(pid)?
            .memory_block()
            .ok_or(KernelError::InvalidBlock)?;
        self.memory.read(&block, len)
    }

    /// Terminate every live process. Returns the interrupts to raise.
    pub fn terminate_all(&mut self) -> Vec<Interrupt> {
        let live: Vec<ProcessId> = self.live_processes().map(|p| p.pid()).collect();
        let mut interrupts = vec![];
        for pid in live {
            interrupts.extend(self.terminate_process(pid).interrupts);
        }
        interrupts
    }
}
