//! Round-robin process scheduler
//!
//! The scheduler owns the ready queue and the "current" slot of the single
//! simulated CPU. It stores process IDs only; the descriptors live in the
//! kernel's process table and are passed in by the caller.

use alloc::collections::{BTreeMap, VecDeque};

use crate::error::KernelError;
use crate::memory::MemoryManager;
use crate::process::{Process, ProcessState};
use crate::types::ProcessId;

/// Process registry: every process ever created, tombstones included.
pub type ProcessTable = BTreeMap<ProcessId, Process>;

/// Ready queue plus the current CPU holder.
#[derive(Clone, Debug, Default)]
pub struct ProcessScheduler {
    /// READY processes in arrival order
    ready: VecDeque<ProcessId>,
    /// Process picked for (or holding) the CPU
    current: Option<ProcessId>,
    /// Number of READY -> RUNNING dispatches
    context_switches: u64,
}

impl ProcessScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the ready-queue tail.
    pub fn enqueue(&mut self, pid: ProcessId) {
        self.ready.push_back(pid);
    }

    /// Remove the ready-queue head and make it current.
    ///
    /// Returns `None` if the queue is empty or the CPU is already held.
    pub fn pick_next(&mut self) -> Option<ProcessId> {
        if self.current.is_some() {
            return None;
        }
        let pid = self.ready.pop_front()?;
        self.current = Some(pid);
        Some(pid)
    }

    /// Move the picked process READY -> RUNNING.
    ///
    /// Running an already running process is a no-op.
    pub fn run_current(&mut self, table: &mut ProcessTable) -> Result<Option<ProcessId>, KernelError> {
        let Some(pid) = self.current else {
            return Ok(None);
        };
        let process = lookup(table, pid)?;
        if process.state() != ProcessState::Running {
            process.dispatch()?;
            self.context_switches += 1;
        }
        Ok(Some(pid))
    }

    /// RUNNING -> READY, back to the tail of the queue.
    pub fn yield_current(&mut self, table: &mut ProcessTable) -> Result<Option<ProcessId>, KernelError> {
        let Some(pid) = self.current else {
            return Ok(None);
        };
        lookup(table, pid)?.preempt()?;
        self.current = None;
        self.ready.push_back(pid);
        Ok(Some(pid))
    }

    /// RUNNING -> WAITING. The process leaves the CPU but is not queued.
    pub fn block_current(&mut self, table: &mut ProcessTable) -> Result<Option<ProcessId>, KernelError> {
        let Some(pid) = self.current else {
            return Ok(None);
        };
        lookup(table, pid)?.block()?;
        self.current = None;
        Ok(Some(pid))
    }

    /// WAITING -> READY, queued at the tail.
    pub fn wake(&mut self, table: &mut ProcessTable, pid: ProcessId) -> Result<(), KernelError> {
        lookup(table, pid)?.wake()?;
        self.ready.push_back(pid);
        Ok(())
    }

    /// RUNNING -> TERMINATED, releasing the process's block.
    ///
    /// The caller raises `ProcessTerminated` for the returned pid.
    pub fn terminate_current(
        &mut self,
        table: &mut ProcessTable,
        memory: &mut MemoryManager,
    ) -> Result<Option<ProcessId>, KernelError> {
        let Some(pid) = self.current else {
            return Ok(None);
        };
        retire(lookup(table, pid)?, memory)?;
        self.current = None;
        Ok(Some(pid))
    }

    /// Forget a pid (queued or current), e.g. after an external kill.
    pub fn remove(&mut self, pid: ProcessId) {
        self.ready.retain(|&p| p != pid);
        if self.current == Some(pid) {
            self.current = None;
        }
    }

    /// Process picked for or holding the CPU
    pub fn current(&self) -> Option<ProcessId> {
        self.current
    }

    /// Ready queue in dispatch order
    pub fn ready_queue(&self) -> impl Iterator<Item = ProcessId> + '_ {
        self.ready.iter().copied()
    }

    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    pub fn is_idle(&self) -> bool {
        self.current.is_none() && self.ready.is_empty()
    }

    pub fn context_switches(&self) -> u64 {
        self.context_switches
    }
}

/// Terminate a live process and release its memory.
///
/// The transition is validated before the block is freed, and the block is
/// freed before the state changes, so a failure leaves both untouched.
pub(crate) fn retire(process: &mut Process, memory: &mut MemoryManager) -> Result<(), KernelError> {
    process.check_transition(ProcessState::Terminated)?;
    if let Some(block) = process.memory_block() {
        memory.free(&block)?;
    }
    process.terminate()?;
    Ok(())
}

fn lookup(table: &mut ProcessTable, pid: ProcessId) -> Result<&mut Process, KernelError> {
    table.get_mut(&pid).ok_or(KernelError::NotFound(pid))
}
