//! SimpleOS Kernel
//!
//! `Kernel<H>` is the runtime around the pure [`KernelState`]:
//! - every operation is recorded in the [`SysLog`] (request + response)
//! - interrupts returned by state steps are raised on the controller
//! - progress is logged through `HAL::debug_write`
//! - `tick()` advances the simulation one scheduling step
//!
//! All calls flow: `caller → Kernel (log request) → KernelState (execute)
//! → Kernel (raise interrupts, log response) → caller`

#![no_std]
extern crate alloc;

mod config;
mod syslog;

use alloc::format;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};
use sos_hal::HAL;

pub use config::{KernelConfig, DEFAULT_MEMORY_SIZE};
pub use syslog::{EventId, Operation, SysEvent, SysEventType, SysLog};

// Re-export core types
pub use sos_kernel_core::{
    check_all_invariants, default_handlers, DispatchReport, Interrupt, InterruptController,
    InterruptEvent, InterruptHandler, InterruptStats, InterruptType, InvariantViolation, KernelError,
    KernelState, MemoryBlock, MemoryStatus, Priority, Process, ProcessId, ProcessState,
    SequenceNumber, StepResult,
};

/// Upper bound on dispatch passes while draining the queue at shutdown
const MAX_SHUTDOWN_PASSES: usize = 16;

/// What one `tick()` did
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// Tick number, starting at 1
    pub tick: u64,
    /// Interrupt dispatch pass run at the start of the tick
    pub interrupts: DispatchReport,
    /// Process moved from RUNNING back to the ready queue
    pub yielded: Option<ProcessId>,
    /// Process holding the CPU after the tick
    pub running: Option<ProcessId>,
}

/// Kernel runtime: pure state + interrupt controller + audit log + HAL.
pub struct Kernel<H: HAL> {
    hal: H,
    state: KernelState,
    interrupts: InterruptController<KernelState>,
    syslog: SysLog,
    boot_time: u64,
    boot_wallclock_ms: u64,
    ticks: u64,
}

impl<H: HAL> Kernel<H> {
    /// Boot a kernel with the given HAL and configuration.
    pub fn new(hal: H, config: KernelConfig) -> Self {
        let boot_time = hal.now_nanos();
        let boot_wallclock_ms = hal.wallclock_ms();
        let mut interrupts = InterruptController::new();
        if config.default_handlers {
            for (ty, handler) in default_handlers() {
                interrupts.register_handler(ty, handler);
            }
        }

        hal.debug_write(&format!(
            "[kernel] boot at {} ms: {} units of memory, default handlers {}",
            boot_wallclock_ms,
            config.memory_size,
            if config.default_handlers { "on" } else { "off" }
        ));

        Self {
            hal,
            state: KernelState::new(config.memory_size),
            interrupts,
            syslog: SysLog::with_capacity(config.syslog_capacity),
            boot_time,
            boot_wallclock_ms,
            ticks: 0,
        }
    }

    pub fn hal(&self) -> &H {
        &self.hal
    }

    /// Get uptime in nanoseconds.
    pub fn uptime_nanos(&self) -> u64 {
        self.hal.now_nanos().saturating_sub(self.boot_time)
    }

    /// Host wall-clock time at boot (ms since Unix epoch, 0 if unknown)
    pub fn boot_wallclock_ms(&self) -> u64 {
        self.boot_wallclock_ms
    }

    /// Read-only view of the pure state
    pub fn state(&self) -> &KernelState {
        &self.state
    }

    // ========================================================================
    // Process lifecycle
    // ========================================================================

    /// Allocate memory and start a process in the ready queue.
    ///
    /// On `OutOfMemory` nothing is registered and `MemoryFull` is raised.
    pub fn create_process(
        &mut self,
        name: &str,
        requested_memory: usize,
        priority: Priority,
    ) -> Result<ProcessId, KernelError> {
        let op = Operation::CreateProcess {
            name: name.into(),
            memory: requested_memory,
            priority,
        };
        let result = self.execute(op, |state, now| {
            state.create_process(name, requested_memory, priority, now)
        });

        match &result {
            Ok(pid) => self.hal.debug_write(&format!(
                "[kernel] created process {} '{}' ({} units)",
                pid, name, requested_memory
            )),
            Err(e) => self
                .hal
                .debug_write(&format!("[kernel] create '{}' failed: {}", name, e)),
        }
        result
    }

    /// Terminate a live process and release its memory.
    pub fn terminate_process(&mut self, pid: ProcessId) -> Result<(), KernelError> {
        let result = self.execute(Operation::TerminateProcess { pid }, |state, _| {
            state.terminate_process(pid)
        });
        if result.is_ok() {
            self.hal
                .debug_write(&format!("[kernel] terminated process {}", pid));
        }
        result
    }

    /// Terminate whichever process holds the CPU.
    pub fn terminate_current(&mut self) -> Result<Option<ProcessId>, KernelError> {
        let result = self.execute(Operation::TerminateCurrent, |state, _| {
            state.terminate_current()
        });
        if let Ok(Some(pid)) = result {
            self.hal
                .debug_write(&format!("[kernel] terminated running process {}", pid));
        }
        result
    }

    /// Rename a live process.
    pub fn rename_process(&mut self, pid: ProcessId, name: &str) -> Result<(), KernelError> {
        let op = Operation::RenameProcess {
            pid,
            name: name.into(),
        };
        let result = self.execute(op, |state, _| {
            StepResult::from(state.rename_process(pid, name))
        });
        if result.is_ok() {
            self.hal
                .debug_write(&format!("[kernel] renamed process {} to '{}'", pid, name));
        }
        result
    }

    /// Move the running process to the ready-queue tail.
    pub fn yield_current(&mut self) -> Result<Option<ProcessId>, KernelError> {
        let result = self.execute(Operation::YieldCurrent, |state, _| {
            StepResult::from(state.yield_current())
        });
        if let Ok(Some(pid)) = result {
            self.hal.debug_write(&format!("[sched] {} yielded", pid));
        }
        result
    }

    /// Park the running process in WAITING until `wake`.
    pub fn wait_current(&mut self) -> Result<Option<ProcessId>, KernelError> {
        let result = self.execute(Operation::WaitCurrent, |state, _| {
            StepResult::from(state.block_current())
        });
        if let Ok(Some(pid)) = result {
            self.hal.debug_write(&format!("[sched] {} waiting", pid));
        }
        result
    }

    /// Return a WAITING process to the ready queue.
    pub fn wake(&mut self, pid: ProcessId) -> Result<(), KernelError> {
        let result = self.execute(Operation::Wake { pid }, |state, _| {
            StepResult::from(state.wake(pid))
        });
        if result.is_ok() {
            self.hal.debug_write(&format!("[sched] {} woken", pid));
        }
        result
    }

    /// Advance the simulation one step.
    ///
    /// Dispatches the interrupts pending at the start of the tick, moves
    /// the running process (if any) back to the queue, then runs the head
    /// of the ready queue.
    pub fn tick(&mut self) -> TickReport {
        self.ticks += 1;
        let timestamp = self.uptime_nanos();
        let req_id = self.syslog.log_request(Operation::Tick, timestamp);

        let interrupts = self.dispatch_interrupts();

        let mut error = None;
        let yielded = self.state.yield_current().unwrap_or_else(|e| {
            error = Some(e);
            None
        });
        let running = self.state.schedule().unwrap_or_else(|e| {
            error = Some(e);
            self.state.running()
        });

        if let Some(e) = error {
            self.hal
                .debug_write(&format!("[sched] tick {}: {}", self.ticks, e));
        }
        match running {
            Some(pid) if Some(pid) != yielded => self.hal.debug_write(&format!(
                "[sched] tick {}: switched to {}",
                self.ticks, pid
            )),
            Some(_) => {}
            None => self
                .hal
                .debug_write(&format!("[sched] tick {}: idle", self.ticks)),
        }

        self.syslog
            .log_response(req_id, error, self.uptime_nanos());

        TickReport {
            tick: self.ticks,
            interrupts,
            yielded,
            running,
        }
    }

    /// Number of ticks since boot
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    // ========================================================================
    // Interrupts
    // ========================================================================

    /// Queue an interrupt; it is handled on the next dispatch pass.
    pub fn raise_interrupt(&mut self, interrupt: Interrupt) -> SequenceNumber {
        let ty = interrupt.interrupt_type();
        let seq = self.interrupts.raise(interrupt);
        self.syslog.log_interrupt(seq, ty, self.uptime_nanos());
        self.hal
            .debug_write(&format!("[irq] raised #{} {}", seq, ty));
        seq
    }

    /// Install a handler, returning the one it replaces.
    pub fn register_handler(
        &mut self,
        ty: InterruptType,
        handler: InterruptHandler<KernelState>,
    ) -> Option<InterruptHandler<KernelState>> {
        self.interrupts.register_handler(ty, handler)
    }

    pub fn unregister_handler(&mut self, ty: InterruptType) -> Option<InterruptHandler<KernelState>> {
        self.interrupts.unregister_handler(ty)
    }

    /// Run one dispatch pass over the interrupts currently queued.
    ///
    /// Follow-ups raised by handlers stay queued for the next pass.
    pub fn dispatch_interrupts(&mut self) -> DispatchReport {
        if self.interrupts.pending() == 0 {
            return DispatchReport::default();
        }

        let first_follow_up = self.interrupts.next_seq();
        let report = self.interrupts.dispatch_pending(&mut self.state);

        let timestamp = self.uptime_nanos();
        for event in self
            .interrupts
            .pending_events()
            .filter(|e| e.seq >= first_follow_up)
        {
            self.syslog
                .log_interrupt(event.seq, event.interrupt.interrupt_type(), timestamp);
        }

        self.hal.debug_write(&format!(
            "[irq] dispatched {}, unhandled {}, follow-ups {}",
            report.dispatched, report.unhandled, report.raised_by_handlers
        ));
        report
    }

    /// Interrupts waiting for the next dispatch pass
    pub fn pending_interrupts(&self) -> impl Iterator<Item = &InterruptEvent> {
        self.interrupts.pending_events()
    }

    pub fn interrupt_stats(&self) -> InterruptStats {
        self.interrupts.stats()
    }

    // ========================================================================
    // Process memory
    // ========================================================================

    /// Write `data` at the start of a live process's block.
    pub fn write_process_memory(&mut self, pid: ProcessId, data: &[u8]) -> Result<(), KernelError> {
        self.state.write_memory(pid, data)
    }

    /// Read the first `len` units of a live process's block.
    pub fn read_process_memory(&self, pid: ProcessId, len: usize) -> Result<&[u8], KernelError> {
        self.state.read_memory(pid, len)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Process record, terminated ones included
    pub fn process(&self, pid: ProcessId) -> Option<&Process> {
        self.state.get_process(pid)
    }

    /// Every process record in pid order
    pub fn processes(&self) -> impl Iterator<Item = &Process> {
        self.state.processes.values()
    }

    /// Processes that have not terminated
    pub fn live_processes(&self) -> impl Iterator<Item = &Process> {
        self.state.live_processes()
    }

    pub fn running(&self) -> Option<ProcessId> {
        self.state.running()
    }

    /// Ready queue, head first
    pub fn ready_queue(&self) -> impl Iterator<Item = ProcessId> + '_ {
        self.state.scheduler.ready_queue()
    }

    pub fn memory_status(&self) -> MemoryStatus {
        self.state.memory_status()
    }

    pub fn context_switches(&self) -> u64 {
        self.state.scheduler.context_switches()
    }

    pub fn syslog(&self) -> &SysLog {
        &self.syslog
    }

    /// Check every kernel invariant (empty when consistent).
    pub fn check_invariants(&self) -> Vec<InvariantViolation> {
        check_all_invariants(&self.state)
    }

    // ========================================================================
    // Shutdown
    // ========================================================================

    /// Terminate every live process and drain the interrupt queue.
    ///
    /// Returns the number of processes terminated.
    pub fn shutdown(&mut self) -> usize {
        let req_id = self
            .syslog
            .log_request(Operation::Shutdown, self.uptime_nanos());

        let raised = self.state.terminate_all();
        let terminated = raised.len();
        for interrupt in raised {
            self.raise_interrupt(interrupt);
        }

        let mut passes = 0;
        while self.interrupts.pending() > 0 && passes < MAX_SHUTDOWN_PASSES {
            self.dispatch_interrupts();
            passes += 1;
        }
        if self.interrupts.pending() > 0 {
            self.hal.debug_write(&format!(
                "[kernel] shutdown: {} interrupts still queued after {} passes",
                self.interrupts.pending(),
                passes
            ));
        }

        self.hal.debug_write(&format!(
            "[kernel] shutdown: terminated {} processes",
            terminated
        ));
        self.syslog
            .log_response(req_id, None, self.uptime_nanos());
        terminated
    }

    /// Log the request, run a state step, raise its interrupts, log the
    /// response.
    fn execute<T>(
        &mut self,
        op: Operation,
        step: impl FnOnce(&mut KernelState, u64) -> StepResult<T>,
    ) -> Result<T, KernelError> {
        let timestamp = self.uptime_nanos();
        let req_id = self.syslog.log_request(op, timestamp);

        let StepResult { result, interrupts } = step(&mut self.state, timestamp);
        for interrupt in interrupts {
            self.raise_interrupt(interrupt);
        }

        self.syslog
            .log_response(req_id, result.as_ref().err().copied(), self.uptime_nanos());
        result
    }
}
