//! Default interrupt handlers
//!
//! The kernel installs one handler per [`InterruptType`] at boot. Handlers
//! run with `&mut KernelState` as context and return follow-up interrupts;
//! they never fail. An interrupt that no longer applies (the process is
//! gone, or not in the expected state) is ignored.

use alloc::vec::Vec;

use crate::interrupt::{Interrupt, InterruptEvent, InterruptHandler, InterruptType};
use crate::process::ProcessState;
use crate::state::KernelState;

/// The handler table installed by default.
pub fn default_handlers() -> [(InterruptType, InterruptHandler<KernelState>); InterruptType::COUNT] {
    [
        (InterruptType::MemoryFull, on_notice),
        (InterruptType::ProcessCreated, on_notice),
        (InterruptType::ProcessTerminated, on_notice),
        (InterruptType::IoRequest, on_io_request),
        (InterruptType::IoComplete, on_io_complete),
        (InterruptType::Fault, on_fault),
    ]
}

/// Informational interrupts: acknowledged, nothing to do.
pub fn on_notice(_state: &mut KernelState, _event: &InterruptEvent) -> Vec<Interrupt> {
    Vec::new()
}

/// Block the requesting process if it holds the CPU.
pub fn on_io_request(state: &mut KernelState, event: &InterruptEvent) -> Vec<Interrupt> {
    if let Interrupt::IoRequest { pid } = event.interrupt {
        if state.running() == Some(pid) {
            let _ = state.block_current();
        }
    }
    Vec::new()
}

/// Return a waiting process to the ready queue.
pub fn on_io_complete(state: &mut KernelState, event: &InterruptEvent) -> Vec<Interrupt> {
    if let Interrupt::IoComplete { pid } = event.interrupt {
        if state.state_of(pid) == Some(ProcessState::Waiting) {
            let _ = state.wake(pid);
        }
    }
    Vec::new()
}

/// Fatal interrupt: terminate the faulting process.
///
/// The resulting `ProcessTerminated` is queued for the next pass.
pub fn on_fault(state: &mut KernelState, event: &InterruptEvent) -> Vec<Interrupt> {
    match event.interrupt {
        Interrupt::Fault { pid } => state.terminate_process(pid).interrupts,
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupt::InterruptController;
    use crate::types::ProcessId;
    use alloc::vec;

    fn controller() -> InterruptController<KernelState> {
        let mut ic = InterruptController::new();
        for (ty, handler) in default_handlers() {
            ic.register_handler(ty, handler);
        }
        ic
    }

    #[test]
    fn test_default_table_is_complete() {
        let ic = controller();
        for ty in InterruptType::ALL {
            assert!(ic.has_handler(ty), "missing handler for {}", ty);
        }
    }

    #[test]
    fn test_fault_terminates_and_notifies_next_pass() {
        let mut state = KernelState::new(100);
        let pid = state.create_process("a", 10, 0, 0).result.unwrap();
        let mut ic = controller();

        ic.raise(Interrupt::Fault { pid });
        let report = ic.dispatch_pending(&mut state);
        assert_eq!(report.dispatched, 1);
        assert_eq!(state.state_of(pid), Some(ProcessState::Terminated));
        assert_eq!(state.memory.used(), 0);

        let queued: Vec<_> = ic.pending_events().map(|e| e.interrupt.clone()).collect();
        assert_eq!(queued, vec![Interrupt::ProcessTerminated { pid }]);
    }

    #[test]
    fn test_fault_for_unknown_process_is_ignored() {
        let mut state = KernelState::new(100);
        let mut ic = controller();
        ic.raise(Interrupt::Fault { pid: ProcessId(99) });
        let report = ic.dispatch_pending(&mut state);
        assert_eq!(report.dispatched, 1);
        assert_eq!(report.raised_by_handlers, 0);
    }

    #[test]
    fn test_io_request_then_complete() {
        let mut state = KernelState::new(100);
        let a = state.create_process("a", 10, 0, 0).result.unwrap();
        let b = state.create_process("b", 10, 0, 0).result.unwrap();
        state.schedule().unwrap();
        let mut ic = controller();

        // Only the running process can be blocked
        ic.raise(Interrupt::IoRequest { pid: b });
        ic.raise(Interrupt::IoRequest { pid: a });
        ic.dispatch_pending(&mut state);
        assert_eq!(state.state_of(a), Some(ProcessState::Waiting));
        assert_eq!(state.state_of(b), Some(ProcessState::Ready));
        assert_eq!(state.running(), None);

        ic.raise(Interrupt::IoComplete { pid: a });
        ic.dispatch_pending(&mut state);
        assert_eq!(state.state_of(a), Some(ProcessState::Ready));
        assert_eq!(
            state.scheduler.ready_queue().collect::<Vec<_>>(),
            vec![b, a]
        );
    }
}
