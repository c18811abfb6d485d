//! Process descriptor and lifecycle state machine
//!
//! A `Process` is passive data. Its state only changes through the
//! methods below, each of which validates the move against
//! [`ProcessState::can_transition_to`] before touching any field.
//!
//! ```text
//!            admit            dispatch
//!   NEW ────────────▶ READY ◀────────▶ RUNNING
//!    │                 ▲  ▲   preempt     │
//!    │                 │  └───── wake ────┤ block
//!    │                 │       WAITING ◀──┘
//!    │                 │          │
//!    └─────────────────┴──────────┴──────▶ TERMINATED
//!                   terminate (from any live state)
//! ```

use alloc::string::String;
use core::fmt;
use serde::{Deserialize, Serialize};

use crate::error::KernelError;
use crate::types::{MemoryBlock, Priority, ProcessId};

/// Process state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessState {
    /// Registered, memory not yet attached
    New,
    /// Waiting in the ready queue
    Ready,
    /// Holds the (single) simulated CPU
    Running,
    /// Logically blocked until explicitly woken
    Waiting,
    /// Tombstone - final and immutable
    Terminated,
}

impl ProcessState {
    /// All states, in lifecycle order
    pub const ALL: [ProcessState; 5] = [
        ProcessState::New,
        ProcessState::Ready,
        ProcessState::Running,
        ProcessState::Waiting,
        ProcessState::Terminated,
    ];

    /// The transition table.
    pub fn can_transition_to(self, to: ProcessState) -> bool {
        use ProcessState::*;
        matches!(
            (self, to),
            (New, Ready)
                | (Ready, Running)
                | (Running, Ready)
                | (Running, Waiting)
                | (Waiting, Ready)
                | (New | Ready | Running | Waiting, Terminated)
        )
    }

    /// States in which the process must own a memory block
    pub fn holds_memory(self) -> bool {
        matches!(
            self,
            ProcessState::Ready | ProcessState::Running | ProcessState::Waiting
        )
    }

    /// Check for the tombstone state
    pub fn is_terminated(self) -> bool {
        self == ProcessState::Terminated
    }

    /// Upper-case name used in logs and listings
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessState::New => "NEW",
            ProcessState::Ready => "READY",
            ProcessState::Running => "RUNNING",
            ProcessState::Waiting => "WAITING",
            ProcessState::Terminated => "TERMINATED",
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process descriptor
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    /// Process ID
    pid: ProcessId,
    /// Process name
    name: String,
    /// Current state
    state: ProcessState,
    /// Reference to the block owned in the MemoryManager
    memory_block: Option<MemoryBlock>,
    /// Scheduling priority
    priority: Priority,
    /// Creation time (nanos since boot)
    created_at: u64,
}

impl Process {
    /// Create a process in the NEW state with no memory attached.
    pub fn new(pid: ProcessId, name: impl Into<String>, priority: Priority, created_at: u64) -> Self {
        Self {
            pid,
            name: name.into(),
            state: ProcessState::New,
            memory_block: None,
            priority,
            created_at,
        }
    }

    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn memory_block(&self) -> Option<MemoryBlock> {
        self.memory_block
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Check a transition without applying it.
    pub fn check_transition(&self, to: ProcessState) -> Result<(), KernelError> {
        if self.state.can_transition_to(to) {
            Ok(())
        } else {
            Err(KernelError::InvalidTransition {
                pid: self.pid,
                from: self.state,
                to,
            })
        }
    }

    /// NEW -> READY, attaching the block secured for this process.
    pub fn admit(&mut self, block: MemoryBlock) -> Result<(), KernelError> {
        self.check_transition(ProcessState::Ready)?;
        if self.state != ProcessState::New {
            // READY is also reachable from RUNNING/WAITING, but only admission attaches memory
            return Err(KernelError::InvalidTransition {
                pid: self.pid,
                from: self.state,
                to: ProcessState::Ready,
            });
        }
        self.memory_block = Some(block);
        self.state = ProcessState::Ready;
        Ok(())
    }

    /// READY -> RUNNING
    pub fn dispatch(&mut self) -> Result<(), KernelError> {
        self.move_between_live(ProcessState::Ready, ProcessState::Running)
    }

    /// RUNNING -> READY
    pub fn preempt(&mut self) -> Result<(), KernelError> {
        self.move_between_live(ProcessState::Running, ProcessState::Ready)
    }

    /// RUNNING -> WAITING
    pub fn block(&mut self) -> Result<(), KernelError> {
        self.move_between_live(ProcessState::Running, ProcessState::Waiting)
    }

    /// WAITING -> READY
    pub fn wake(&mut self) -> Result<(), KernelError> {
        self.move_between_live(ProcessState::Waiting, ProcessState::Ready)
    }

    /// Change the name of a live process. Tombstones keep their name.
    pub fn rename(&mut self, name: impl Into<String>) -> Result<(), KernelError> {
        if self.state.is_terminated() {
            return Err(KernelError::NotFound(self.pid));
        }
        self.name = name.into();
        Ok(())
    }

    /// Any live state -> TERMINATED.
    ///
    /// Returns the block reference the process held. The caller is
    /// responsible for releasing it in the MemoryManager.
    pub fn terminate(&mut self) -> Result<Option<MemoryBlock>, KernelError> {
        self.check_transition(ProcessState::Terminated)?;
        self.state = ProcessState::Terminated;
        Ok(self.memory_block.take())
    }

    fn move_between_live(&mut self, from: ProcessState, to: ProcessState) -> Result<(), KernelError> {
        if self.state != from {
            return Err(KernelError::InvalidTransition {
                pid: self.pid,
                from: self.state,
                to,
            });
        }
        self.check_transition(to)?;
        self.state = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ProcessState::*;

    fn block() -> MemoryBlock {
        MemoryBlock {
            start: 0,
            length: 16,
            owner: ProcessId(1),
        }
    }

    fn process_in(state: ProcessState) -> Process {
        let mut p = Process::new(ProcessId(1), "test", 0, 0);
        match state {
            New => {}
            Ready => p.admit(block()).unwrap(),
            Running => {
                p.admit(block()).unwrap();
                p.dispatch().unwrap();
            }
            Waiting => {
                p.admit(block()).unwrap();
                p.dispatch().unwrap();
                p.block().unwrap();
            }
            Terminated => {
                p.terminate().unwrap();
            }
        }
        p
    }

    /// Apply `to` through whichever method drives that edge.
    fn drive(p: &mut Process, to: ProcessState) -> Result<(), KernelError> {
        match (p.state(), to) {
            (_, New) => p.check_transition(New),
            (New, Ready) => p.admit(block()),
            (Running, Ready) => p.preempt(),
            (Waiting, Ready) => p.wake(),
            (_, Ready) => p.check_transition(Ready),
            (_, Running) => p.dispatch(),
            (_, Waiting) => p.block(),
            (_, Terminated) => p.terminate().map(|_| ()),
        }
    }

    #[test]
    fn test_transition_table() {
        let legal = [
            (New, Ready),
            (Ready, Running),
            (Running, Ready),
            (Running, Waiting),
            (Waiting, Ready),
            (New, Terminated),
            (Ready, Terminated),
            (Running, Terminated),
            (Waiting, Terminated),
        ];
        for from in ProcessState::ALL {
            for to in ProcessState::ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    legal.contains(&(from, to)),
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_every_pair_through_methods() {
        for from in ProcessState::ALL {
            for to in ProcessState::ALL {
                let mut p = process_in(from);
                let result = drive(&mut p, to);
                if from.can_transition_to(to) {
                    assert!(result.is_ok(), "{} -> {} should succeed", from, to);
                    assert_eq!(p.state(), to);
                } else {
                    assert_eq!(
                        result,
                        Err(KernelError::InvalidTransition {
                            pid: ProcessId(1),
                            from,
                            to
                        })
                    );
                    assert_eq!(p.state(), from, "failed transition must not mutate");
                }
                assert_eq!(p.memory_block().is_some(), p.state().holds_memory());
            }
        }
    }

    #[test]
    fn test_waiting_cannot_run_directly() {
        let mut p = process_in(Waiting);
        assert_eq!(
            p.dispatch(),
            Err(KernelError::InvalidTransition {
                pid: ProcessId(1),
                from: Waiting,
                to: Running
            })
        );
    }

    #[test]
    fn test_terminate_releases_block_reference() {
        let mut p = process_in(Running);
        assert_eq!(p.terminate(), Ok(Some(block())));
        assert_eq!(p.memory_block(), None);
        assert!(p.state().is_terminated());
    }

    #[test]
    fn test_tombstone_is_immutable() {
        let mut p = process_in(Terminated);
        assert!(p.terminate().is_err());
        assert!(p.admit(block()).is_err());
        assert!(p.wake().is_err());
        assert_eq!(p.state(), Terminated);
        assert_eq!(p.memory_block(), None);
    }

    #[test]
    fn test_rename_live_only() {
        let mut p = process_in(Waiting);
        p.rename("renamed").unwrap();
        assert_eq!(p.name(), "renamed");
        assert_eq!(p.state(), Waiting);

        let mut dead = process_in(Terminated);
        assert_eq!(dead.rename("x"), Err(KernelError::NotFound(ProcessId(1))));
        assert_eq!(dead.name(), "test");
    }

    #[test]
    fn test_readmit_rejected() {
        let mut p = process_in(Running);
        p.preempt().unwrap();
        assert!(p.admit(block()).is_err());
        assert_eq!(p.state(), Ready);
    }
}
