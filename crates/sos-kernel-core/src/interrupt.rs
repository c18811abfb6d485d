//! Interrupt controller
//!
//! Interrupts are a closed set of tagged variants. Each variant has at most
//! one handler, stored in a fixed table indexed by [`InterruptType`], so
//! dispatch is an exhaustive match rather than an open callback registry.
//!
//! # Ordering
//!
//! Events form a single FIFO queue ordered by sequence number.
//! `dispatch_pending` only processes the events that were queued when it
//! was called; anything a handler raises is appended to the tail and
//! waits for the next call. Handlers receive the context but never the
//! controller, so they cannot re-enter dispatch.

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::fmt;
use serde::{Deserialize, Serialize};

use crate::types::{ProcessId, SequenceNumber};

/// Interrupt type (handler table key)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InterruptType {
    MemoryFull,
    ProcessCreated,
    ProcessTerminated,
    IoRequest,
    IoComplete,
    Fault,
}

impl InterruptType {
    /// Number of interrupt types
    pub const COUNT: usize = 6;

    /// All interrupt types in table order
    pub const ALL: [InterruptType; Self::COUNT] = [
        InterruptType::MemoryFull,
        InterruptType::ProcessCreated,
        InterruptType::ProcessTerminated,
        InterruptType::IoRequest,
        InterruptType::IoComplete,
        InterruptType::Fault,
    ];

    fn index(self) -> usize {
        match self {
            InterruptType::MemoryFull => 0,
            InterruptType::ProcessCreated => 1,
            InterruptType::ProcessTerminated => 2,
            InterruptType::IoRequest => 3,
            InterruptType::IoComplete => 4,
            InterruptType::Fault => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InterruptType::MemoryFull => "MEMORY_FULL",
            InterruptType::ProcessCreated => "PROCESS_CREATED",
            InterruptType::ProcessTerminated => "PROCESS_TERMINATED",
            InterruptType::IoRequest => "IO_REQUEST",
            InterruptType::IoComplete => "IO_COMPLETE",
            InterruptType::Fault => "FAULT",
        }
    }
}

impl fmt::Display for InterruptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An interrupt with its typed payload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interrupt {
    /// An allocation request could not be satisfied
    MemoryFull { requested: usize, largest_free: usize },
    /// A process was admitted to the ready queue
    ProcessCreated { pid: ProcessId },
    /// A process reached the TERMINATED state
    ProcessTerminated { pid: ProcessId },
    /// A process asked for I/O and should wait
    IoRequest { pid: ProcessId },
    /// I/O for a waiting process finished
    IoComplete { pid: ProcessId },
    /// Fatal error in a process
    Fault { pid: ProcessId },
}

impl Interrupt {
    /// The handler table key for this interrupt
    pub fn interrupt_type(&self) -> InterruptType {
        match self {
            Interrupt::MemoryFull { .. } => InterruptType::MemoryFull,
            Interrupt::ProcessCreated { .. } => InterruptType::ProcessCreated,
            Interrupt::ProcessTerminated { .. } => InterruptType::ProcessTerminated,
            Interrupt::IoRequest { .. } => InterruptType::IoRequest,
            Interrupt::IoComplete { .. } => InterruptType::IoComplete,
            Interrupt::Fault { .. } => InterruptType::Fault,
        }
    }

    /// The process the interrupt concerns, if any
    pub fn pid(&self) -> Option<ProcessId> {
        match self {
            Interrupt::MemoryFull { .. } => None,
            Interrupt::ProcessCreated { pid }
            | Interrupt::ProcessTerminated { pid }
            | Interrupt::IoRequest { pid }
            | Interrupt::IoComplete { pid }
            | Interrupt::Fault { pid } => Some(*pid),
        }
    }
}

/// A raised interrupt waiting in (or taken from) the queue
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterruptEvent {
    /// Position in raise order
    pub seq: SequenceNumber,
    pub interrupt: Interrupt,
}

/// Interrupt handler.
///
/// Returns follow-up interrupts, which are queued for the next dispatch
/// pass.
pub type InterruptHandler<C> = fn(&mut C, &InterruptEvent) -> Vec<Interrupt>;

/// Outcome of one `dispatch_pending` pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    /// Events delivered to a handler
    pub dispatched: usize,
    /// Events dropped because no handler was registered
    pub unhandled: usize,
    /// Follow-up interrupts queued by handlers
    pub raised_by_handlers: usize,
}

/// Lifetime counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterruptStats {
    pub raised: u64,
    pub dispatched: u64,
    pub unhandled: u64,
}

/// Ordered interrupt queue plus the type -> handler table.
pub struct InterruptController<C> {
    queue: VecDeque<InterruptEvent>,
    handlers: [Option<InterruptHandler<C>>; InterruptType::COUNT],
    next_seq: SequenceNumber,
    stats: InterruptStats,
}

impl<C> InterruptController<C> {
    /// Create a controller with no handlers and an empty queue.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            handlers: [None; InterruptType::COUNT],
            next_seq: 1,
            stats: InterruptStats::default(),
        }
    }

    /// Install `handler` for `ty`, returning the handler it replaces.
    pub fn register_handler(
        &mut self,
        ty: InterruptType,
        handler: InterruptHandler<C>,
    ) -> Option<InterruptHandler<C>> {
        self.handlers[ty.index()].replace(handler)
    }

    /// Remove the handler for `ty`; later events of that type go unhandled.
    pub fn unregister_handler(&mut self, ty: InterruptType) -> Option<InterruptHandler<C>> {
        self.handlers[ty.index()].take()
    }

    pub fn has_handler(&self, ty: InterruptType) -> bool {
        self.handlers[ty.index()].is_some()
    }

    /// Queue an interrupt and return its sequence number.
    pub fn raise(&mut self, interrupt: Interrupt) -> SequenceNumber {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.stats.raised += 1;
        self.queue.push_back(InterruptEvent { seq, interrupt });
        seq
    }

    /// Deliver every event queued before this call, in raise order.
    pub fn dispatch_pending(&mut self, ctx: &mut C) -> DispatchReport {
        let mut report = DispatchReport::default();
        let batch = self.queue.len();

        for _ in 0..batch {
            let Some(event) = self.queue.pop_front() else {
                break;
            };

            match self.handlers[event.interrupt.interrupt_type().index()] {
                Some(handler) => {
                    let follow_ups = handler(ctx, &event);
                    report.dispatched += 1;
                    report.raised_by_handlers += follow_ups.len();
                    for interrupt in follow_ups {
                        self.raise(interrupt);
                    }
                }
                None => report.unhandled += 1,
            }
        }

        self.stats.dispatched += report.dispatched as u64;
        self.stats.unhandled += report.unhandled as u64;
        report
    }

    /// Number of queued events
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Queued events in dispatch order
    pub fn pending_events(&self) -> impl Iterator<Item = &InterruptEvent> {
        self.queue.iter()
    }

    /// Sequence number the next raise will receive
    pub fn next_seq(&self) -> SequenceNumber {
        self.next_seq
    }

    pub fn stats(&self) -> InterruptStats {
        self.stats
    }
}

impl<C> Default for InterruptController<C> {
    fn default() -> Self {
        Self::new()
    }
}
