//! System Event Log (SysLog)
//!
//! Audit trail of kernel operations: one request event when an operation
//! starts and one response event when it finishes. Raised interrupts are
//! recorded as well, so the log shows the full causal order of a session.

use alloc::string::String;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};
use sos_kernel_core::{InterruptType, KernelError, Priority, ProcessId, SequenceNumber};

/// Event identifier (monotonic)
pub type EventId = u64;

/// Kernel operation recorded in a request event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    CreateProcess {
        name: String,
        memory: usize,
        priority: Priority,
    },
    TerminateProcess {
        pid: ProcessId,
    },
    TerminateCurrent,
    RenameProcess {
        pid: ProcessId,
        name: String,
    },
    YieldCurrent,
    WaitCurrent,
    Wake {
        pid: ProcessId,
    },
    Tick,
    Shutdown,
}

/// A system event.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SysEvent {
    /// Unique event ID (monotonic)
    pub id: EventId,
    /// Timestamp (nanos since boot)
    pub timestamp: u64,
    /// Event type
    pub event_type: SysEventType,
}

/// Type of system event.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum SysEventType {
    /// Operation entered the kernel
    Request { op: Operation },
    /// Operation finished
    Response {
        /// ID of the request this responds to
        request_id: EventId,
        /// `None` on success
        error: Option<KernelError>,
    },
    /// Interrupt queued
    Interrupt {
        seq: SequenceNumber,
        interrupt_type: InterruptType,
    },
}

/// Maximum number of events to keep in memory
const MAX_SYSLOG_EVENTS: usize = 10000;

/// System event log for auditing.
///
/// Events are append-only with monotonic IDs. Once the log exceeds its
/// capacity the oldest events are dropped; IDs are never reused.
pub struct SysLog {
    /// Event entries (append-only)
    events: Vec<SysEvent>,
    /// Next event ID to assign
    next_id: EventId,
    /// Capacity before trimming
    capacity: usize,
}

impl SysLog {
    /// Create a new empty SysLog.
    pub fn new() -> Self {
        Self::with_capacity(MAX_SYSLOG_EVENTS)
    }

    /// Create a SysLog that keeps at most `capacity` events.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Vec::new(),
            next_id: 0,
            capacity,
        }
    }

    /// Log an operation request.
    ///
    /// Returns the event ID for correlating with the response.
    pub fn log_request(&mut self, op: Operation, timestamp: u64) -> EventId {
        self.push(SysEventType::Request { op }, timestamp)
    }

    /// Log an operation response.
    pub fn log_response(&mut self, request_id: EventId, error: Option<KernelError>, timestamp: u64) {
        self.push(SysEventType::Response { request_id, error }, timestamp);
    }

    /// Log a raised interrupt.
    pub fn log_interrupt(&mut self, seq: SequenceNumber, interrupt_type: InterruptType, timestamp: u64) {
        self.push(
            SysEventType::Interrupt {
                seq,
                interrupt_type,
            },
            timestamp,
        );
    }

    /// Get all events.
    pub fn events(&self) -> &[SysEvent] {
        &self.events
    }

    /// Get the most recent N events.
    pub fn get_recent(&self, count: usize) -> Vec<&SysEvent> {
        self.events.iter().rev().take(count).collect()
    }

    /// Responses that carried an error
    pub fn failures(&self) -> impl Iterator<Item = (&SysEvent, KernelError)> {
        self.events.iter().filter_map(|e| match e.event_type {
            SysEventType::Response {
                error: Some(err), ..
            } => Some((e, err)),
            _ => None,
        })
    }

    /// Get the number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if the log is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Get the next event ID.
    pub fn next_id(&self) -> EventId {
        self.next_id
    }

    fn push(&mut self, event_type: SysEventType, timestamp: u64) -> EventId {
        let id = self.next_id;
        self.next_id += 1;

        self.events.push(SysEvent {
            id,
            timestamp,
            event_type,
        });

        self.trim_if_needed();
        id
    }

    /// Trim old events if exceeding max capacity.
    fn trim_if_needed(&mut self) {
        if self.events.len() > self.capacity {
            let drain_count = self.events.len() - self.capacity;
            self.events.drain(0..drain_count);
        }
    }
}

impl Default for SysLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syslog_creation() {
        let log = SysLog::new();
        assert!(log.is_empty());
        assert_eq!(log.len(), 0);
        assert_eq!(log.next_id(), 0);
    }

    #[test]
    fn test_syslog_request_response() {
        let mut log = SysLog::new();

        let req_id = log.log_request(Operation::TerminateProcess { pid: ProcessId(4) }, 1000);
        assert_eq!(req_id, 0);
        log.log_response(req_id, Some(KernelError::NotFound(ProcessId(4))), 1100);

        assert_eq!(log.len(), 2);
        let events = log.events();
        assert!(matches!(
            events[0].event_type,
            SysEventType::Request {
                op: Operation::TerminateProcess { pid: ProcessId(4) }
            }
        ));
        assert!(matches!(
            events[1].event_type,
            SysEventType::Response {
                request_id: 0,
                error: Some(KernelError::NotFound(_))
            }
        ));
        assert_eq!(log.failures().count(), 1);
    }

    #[test]
    fn test_syslog_trims_oldest() {
        let mut log = SysLog::with_capacity(4);
        for i in 0..10 {
            log.log_request(Operation::Tick, i * 100);
        }

        assert_eq!(log.len(), 4);
        assert_eq!(log.events()[0].id, 6);
        assert_eq!(log.next_id(), 10);

        let recent = log.get_recent(2);
        // Most recent first
        assert_eq!(recent[0].id, 9);
        assert_eq!(recent[1].id, 8);
    }
}
