//! Runtime-checkable kernel invariants
//!
//! Used by tests after every step of randomized operation sequences, and
//! by the kernel wrapper's `check_invariants` for debugging.
//!
//! # Invariants
//!
//! 1. **Memory Partition**: allocated blocks are sorted, disjoint and in
//!    bounds; allocated + free == total
//! 2. **Block Ownership**: a process holds a block iff it is READY, RUNNING
//!    or WAITING, and every allocated block belongs to exactly such a process
//! 3. **Single CPU**: at most one RUNNING process, and it is the scheduler's
//!    current process
//! 4. **Ready Queue Consistency**: queued pids exist, are READY, and appear once
//! 5. **ID Monotonicity**: every pid is below `next_pid`

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::process::ProcessState;
use crate::state::KernelState;

/// An invariant violation with details
#[derive(Clone, Debug)]
pub struct InvariantViolation {
    /// Name of the violated invariant
    pub invariant: &'static str,
    /// Description of what went wrong
    pub description: String,
}

/// Check all kernel invariants.
///
/// Returns a list of violations (empty if all invariants hold).
pub fn check_all_invariants(state: &KernelState) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    violations.extend(check_memory_partition(state));
    violations.extend(check_block_ownership(state));
    violations.extend(check_single_cpu(state));
    violations.extend(check_ready_queue(state));
    violations.extend(check_id_monotonicity(state));

    violations
}

fn violation(invariant: &'static str, description: String) -> InvariantViolation {
    InvariantViolation {
        invariant,
        description,
    }
}

/// Invariant 1: allocated blocks partition the address space with the gaps
fn check_memory_partition(state: &KernelState) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    let memory = &state.memory;
    let blocks = memory.blocks();

    for pair in blocks.windows(2) {
        if pair[0].end() > pair[1].start {
            violations.push(violation(
                "memory_partition",
                format!(
                    "Blocks [{}, {}) and [{}, {}) overlap or are out of order",
                    pair[0].start,
                    pair[0].end(),
                    pair[1].start,
                    pair[1].end()
                ),
            ));
        }
    }

    if let Some(last) = blocks.last() {
        if last.end() > memory.total_size() {
            violations.push(violation(
                "memory_partition",
                format!(
                    "Block [{}, {}) exceeds address space of {}",
                    last.start,
                    last.end(),
                    memory.total_size()
                ),
            ));
        }
    }

    let free: usize = memory.free_gaps().map(|g| g.length).sum();
    if memory.used() + free != memory.total_size() {
        violations.push(violation(
            "memory_partition",
            format!(
                "used {} + free {} != total {}",
                memory.used(),
                free,
                memory.total_size()
            ),
        ));
    }

    violations
}

/// Invariant 2: blocks and memory-holding states agree
fn check_block_ownership(state: &KernelState) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    for (pid, process) in &state.processes {
        match (process.memory_block(), process.state().holds_memory()) {
            (Some(block), true) => {
                if block.owner != *pid || !state.memory.is_allocated(&block) {
                    violations.push(violation(
                        "block_ownership",
                        format!(
                            "Process {} references block at {} that it does not own",
                            pid, block.start
                        ),
                    ));
                }
            }
            (None, false) => {}
            (Some(_), false) => violations.push(violation(
                "block_ownership",
                format!("Process {} is {} but holds memory", pid, process.state()),
            )),
            (None, true) => violations.push(violation(
                "block_ownership",
                format!("Process {} is {} without memory", pid, process.state()),
            )),
        }
    }

    for block in state.memory.blocks() {
        let owned = state
            .processes
            .get(&block.owner)
            .and_then(|p| p.memory_block())
            == Some(*block);
        if !owned {
            violations.push(violation(
                "block_ownership",
                format!(
                    "Block at {} is allocated for {} but no live process holds it",
                    block.start, block.owner
                ),
            ));
        }
    }

    violations
}

/// Invariant 3: single CPU
fn check_single_cpu(state: &KernelState) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    let running: Vec<_> = state
        .processes
        .values()
        .filter(|p| p.state() == ProcessState::Running)
        .map(|p| p.pid())
        .collect();

    if running.len() > 1 {
        violations.push(violation(
            "single_cpu",
            format!("{} processes are RUNNING: {:?}", running.len(), running),
        ));
    }

    if let Some(&pid) = running.first() {
        if state.scheduler.current() != Some(pid) {
            violations.push(violation(
                "single_cpu",
                format!("Process {} is RUNNING but is not the scheduler's current", pid),
            ));
        }
    }

    violations
}

/// Invariant 4: ready queue consistency
fn check_ready_queue(state: &KernelState) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    let mut seen = Vec::new();

    for pid in state.scheduler.ready_queue() {
        if seen.contains(&pid) {
            violations.push(violation(
                "ready_queue",
                format!("Process {} is queued twice", pid),
            ));
        }
        seen.push(pid);

        match state.state_of(pid) {
            Some(ProcessState::Ready) => {}
            Some(other) => violations.push(violation(
                "ready_queue",
                format!("Process {} is queued while {}", pid, other),
            )),
            None => violations.push(violation(
                "ready_queue",
                format!("Queued process {} does not exist", pid),
            )),
        }

        if state.scheduler.current() == Some(pid) {
            violations.push(violation(
                "ready_queue",
                format!("Process {} is both queued and current", pid),
            ));
        }
    }

    violations
}

/// Invariant 5: next_pid is greater than every existing pid
fn check_id_monotonicity(state: &KernelState) -> Vec<InvariantViolation> {
    state
        .processes
        .keys()
        .filter(|pid| pid.0 >= state.next_pid)
        .map(|pid| {
            violation(
                "id_monotonicity",
                format!("Process {} exists but next_pid is {}", pid, state.next_pid),
            )
        })
        .collect()
}
