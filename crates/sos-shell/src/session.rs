//! Shell session: runs parsed commands against the file system.

use std::io::Write;

use anyhow::Result;
use sos_hal::HAL;
use sos_vfs::{bootstrap, FileSystem, Snapshot};

use crate::command::Command;
use crate::store::SnapshotStore;

/// Whether the prompt loop should keep going
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Session<H: HAL> {
    fs: FileSystem<H>,
    store: Option<SnapshotStore>,
}

impl<H: HAL> Session<H> {
    /// Start a session; `store` is `None` when nothing should be persisted.
    pub fn new(fs: FileSystem<H>, store: Option<SnapshotStore>) -> Self {
        Self { fs, store }
    }

    /// Restore `snapshot` into the file system, reporting files that failed.
    pub fn restore(&mut self, snapshot: &Snapshot, out: &mut impl Write) -> Result<()> {
        let report = bootstrap(&mut self.fs, snapshot);
        for (name, e) in &report.failed {
            writeln!(out, "[Error] Could not restore '{}': {}", name, e)?;
        }
        // Pids changed, keep the saved file in step
        self.persist(out)
    }

    /// Run one command line.
    pub fn run_line(&mut self, line: &str, out: &mut impl Write) -> Result<Flow> {
        match Command::parse(line) {
            Ok(cmd) => self.execute(cmd, out),
            Err(e) => {
                writeln!(out, "[Error] {}", e)?;
                Ok(Flow::Continue)
            }
        }
    }

    pub fn execute(&mut self, cmd: Command, out: &mut impl Write) -> Result<Flow> {
        let mutates = cmd.mutates();
        let ok = match cmd {
            Command::Help => {
                writeln!(out, "Commands:")?;
                for c in Command::all() {
                    writeln!(out, "  {}", c.usage())?;
                }
                true
            }

            Command::Create {
                name,
                content,
                memory_size,
            } => match self.fs.create(&name, &content, memory_size) {
                Ok(pid) => {
                    writeln!(out, "[Log] File created with process ID: {}", pid)?;
                    true
                }
                Err(e) => {
                    writeln!(out, "[Error] Failed to create file {}: {}", name, e)?;
                    false
                }
            },

            Command::List => {
                writeln!(out, "Files:")?;
                for entry in self.fs.entries() {
                    writeln!(out, "- {} (Size: {} bytes)", entry.name, entry.len)?;
                }
                true
            }

            Command::Read { name } => match self.fs.read(&name) {
                Ok(content) => {
                    writeln!(out, "[Log] Content of {}:\n{}", name, content)?;
                    true
                }
                Err(e) => {
                    writeln!(out, "[Error] {}", e)?;
                    false
                }
            },

            Command::Remove { name } => match self.fs.remove(&name) {
                Ok(pid) => {
                    writeln!(
                        out,
                        "[Log] File '{}' removed with process ID: {}",
                        name, pid
                    )?;
                    true
                }
                Err(e) => {
                    writeln!(out, "[Error] {}", e)?;
                    false
                }
            },

            Command::Rename { old_name, new_name } => {
                match self.fs.rename(&old_name, &new_name) {
                    Ok(()) => {
                        writeln!(
                            out,
                            "[Log] File renamed from '{}' to '{}' successfully.",
                            old_name, new_name
                        )?;
                        true
                    }
                    Err(e) => {
                        writeln!(out, "[Error] Failed to rename file: {}", e)?;
                        false
                    }
                }
            }

            Command::Memory => {
                let status = self.fs.memory_status();
                writeln!(out, "Total Memory: {} bytes", status.total)?;
                writeln!(out, "Used Memory: {} bytes", status.used)?;
                writeln!(out, "Free Memory: {} bytes", status.free)?;
                writeln!(
                    out,
                    "Free Gaps: {} (largest {} bytes)",
                    status.free_gaps, status.largest_free_gap
                )?;
                true
            }

            Command::Ps => {
                let kernel = self.fs.kernel();
                writeln!(out, "{:>5}  {:<10}  {:>4}  {:>6}  NAME", "PID", "STATE", "PRIO", "MEMORY")?;
                for p in kernel.live_processes() {
                    let memory = p.memory_block().map(|b| b.length).unwrap_or(0);
                    writeln!(
                        out,
                        "{:>5}  {:<10}  {:>4}  {:>6}  {}",
                        p.pid().0,
                        p.state().as_str(),
                        p.priority(),
                        memory,
                        p.name()
                    )?;
                }
                true
            }

            Command::Tick { count } => {
                for _ in 0..count {
                    let report = self.fs.tick();
                    match report.running {
                        Some(pid) => writeln!(out, "[Log] Tick {}: running {}", report.tick, pid)?,
                        None => writeln!(out, "[Log] Tick {}: idle", report.tick)?,
                    }
                }
                true
            }

            Command::Exit => {
                let terminated = self.fs.shutdown();
                writeln!(out, "[Log] Kernel stopped, {} processes terminated", terminated)?;
                return Ok(Flow::Exit);
            }

            Command::Unknown { cmd } => {
                if !cmd.is_empty() {
                    writeln!(out, "[Error] Unknown command: {} (type help)", cmd)?;
                }
                false
            }
        };

        if ok && mutates {
            self.persist(out)?;
        }
        Ok(Flow::Continue)
    }

    /// Save the directory; a failed save is reported, not fatal.
    fn persist(&self, out: &mut impl Write) -> Result<()> {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&self.fs.snapshot()) {
                writeln!(out, "[Error] {:#}", e)?;
            }
        }
        Ok(())
    }
}
