//! The file system: a flat directory of files backed by kernel processes.
//!
//! Creating a file starts a kernel process whose memory block holds the
//! file's bytes. Removing the file terminates that process, which returns
//! the block to the allocator.
//!
//! Every directory entry is owned by a live process. Kernel calls that can
//! terminate processes behind the directory's back (interrupt dispatch,
//! ticks, shutdown) go through [`FileSystem`], which drops the entries of
//! files whose process died.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::slice;
use serde::{Deserialize, Serialize};
use sos_hal::HAL;
use sos_kernel::{
    DispatchReport, Interrupt, Kernel, MemoryStatus, Priority, ProcessId, ProcessState,
    SequenceNumber, TickReport,
};

use crate::error::FsError;
use crate::snapshot::{Snapshot, SnapshotEntry};

/// Priority given to file processes
pub const FILE_PRIORITY: Priority = 5;

/// Prefix of the kernel process name backing a file
pub const FILE_PROCESS_PREFIX: &str = "file:";

/// Directory entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// File name (unique within the directory)
    pub name: String,
    /// Process owning the file's memory block
    pub pid: ProcessId,
    /// Content length in bytes
    pub len: usize,
    /// Length of the backing block
    pub capacity: usize,
}

/// Metadata returned by [`FileSystem::stat`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub pid: ProcessId,
    pub len: usize,
    pub capacity: usize,
    /// State of the owning process (`None` if the kernel no longer knows it)
    pub process_state: Option<ProcessState>,
}

/// Check a file name for use in the directory.
pub fn validate_name(name: &str) -> Result<(), FsError> {
    if name.is_empty() || name.chars().any(|c| c == '/' || c.is_control()) {
        return Err(FsError::InvalidName(String::from(name)));
    }
    Ok(())
}

/// Flat file system on top of a [`Kernel`].
pub struct FileSystem<H: HAL> {
    kernel: Kernel<H>,
    /// Directory in creation order
    entries: Vec<DirEntry>,
}

impl<H: HAL> FileSystem<H> {
    /// Mount an empty file system on a booted kernel.
    pub fn new(kernel: Kernel<H>) -> Self {
        Self {
            kernel,
            entries: Vec::new(),
        }
    }

    pub fn kernel(&self) -> &Kernel<H> {
        &self.kernel
    }

    /// Give the kernel back, dropping the directory.
    pub fn into_kernel(self) -> Kernel<H> {
        self.kernel
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    fn entry(&self, name: &str) -> Result<&DirEntry, FsError> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| FsError::NotFound(String::from(name)))
    }

    fn log(&self, msg: &str) {
        self.kernel.hal().debug_write(&format!("[vfs] {}", msg));
    }

    fn process_name(name: &str) -> String {
        format!("{}{}", FILE_PROCESS_PREFIX, name)
    }

    /// Drop entries whose process is no longer live.
    fn reap(&mut self) {
        let kernel = &self.kernel;
        let (live, dead): (Vec<DirEntry>, Vec<DirEntry>) =
            core::mem::take(&mut self.entries)
                .into_iter()
                .partition(|e| kernel.state().live_process(e.pid).is_ok());
        self.entries = live;
        for entry in dead {
            self.log(&format!(
                "dropped '{}': process {} terminated",
                entry.name, entry.pid
            ));
        }
    }

    // ========================================================================
    // File operations
    // ========================================================================

    /// Create a file holding `content` in a block of `size` bytes.
    ///
    /// Returns the pid of the process that owns the file.
    pub fn create(&mut self, name: &str, content: &str, size: usize) -> Result<ProcessId, FsError> {
        validate_name(name)?;
        if self.position(name).is_some() {
            return Err(FsError::DuplicateName(String::from(name)));
        }
        if content.len() > size {
            return Err(FsError::FileTooLarge {
                size: content.len(),
                capacity: size,
            });
        }

        let process_name = Self::process_name(name);
        let pid = match self.kernel.create_process(&process_name, size, FILE_PRIORITY) {
            Ok(pid) => pid,
            Err(e) => {
                self.log(&format!("create '{}' failed: {}", name, e));
                return Err(e.into());
            }
        };

        if let Err(e) = self.kernel.write_process_memory(pid, content.as_bytes()) {
            self.kernel.terminate_process(pid)?;
            self.log(&format!("create '{}' rolled back: {}", name, e));
            return Err(e.into());
        }

        self.entries.push(DirEntry {
            name: String::from(name),
            pid,
            len: content.len(),
            capacity: size,
        });
        self.log(&format!(
            "created '{}' (pid {}, {}/{} bytes)",
            name,
            pid,
            content.len(),
            size
        ));
        Ok(pid)
    }

    /// Read a file's content.
    pub fn read(&self, name: &str) -> Result<String, FsError> {
        let entry = self.entry(name)?;
        let bytes = self.kernel.read_process_memory(entry.pid, entry.len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Remove a file and release its memory. Returns the owning pid.
    pub fn remove(&mut self, name: &str) -> Result<ProcessId, FsError> {
        let idx = self
            .position(name)
            .ok_or_else(|| FsError::NotFound(String::from(name)))?;
        let pid = self.entries[idx].pid;

        self.kernel.terminate_process(pid)?;
        self.entries.remove(idx);
        self.log(&format!("removed '{}' (pid {})", name, pid));
        Ok(pid)
    }

    /// Rename a file in place; its position in the listing is unchanged.
    ///
    /// The owning process is renamed through the kernel as well.
    pub fn rename(&mut self, old_name: &str, new_name: &str) -> Result<(), FsError> {
        validate_name(new_name)?;
        let idx = self
            .position(old_name)
            .ok_or_else(|| FsError::NotFound(String::from(old_name)))?;
        if self.position(new_name).is_some() {
            return Err(FsError::DuplicateName(String::from(new_name)));
        }

        let pid = self.entries[idx].pid;
        self.kernel
            .rename_process(pid, &Self::process_name(new_name))?;
        self.entries[idx].name = String::from(new_name);
        self.log(&format!("renamed '{}' -> '{}'", old_name, new_name));
        Ok(())
    }

    // ========================================================================
    // Kernel control
    // ========================================================================

    /// Queue an interrupt on the kernel.
    pub fn raise_interrupt(&mut self, interrupt: Interrupt) -> SequenceNumber {
        self.kernel.raise_interrupt(interrupt)
    }

    /// Run one interrupt dispatch pass.
    pub fn dispatch_interrupts(&mut self) -> DispatchReport {
        let report = self.kernel.dispatch_interrupts();
        self.reap();
        report
    }

    /// Advance the kernel one scheduling step.
    pub fn tick(&mut self) -> TickReport {
        let report = self.kernel.tick();
        self.reap();
        report
    }

    /// Stop the kernel. Every file is dropped with its process.
    ///
    /// Returns the number of processes terminated.
    pub fn shutdown(&mut self) -> usize {
        let terminated = self.kernel.shutdown();
        self.reap();
        terminated
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// File names in creation order.
    pub fn list(&self) -> Names<'_> {
        Names {
            inner: self.entries.iter(),
        }
    }

    pub fn stat(&self, name: &str) -> Result<FileInfo, FsError> {
        let entry = self.entry(name)?;
        Ok(FileInfo {
            name: entry.name.clone(),
            pid: entry.pid,
            len: entry.len,
            capacity: entry.capacity,
            process_state: self.kernel.process(entry.pid).map(|p| p.state()),
        })
    }

    pub fn entries(&self) -> &[DirEntry] {
        &self.entries
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn memory_status(&self) -> MemoryStatus {
        self.kernel.memory_status()
    }

    /// Capture the directory as a snapshot.
    ///
    /// Files whose content can no longer be read are left out.
    pub fn snapshot(&self) -> Snapshot {
        let mut snapshot = Snapshot::new();
        for entry in &self.entries {
            match self.read(&entry.name) {
                Ok(content) => {
                    snapshot.insert(
                        entry.name.clone(),
                        SnapshotEntry {
                            content,
                            size: entry.capacity,
                            process_id: Some(entry.pid),
                        },
                    );
                }
                Err(e) => self.log(&format!("snapshot skips '{}': {}", entry.name, e)),
            }
        }
        snapshot
    }
}

/// Iterator over file names, see [`FileSystem::list`].
#[derive(Clone)]
pub struct Names<'a> {
    inner: slice::Iter<'a, DirEntry>,
}

impl<'a> Iterator for Names<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|e| e.name.as_str())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Names<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use sos_hal_mock::MockHal;
    use sos_kernel::{KernelConfig, KernelError};

    fn fs(memory_size: usize) -> FileSystem<MockHal> {
        FileSystem::new(Kernel::new(
            MockHal::new(),
            KernelConfig::with_memory(memory_size),
        ))
    }

    fn assert_consistent(fs: &FileSystem<MockHal>) {
        let violations = fs.kernel().check_invariants();
        assert!(violations.is_empty(), "{:?}", violations);
        for entry in fs.entries() {
            let process = fs.kernel().process(entry.pid).unwrap();
            assert!(!process.state().is_terminated(), "{} owned by a dead process", entry.name);
            assert_eq!(process.name(), format!("file:{}", entry.name));
            assert_eq!(process.memory_block().unwrap().length, entry.capacity);
        }
    }

    #[test]
    fn test_create_and_read() {
        let mut fs = fs(1024);
        let pid = fs.create("f1", "hello", 16).unwrap();

        assert_eq!(fs.read("f1").unwrap(), "hello");
        let info = fs.stat("f1").unwrap();
        assert_eq!(info.pid, pid);
        assert_eq!(info.len, 5);
        assert_eq!(info.capacity, 16);
        assert_eq!(info.process_state, Some(ProcessState::Ready));
        assert_eq!(fs.kernel().process(pid).unwrap().priority(), FILE_PRIORITY);
        assert!(fs.kernel().hal().has_log_containing("[vfs] created 'f1'"));
        assert_consistent(&fs);
    }

    #[test]
    fn test_rename_then_read() {
        let mut fs = fs(1024);
        fs.create("f1", "hello", 16).unwrap();
        fs.rename("f1", "f2").unwrap();

        assert_eq!(fs.read("f1"), Err(FsError::NotFound("f1".into())));
        assert_eq!(fs.read("f2").unwrap(), "hello");
        assert_consistent(&fs);
    }

    #[test]
    fn test_rename_keeps_position() {
        let mut fs = fs(1024);
        for name in ["a", "b", "c"] {
            fs.create(name, "", 10).unwrap();
        }
        fs.rename("b", "z").unwrap();
        assert_eq!(fs.list().collect::<Vec<_>>(), vec!["a", "z", "c"]);
    }

    #[test]
    fn test_rename_errors() {
        let mut fs = fs(1024);
        fs.create("a", "", 10).unwrap();
        fs.create("b", "", 10).unwrap();

        assert_eq!(fs.rename("x", "y"), Err(FsError::NotFound("x".into())));
        assert_eq!(fs.rename("a", "b"), Err(FsError::DuplicateName("b".into())));
        assert_eq!(fs.rename("a", "d/e"), Err(FsError::InvalidName("d/e".into())));
        assert_eq!(fs.list().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_remove_restores_free_memory() {
        let mut fs = fs(1024);
        let before = fs.memory_status();

        let pid = fs.create("tmp", "scratch", 64).unwrap();
        assert_eq!(fs.memory_status().free, before.free - 64);

        assert_eq!(fs.remove("tmp"), Ok(pid));
        assert_eq!(fs.memory_status(), before);
        assert!(fs.is_empty());
        assert_eq!(
            fs.kernel().process(pid).unwrap().state(),
            ProcessState::Terminated
        );
        assert_eq!(fs.remove("tmp"), Err(FsError::NotFound("tmp".into())));
        assert_consistent(&fs);
    }

    #[test]
    fn test_duplicate_create() {
        let mut fs = fs(1024);
        fs.create("a", "one", 10).unwrap();
        let used = fs.memory_status().used;

        assert_eq!(
            fs.create("a", "two", 10),
            Err(FsError::DuplicateName("a".into()))
        );
        assert_eq!(fs.len(), 1);
        assert_eq!(fs.read("a").unwrap(), "one");
        assert_eq!(fs.memory_status().used, used);
    }

    #[test]
    fn test_invalid_names() {
        let mut fs = fs(1024);
        for name in ["", "a/b", "tab\there", "line\n"] {
            assert_eq!(
                fs.create(name, "", 10),
                Err(FsError::InvalidName(name.into()))
            );
        }
        assert!(fs.kernel().processes().next().is_none());
    }

    #[test]
    fn test_content_larger_than_file() {
        let mut fs = fs(1024);
        assert_eq!(
            fs.create("big", "0123456789", 4),
            Err(FsError::FileTooLarge {
                size: 10,
                capacity: 4
            })
        );
        assert!(fs.is_empty());
    }

    #[test]
    fn test_out_of_memory() {
        let mut fs = fs(100);
        fs.create("a", "", 60).unwrap();
        let err = fs.create("b", "", 50).unwrap_err();
        assert!(err.is_out_of_memory());
        assert_eq!(fs.list().collect::<Vec<_>>(), vec!["a"]);
        assert_consistent(&fs);
    }

    #[test]
    fn test_zero_size_file_is_rejected() {
        let mut fs = fs(100);
        assert_eq!(
            fs.create("empty", "", 0),
            Err(FsError::Kernel(KernelError::InvalidSize))
        );
    }

    #[test]
    fn test_list_is_restartable() {
        let mut fs = fs(1024);
        fs.create("one", "", 10).unwrap();
        fs.create("two", "", 10).unwrap();

        let names = fs.list();
        assert_eq!(names.len(), 2);
        let first: Vec<_> = names.clone().collect();
        let second: Vec<_> = names.collect();
        assert_eq!(first, second);
        assert_eq!(first, vec!["one", "two"]);
    }

    #[test]
    fn test_fault_drops_file() {
        let mut fs = fs(100);
        let pid = fs.create("doomed", "x", 10).unwrap();
        fs.create("kept", "y", 10).unwrap();
        fs.raise_interrupt(Interrupt::Fault { pid });
        fs.dispatch_interrupts();

        assert_eq!(fs.list().collect::<Vec<_>>(), vec!["kept"]);
        assert_eq!(fs.read("doomed"), Err(FsError::NotFound("doomed".into())));
        assert_eq!(fs.remove("doomed"), Err(FsError::NotFound("doomed".into())));
        assert_eq!(fs.memory_status().used, 10);
        assert!(fs.kernel().hal().has_log_containing("dropped 'doomed'"));
        assert_consistent(&fs);

        // The name is free again
        let again = fs.create("doomed", "z", 10).unwrap();
        assert_ne!(again, pid);
        assert_eq!(fs.read("doomed").unwrap(), "z");
        assert_consistent(&fs);
    }

    #[test]
    fn test_fault_during_tick_drops_file() {
        let mut fs = fs(100);
        let pid = fs.create("a", "alpha", 10).unwrap();
        fs.raise_interrupt(Interrupt::Fault { pid });

        fs.tick();
        assert!(fs.is_empty());
        assert!(!fs.contains("a"));
        assert_consistent(&fs);
    }

    #[test]
    fn test_shutdown_empties_directory() {
        let mut fs = fs(100);
        fs.create("a", "", 10).unwrap();
        fs.create("b", "", 10).unwrap();

        assert_eq!(fs.shutdown(), 2);
        assert!(fs.is_empty());
        assert_eq!(fs.memory_status().used, 0);
        assert_consistent(&fs);
    }

    #[test]
    fn test_rename_renames_process() {
        let mut fs = fs(1024);
        let pid = fs.create("f1", "hello", 16).unwrap();
        fs.rename("f1", "f2").unwrap();

        assert_eq!(fs.kernel().process(pid).unwrap().name(), "file:f2");
        assert!(fs
            .kernel()
            .hal()
            .has_log_containing("renamed process 1 to 'file:f2'"));
    }

    #[test]
    fn test_freed_space_is_reused() {
        let mut fs = fs(100);
        fs.create("a", "aaaa", 40).unwrap();
        fs.create("b", "bbbb", 40).unwrap();
        fs.remove("a").unwrap();

        // First fit lands in the hole left by "a"
        let pid = fs.create("c", "cc", 30).unwrap();
        let block = fs.kernel().process(pid).unwrap().memory_block().unwrap();
        assert_eq!(block.start, 0);
        assert_eq!(fs.read("c").unwrap(), "cc");
        assert_eq!(fs.read("b").unwrap(), "bbbb");
        assert_consistent(&fs);
    }

    #[test]
    fn test_files_survive_ticks() {
        let mut fs = fs(100);
        fs.create("a", "alpha", 10).unwrap();
        fs.create("b", "beta", 10).unwrap();
        for _ in 0..5 {
            fs.tick();
        }
        assert_eq!(fs.read("a").unwrap(), "alpha");
        assert_eq!(fs.read("b").unwrap(), "beta");
        assert_consistent(&fs);
    }

    #[test]
    fn test_snapshot() {
        let mut fs = fs(1024);
        let pid = fs.create("notes.txt", "remember", 32).unwrap();

        let snapshot = fs.snapshot();
        assert_eq!(snapshot.len(), 1);
        let entry = snapshot.get("notes.txt").unwrap();
        assert_eq!(entry.content, "remember");
        assert_eq!(entry.size, 32);
        assert_eq!(entry.process_id, Some(pid));
    }
}
