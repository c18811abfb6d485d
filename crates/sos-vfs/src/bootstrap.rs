//! File system bootstrap.
//!
//! Populates a freshly mounted [`FileSystem`] from a [`Snapshot`]. Each
//! entry goes through `FileSystem::create`, so restored files get new
//! processes and fresh memory blocks.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use sos_hal::HAL;

use crate::error::FsError;
use crate::fs::FileSystem;
use crate::snapshot::Snapshot;

/// Outcome of [`bootstrap`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Files restored, in restore order
    pub restored: Vec<String>,
    /// Files that could not be restored
    pub failed: Vec<(String, FsError)>,
}

impl BootstrapReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Restore every file in `snapshot`.
///
/// A file that cannot be restored is recorded in the report and skipped;
/// the rest of the snapshot is still loaded.
pub fn bootstrap<H: HAL>(fs: &mut FileSystem<H>, snapshot: &Snapshot) -> BootstrapReport {
    let mut report = BootstrapReport::default();

    for (name, entry) in snapshot.iter() {
        // Saved sizes may predate the content they describe
        let size = entry.size.max(entry.content.len());
        match fs.create(name, &entry.content, size) {
            Ok(_) => report.restored.push(String::from(name)),
            Err(e) => report.failed.push((String::from(name), e)),
        }
    }

    fs.kernel().hal().debug_write(&format!(
        "[vfs] bootstrap: {} restored, {} failed",
        report.restored.len(),
        report.failed.len()
    ));
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotEntry;
    use sos_hal_mock::MockHal;
    use sos_kernel::{Kernel, KernelConfig, KernelError};

    fn fs(memory_size: usize) -> FileSystem<MockHal> {
        FileSystem::new(Kernel::new(
            MockHal::new(),
            KernelConfig::with_memory(memory_size),
        ))
    }

    fn entry(content: &str, size: usize) -> SnapshotEntry {
        SnapshotEntry {
            content: content.into(),
            size,
            process_id: None,
        }
    }

    #[test]
    fn test_bootstrap_default_seed() {
        let mut fs = fs(1024);
        let report = bootstrap(&mut fs, &Snapshot::default_seed());

        assert!(report.is_complete());
        assert_eq!(report.restored, ["README.txt"]);
        assert_eq!(fs.read("README.txt").unwrap(), "Welcome to SimpleFS!");
        assert_eq!(fs.stat("README.txt").unwrap().capacity, 20);
        assert!(fs.kernel().hal().has_log_containing("bootstrap: 1 restored"));
    }

    #[test]
    fn test_bootstrap_grows_undersized_entries() {
        let mut fs = fs(1024);
        let mut snapshot = Snapshot::new();
        snapshot.insert("short.txt".into(), entry("longer than two", 2));

        let report = bootstrap(&mut fs, &snapshot);
        assert!(report.is_complete());
        assert_eq!(fs.stat("short.txt").unwrap().capacity, 15);
    }

    #[test]
    fn test_bootstrap_collects_failures() {
        let mut fs = fs(100);
        let mut snapshot = Snapshot::new();
        snapshot.insert("a.txt".into(), entry("a", 60));
        snapshot.insert("b.txt".into(), entry("b", 60));
        snapshot.insert("bad/name".into(), entry("c", 10));
        snapshot.insert("empty".into(), entry("", 0));

        let report = bootstrap(&mut fs, &snapshot);
        assert_eq!(report.restored, ["a.txt"]);
        assert_eq!(report.failed.len(), 3);
        assert!(report.failed.iter().any(|(name, e)| name == "b.txt" && e.is_out_of_memory()));
        assert!(report
            .failed
            .contains(&("bad/name".into(), FsError::InvalidName("bad/name".into()))));
        assert!(report
            .failed
            .contains(&("empty".into(), FsError::Kernel(KernelError::InvalidSize))));
        assert_eq!(fs.len(), 1);
    }

    #[test]
    fn test_snapshot_survives_restart() {
        let mut first = fs(1024);
        first.create("x.txt", "x marks", 16).unwrap();
        first.create("y.txt", "why", 8).unwrap();
        let json = first.snapshot().to_json().unwrap();

        let mut second = fs(1024);
        let report = bootstrap(&mut second, &Snapshot::from_json(&json).unwrap());
        assert!(report.is_complete());
        assert_eq!(second.read("x.txt").unwrap(), "x marks");
        assert_eq!(second.read("y.txt").unwrap(), "why");
        assert_eq!(second.stat("x.txt").unwrap().capacity, 16);
    }
}
