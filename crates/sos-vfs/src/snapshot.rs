//! Directory snapshots.
//!
//! A snapshot is a JSON object mapping each file name to its content, its
//! size, and the pid that owned it when the snapshot was taken:
//!
//! ```json
//! {
//!   "README.txt": { "content": "Welcome to SimpleFS!", "size": 20, "process_id": null }
//! }
//! ```
//!
//! Pids are informational only. Restoring a snapshot creates new processes.

use alloc::collections::BTreeMap;
use alloc::string::String;
use serde::{Deserialize, Serialize};
use sos_kernel::ProcessId;

/// Name of the file seeded into an empty snapshot
pub const SEED_FILE_NAME: &str = "README.txt";

/// Content of the seeded file
pub const SEED_FILE_CONTENT: &str = "Welcome to SimpleFS!";

/// One file in a snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub content: String,
    /// Bytes to reserve for the file
    pub size: usize,
    #[serde(default)]
    pub process_id: Option<ProcessId>,
}

/// Serializable image of a directory, keyed by file name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    files: BTreeMap<String, SnapshotEntry>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot used on first boot.
    pub fn default_seed() -> Self {
        let mut snapshot = Self::new();
        snapshot.insert(
            String::from(SEED_FILE_NAME),
            SnapshotEntry {
                content: String::from(SEED_FILE_CONTENT),
                size: SEED_FILE_CONTENT.len(),
                process_id: None,
            },
        );
        snapshot
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Add or replace a file.
    pub fn insert(&mut self, name: String, entry: SnapshotEntry) -> Option<SnapshotEntry> {
        self.files.insert(name, entry)
    }

    pub fn get(&self, name: &str) -> Option<&SnapshotEntry> {
        self.files.get(name)
    }

    /// Files in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SnapshotEntry)> {
        self.files.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_seed() {
        let seed = Snapshot::default_seed();
        assert_eq!(seed.len(), 1);
        let readme = seed.get("README.txt").unwrap();
        assert_eq!(readme.content, "Welcome to SimpleFS!");
        assert_eq!(readme.size, 20);
        assert_eq!(readme.process_id, None);
    }

    #[test]
    fn test_parse_saved_file() {
        let json = r#"{
            "README.txt": { "content": "Welcome to SimpleFS!", "size": 20, "process_id": null },
            "a.txt": { "content": "hi", "size": 2, "process_id": 7 },
            "b.txt": { "content": "", "size": 0 }
        }"#;
        let snapshot = Snapshot::from_json(json).unwrap();

        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.get("a.txt").unwrap().process_id, Some(ProcessId(7)));
        assert_eq!(snapshot.get("b.txt").unwrap().process_id, None);
        let names: alloc::vec::Vec<_> = snapshot.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["README.txt", "a.txt", "b.txt"]);
    }

    #[test]
    fn test_json_shape() {
        let json = Snapshot::default_seed().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["README.txt"]["size"], 20);
        assert!(value["README.txt"]["process_id"].is_null());
        assert_eq!(Snapshot::from_json(&json).unwrap(), Snapshot::default_seed());
    }

    #[test]
    fn test_malformed_json() {
        assert!(Snapshot::from_json("[1, 2]").is_err());
        assert!(Snapshot::from_json(r#"{"a": {"content": 1}}"#).is_err());
    }
}
