//! Snapshot file on the host file system.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{Context, Result};
use sos_vfs::Snapshot;

/// Where the directory snapshot is kept between sessions.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the saved snapshot; `None` if nothing has been saved yet.
    pub fn load(&self) -> Result<Option<Snapshot>> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read snapshot: {}", self.path.display()))
            }
        };

        let snapshot = Snapshot::from_json(&json)
            .with_context(|| format!("Failed to parse snapshot: {}", self.path.display()))?;
        Ok(Some(snapshot))
    }

    /// Load the saved snapshot, seeding and saving the default one on first run.
    pub fn load_or_seed(&self) -> Result<Snapshot> {
        match self.load()? {
            Some(snapshot) => Ok(snapshot),
            None => {
                let seed = Snapshot::default_seed();
                self.save(&seed)?;
                Ok(seed)
            }
        }
    }

    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let json = snapshot
            .to_json()
            .context("Failed to serialize snapshot")?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write snapshot: {}", self.path.display()))
    }
}
