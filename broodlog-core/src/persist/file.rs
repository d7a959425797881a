//! Filesystem snapshot backend.
//!
//! One JSON file, rewritten in place on every save. See the module docs
//! in [`super`] for the recovery and pacing rules.

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use crate::errors::SnapshotError;
use crate::reading::Reading;

use super::{decode_snapshot, write_snapshot, SnapshotStore, YieldHook};

/// Snapshot stored as a single JSON file.
pub struct FileSnapshot {
    path: PathBuf,
}

impl FileSnapshot {
    /// Store backed by `path`. Nothing is touched until the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for FileSnapshot {
    type Error = SnapshotError;

    fn save(
        &mut self,
        readings: &mut dyn Iterator<Item = Reading>,
        pacer: &mut dyn YieldHook,
    ) -> Result<usize, SnapshotError> {
        let file = File::create(&self.path)?;
        let written = write_snapshot(BufWriter::new(file), readings, pacer)?;
        log::debug!(
            "snapshot saved: {} records to {}",
            written,
            self.path.display()
        );
        Ok(written)
    }

    fn load(&mut self) -> Vec<Reading> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                log::warn!("snapshot unreadable, starting with empty history: {err}");
                return Vec::new();
            }
        };
        decode_snapshot(&bytes)
    }

    fn wipe(&mut self) -> Result<(), SnapshotError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn read_raw(&mut self) -> Result<Option<Vec<u8>>, SnapshotError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), SnapshotError> {
        fs::write(&self.path, bytes)?;
        Ok(())
    }
}
