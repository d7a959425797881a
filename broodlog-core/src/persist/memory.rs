//! In-memory snapshot backend for tests and host-side tooling.

use std::io;

use crate::errors::SnapshotError;
use crate::reading::Reading;

use super::{decode_snapshot, write_snapshot, SnapshotStore, YieldHook};

/// Snapshot held in a byte buffer. Encodes and decodes exactly like the
/// file backend, plus a switch for injecting write failures.
#[derive(Debug, Default)]
pub struct MemorySnapshot {
    bytes: Option<Vec<u8>>,
    fail_writes: bool,
}

impl MemorySnapshot {
    /// Empty store, no snapshot present.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that already holds `json` as its snapshot bytes.
    pub fn preloaded(json: &str) -> Self {
        Self {
            bytes: Some(json.as_bytes().to_vec()),
            fail_writes: false,
        }
    }

    /// Make every subsequent write fail.
    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Current snapshot bytes for inspection.
    pub fn contents(&self) -> Option<&[u8]> {
        self.bytes.as_deref()
    }

    fn check_writable(&self) -> Result<(), SnapshotError> {
        if self.fail_writes {
            return Err(SnapshotError::Io(io::Error::from(
                io::ErrorKind::PermissionDenied,
            )));
        }
        Ok(())
    }
}

impl SnapshotStore for MemorySnapshot {
    type Error = SnapshotError;

    fn save(
        &mut self,
        readings: &mut dyn Iterator<Item = Reading>,
        pacer: &mut dyn YieldHook,
    ) -> Result<usize, SnapshotError> {
        self.check_writable()?;
        let mut buf = Vec::new();
        let written = write_snapshot(&mut buf, readings, pacer)?;
        self.bytes = Some(buf);
        Ok(written)
    }

    fn load(&mut self) -> Vec<Reading> {
        match &self.bytes {
            None => Vec::new(),
            Some(bytes) => decode_snapshot(bytes),
        }
    }

    fn wipe(&mut self) -> Result<(), SnapshotError> {
        self.check_writable()?;
        self.bytes = None;
        Ok(())
    }

    fn read_raw(&mut self) -> Result<Option<Vec<u8>>, SnapshotError> {
        Ok(self.bytes.clone())
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), SnapshotError> {
        self.check_writable()?;
        self.bytes = Some(bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::NoYield;
    use super::*;

    #[test]
    fn behaves_like_the_file_backend() {
        let mut store = MemorySnapshot::new();
        assert!(store.load().is_empty());
        assert_eq!(store.read_raw().unwrap(), None);

        let readings = vec![Reading::new(7, 99.5, 54.3)];
        store
            .save(&mut readings.iter().copied(), &mut NoYield)
            .unwrap();
        assert_eq!(store.load(), readings);

        store.wipe().unwrap();
        assert!(store.contents().is_none());
    }

    #[test]
    fn preloaded_bytes_feed_the_decoder() {
        let mut store = MemorySnapshot::preloaded(
            r#"[{"timestamp":3,"temperature":98.6,"humidity":45.0}]"#,
        );
        assert_eq!(store.load(), vec![Reading::new(3, 98.6, 45.0)]);
    }

    #[test]
    fn injected_failures_hit_every_write_path() {
        let mut store = MemorySnapshot::preloaded("[]");
        store.fail_writes(true);

        assert!(store
            .save(&mut core::iter::empty(), &mut NoYield)
            .is_err());
        assert!(store.wipe().is_err());
        assert!(store.write_raw(b"[]").is_err());

        // Reads keep working and the old bytes survive.
        assert_eq!(store.read_raw().unwrap().unwrap(), b"[]");
    }
}
