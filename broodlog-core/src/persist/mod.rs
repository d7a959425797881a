//! Snapshot Persistence
//!
//! History survives reboots as a single JSON array of readings, rewritten
//! in full on every change. No journaling, no temp-file rename: a crash
//! mid-write can truncate the snapshot, and the next load treats the
//! damaged file as empty. That trade was made for flash wear and code
//! size; the history is a rolling observation window, not a ledger.
//!
//! Load is infallible by signature. Missing file, empty file and parse
//! failure all produce an empty history (the parse failure with a
//! diagnostic), so a damaged snapshot can never brick the device. Loaded
//! values are re-rounded to one decimal but otherwise trusted; imported
//! data bypasses the live-path normalizer on purpose.
//!
//! A full snapshot runs to hundreds of records, and on the target a write
//! of that size monopolizes the core for long enough to trip watchdogs.
//! [`SnapshotStore::save`] therefore takes a [`YieldHook`] and invokes it
//! every [`SAVE_YIELD_STRIDE`] records; the hook suspends to system tasks
//! only, no other history mutator can interleave.
//!
//! Two backends: [`FileSnapshot`] for a real filesystem and
//! [`MemorySnapshot`] for tests.

mod file;
mod memory;

pub use file::FileSnapshot;
pub use memory::MemorySnapshot;

use std::io;

use crate::constants::{MAX_DATA_POINTS, SAVE_YIELD_STRIDE};
use crate::errors::SnapshotError;
use crate::reading::Reading;

/// Cooperative suspension point for long snapshot writes.
pub trait YieldHook {
    /// Hand control to pending system duties, then return.
    fn yield_now(&mut self);
}

/// Pacer for contexts with nothing to yield to (tests, host tools).
pub struct NoYield;

impl YieldHook for NoYield {
    fn yield_now(&mut self) {}
}

/// Adapter turning a closure into a [`YieldHook`].
pub struct YieldFn<F: FnMut()>(pub F);

impl<F: FnMut()> YieldHook for YieldFn<F> {
    fn yield_now(&mut self) {
        (self.0)()
    }
}

/// Durable store for the history snapshot.
///
/// `load` cannot fail; see the module docs for the recovery rules. The
/// raw-bytes pair exists for bulk transfer: `read_raw` serves the file
/// verbatim for download, `write_raw` replaces it verbatim on upload,
/// and whatever was uploaded faces the same forgiving decoder on the
/// next load.
pub trait SnapshotStore {
    /// Backend failure type for the write-side operations.
    type Error: core::fmt::Debug;

    /// Overwrite the snapshot with `readings`, yielding to `pacer` every
    /// [`SAVE_YIELD_STRIDE`] records. Returns the number written.
    fn save(
        &mut self,
        readings: &mut dyn Iterator<Item = Reading>,
        pacer: &mut dyn YieldHook,
    ) -> Result<usize, Self::Error>;

    /// Read the snapshot back, applying the never-fatal recovery rules.
    fn load(&mut self) -> Vec<Reading>;

    /// Delete the snapshot. Deleting an absent snapshot is a no-op.
    fn wipe(&mut self) -> Result<(), Self::Error>;

    /// Current snapshot bytes, `None` when no snapshot exists.
    fn read_raw(&mut self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Replace the snapshot bytes verbatim, no validation.
    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;
}

/// Stream `readings` as a JSON array into `out`, pacing every
/// [`SAVE_YIELD_STRIDE`] records.
pub(crate) fn write_snapshot<W: io::Write>(
    mut out: W,
    readings: &mut dyn Iterator<Item = Reading>,
    pacer: &mut dyn YieldHook,
) -> Result<usize, SnapshotError> {
    out.write_all(b"[")?;
    let mut written = 0usize;
    for reading in readings {
        if written > 0 {
            out.write_all(b",")?;
        }
        serde_json::to_writer(&mut out, &reading)?;
        written += 1;
        if written % SAVE_YIELD_STRIDE == 0 {
            pacer.yield_now();
        }
    }
    out.write_all(b"]")?;
    out.flush()?;
    Ok(written)
}

/// Decode snapshot bytes, absorbing every failure into an empty history.
///
/// Keeps the first [`MAX_DATA_POINTS`] records when the snapshot is
/// oversized and re-rounds each value to one decimal.
pub(crate) fn decode_snapshot(bytes: &[u8]) -> Vec<Reading> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Vec::new();
    }
    let parsed: Vec<Reading> = match serde_json::from_slice(bytes) {
        Ok(records) => records,
        Err(err) => {
            log::warn!("snapshot corrupt, starting with empty history: {err}");
            return Vec::new();
        }
    };
    if parsed.len() > MAX_DATA_POINTS {
        log::warn!(
            "snapshot holds {} records, keeping the first {}",
            parsed.len(),
            MAX_DATA_POINTS
        );
    }
    parsed
        .into_iter()
        .take(MAX_DATA_POINTS)
        .map(|r| Reading::new(r.timestamp, r.temperature, r.humidity))
        .collect()
}
