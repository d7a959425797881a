//! Fixed-Capacity Ring Buffer for the Telemetry History
//!
//! ## Overview
//!
//! This module holds the authoritative in-memory history of the device: up
//! to [`MAX_DATA_POINTS`](crate::constants::MAX_DATA_POINTS) timestamped
//! readings, one per hour, covering a full 21-day incubation cycle. The
//! buffer is sized at compile time through const generics; there is no heap
//! allocation and no growth.
//!
//! ## Design Rationale
//!
//! ### Why a Ring Buffer?
//!
//! The history has strict FIFO semantics: once full, every new reading must
//! evict exactly the oldest one. A naive bounded array does that with an
//! O(n) shift per insert; a ring does it in O(1) by moving a write cursor
//! instead of the data. Iteration still yields arrival order, so the two
//! representations are externally indistinguishable, and the ring is the
//! obviously better one at any capacity.
//!
//! Requirements the ring must satisfy:
//! - O(1) insertion, overwriting the oldest reading when full
//! - iteration strictly in arrival order (oldest to newest)
//! - bulk replacement from a persisted snapshot, silently bounded
//! - zero heap allocations
//!
//! ### Memory Layout
//!
//! Storage is an array of `Option<Reading>` so the empty state needs no
//! unsafe initialization:
//!
//! ```text
//! HistoryBuffer<5> after 7 pushes (A..G):
//! ┌─────┬─────┬─────┬─────┬─────┐
//! │  F  │  G  │  C  │  D  │  E  │   ← physical slots
//! └─────┴─────┴─────┴─────┴─────┘
//!               ↑
//!               write_pos = 2 (oldest lives here)
//!
//! Logical view (iteration order): [C, D, E, F, G]
//!
//! Each slot: Option<Reading> = 16 bytes
//! (u32 timestamp + 2 × f32 + discriminant + padding)
//! ```
//!
//! At the production capacity of 504 the buffer occupies ~8 KiB, well
//! within budget for the single statically-owned instance.
//!
//! ## Usage Example
//!
//! ```rust
//! use broodlog_core::buffer::HistoryBuffer;
//! use broodlog_core::reading::Reading;
//!
//! let mut history: HistoryBuffer<504> = HistoryBuffer::new();
//!
//! history.push(Reading::new(1_700_000_000, 99.5, 54.3));
//! history.push(Reading::new(1_700_003_600, 99.6, 54.1));
//!
//! if let Some(latest) = history.last() {
//!     assert_eq!(latest.timestamp, 1_700_003_600);
//! }
//!
//! // Oldest to newest, always
//! let stamps: Vec<u32> = history.iter().map(|r| r.timestamp).collect();
//! assert_eq!(stamps, vec![1_700_000_000, 1_700_003_600]);
//! ```

use crate::reading::Reading;

/// Fixed-capacity FIFO history of timestamped readings.
///
/// ## Type Parameter
///
/// - `N`: capacity, fixed at compile time. Production code uses
///   [`MAX_DATA_POINTS`](crate::constants::MAX_DATA_POINTS); tests shrink it
///   to make eviction scenarios short.
///
/// ## Internal Invariants
///
/// - `write_pos < N` (next write position is always valid)
/// - `len <= N` (never claims more items than capacity)
/// - iteration yields exactly `len` readings in arrival order
///
/// ## Thread Safety
///
/// Not thread-safe, deliberately: all mutation happens inside a single
/// scheduler tick (single-producer model), so no synchronization is carried.
#[derive(Clone)]
pub struct HistoryBuffer<const N: usize> {
    /// Storage array; `Option` keeps initialization safe without unsafe code.
    data: [Option<Reading>; N],

    /// Index where the next write will occur, wrapping at N.
    write_pos: usize,

    /// Current number of valid readings; grows to N and stays there.
    len: usize,
}

impl<const N: usize> HistoryBuffer<N> {
    /// Creates an empty history.
    ///
    /// Const so the production instance can live in a static if the
    /// embedding chooses to place it there.
    pub const fn new() -> Self {
        Self {
            data: [None; N],
            write_pos: 0,
            len: 0,
        }
    }

    /// Appends a reading, evicting the oldest when full.
    ///
    /// This is the only growth path: the scheduler appends at most one
    /// reading per log interval, so the amortized cost per hour is one
    /// array write.
    pub fn push(&mut self, reading: Reading) {
        self.data[self.write_pos] = Some(reading);
        self.write_pos = (self.write_pos + 1) % N;

        if self.len < N {
            self.len += 1;
        }
    }

    /// Number of stored readings.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no readings are stored.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True when the next push will evict.
    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// Capacity in readings.
    pub fn capacity(&self) -> usize {
        N
    }

    /// The most recent reading, if any.
    pub fn last(&self) -> Option<&Reading> {
        if self.is_empty() {
            return None;
        }

        let idx = if self.write_pos == 0 {
            N - 1
        } else {
            self.write_pos - 1
        };

        self.data[idx].as_ref()
    }

    /// Iterates from oldest to newest. This is the snapshot view used by
    /// export, persistence, and the summary engine.
    pub fn iter(&self) -> HistoryIter<'_, N> {
        HistoryIter {
            buffer: self,
            index: 0,
        }
    }

    /// Empties the history. Used by reset and by the corrupt-load fallback.
    pub fn clear(&mut self) {
        self.write_pos = 0;
        self.len = 0;
    }

    /// Bulk-loads the history from a snapshot or an imported file.
    ///
    /// Keeps the first `N` readings in input order and silently drops the
    /// remainder; exceeding capacity is a bounded condition here, never an
    /// error. Returns how many readings were kept.
    pub fn replace<I>(&mut self, readings: I) -> usize
    where
        I: IntoIterator<Item = Reading>,
    {
        self.clear();
        for reading in readings.into_iter().take(N) {
            self.push(reading);
        }
        self.len
    }

    /// Reading at logical index (0 = oldest).
    ///
    /// When not full, logical and physical indices match; when full, the
    /// oldest reading sits at `write_pos` and the index is offset from
    /// there, wrapping at N.
    fn get(&self, index: usize) -> Option<&Reading> {
        if index >= self.len {
            return None;
        }

        let actual_index = if self.len < N {
            index
        } else {
            (self.write_pos + index) % N
        };

        self.data[actual_index].as_ref()
    }
}

impl<const N: usize> Default for HistoryBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the history, oldest to newest.
pub struct HistoryIter<'a, const N: usize> {
    buffer: &'a HistoryBuffer<N>,
    index: usize,
}

impl<'a, const N: usize> Iterator for HistoryIter<'a, N> {
    type Item = &'a Reading;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.buffer.get(self.index)?;
        self.index += 1;
        Some(item)
    }
}

impl<'a, const N: usize> ExactSizeIterator for HistoryIter<'a, N> {
    fn len(&self) -> usize {
        self.buffer.len().saturating_sub(self.index)
    }
}

/// Serializes as a plain JSON array of readings, the exact on-disk and
/// bulk-export shape.
#[cfg(feature = "serde")]
impl<const N: usize> serde::Serialize for HistoryBuffer<N> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;

        let mut seq = serializer.serialize_seq(Some(self.len))?;
        for reading in self.iter() {
            seq.serialize_element(reading)?;
        }
        seq.end()
    }
}
