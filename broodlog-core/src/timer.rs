//! Incubation Timer State
//!
//! Tracks the declared incubation start epoch. Persisted independently of
//! the telemetry history (settings store, `timer` namespace) because the
//! two survive different events: a snapshot wipe keeps the timer, a timer
//! change wipes the snapshot.
//!
//! 0 is reserved for "uninitialized". Provisioning is deferred until the
//! wall clock is plausible, so an unsynced boot can never persist a 1970
//! start epoch; until then clients see the sync placeholder text.
//!
//! Mutations update the in-memory value first and then persist, returning
//! the store's error for logging: a failed write leaves the device running
//! on in-memory state, re-persisted at the next mutation.

use core::fmt::Write;

use crate::constants::{SECONDS_PER_DAY, SECONDS_PER_HOUR, SECONDS_PER_MINUTE};
use crate::settings::{KvStore, KEY_START_TIME, NS_TIMER};
use crate::time::{ClockStatus, EpochSeconds};

/// Elapsed-time placeholder shown before the clock syncs or the timer is
/// provisioned.
pub const WAITING_FOR_SYNC: &str = "Waiting for time sync...";

/// The incubation start epoch and its derived displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncubationTimer {
    start: EpochSeconds,
}

impl IncubationTimer {
    /// Timer with a known start epoch (0 = uninitialized).
    pub const fn from_start(start: EpochSeconds) -> Self {
        Self { start }
    }

    /// Load the persisted start epoch; absent means uninitialized.
    pub fn load<K: KvStore>(kv: &K) -> Self {
        Self {
            start: kv.get_u32(NS_TIMER, KEY_START_TIME).unwrap_or(0),
        }
    }

    /// The raw start epoch; 0 when uninitialized.
    pub fn start(&self) -> EpochSeconds {
        self.start
    }

    /// True once a start epoch has been set.
    pub fn is_started(&self) -> bool {
        self.start != 0
    }

    /// Provision the start epoch if none exists yet.
    ///
    /// Returns `Ok(true)` when `now` was adopted, `Ok(false)` when a start
    /// already existed. On a write error the in-memory start is already
    /// updated; the caller logs and continues.
    pub fn initialize_if_absent<K: KvStore>(
        &mut self,
        kv: &mut K,
        now: EpochSeconds,
    ) -> Result<bool, K::Error> {
        if self.is_started() {
            return Ok(false);
        }
        self.start = now;
        kv.put_u32(NS_TIMER, KEY_START_TIME, now)?;
        Ok(true)
    }

    /// Restart the timer at `now`.
    ///
    /// Callers are responsible for the paired side effects (clearing the
    /// history and deleting the snapshot); this only moves the epoch. The
    /// in-memory value updates even when the write fails.
    pub fn reset<K: KvStore>(&mut self, kv: &mut K, now: EpochSeconds) -> Result<(), K::Error> {
        self.start = now;
        kv.put_u32(NS_TIMER, KEY_START_TIME, now)
    }

    /// Declare that incubation started `offset_secs` before `now`.
    ///
    /// Saturates at epoch 0: an offset reaching before 1970 leaves the
    /// timer uninitialized, to be re-provisioned on the next sane tick.
    pub fn set_retroactive<K: KvStore>(
        &mut self,
        kv: &mut K,
        now: EpochSeconds,
        offset_secs: u32,
    ) -> Result<(), K::Error> {
        self.start = now.saturating_sub(offset_secs);
        kv.put_u32(NS_TIMER, KEY_START_TIME, self.start)
    }

    /// Human-readable elapsed time since the start epoch.
    ///
    /// The largest two non-zero units of days/hours/minutes, second unit
    /// zero-padded: `"3D 04H"`, `"4H 02M"`, `"45M"`. Before the clock syncs
    /// (or before provisioning) this is [`WAITING_FOR_SYNC`].
    pub fn elapsed_text(&self, now: EpochSeconds) -> heapless::String<32> {
        let mut out = heapless::String::new();

        if !self.is_started() || ClockStatus::of(now) == ClockStatus::AwaitingSync {
            let _ = out.push_str(WAITING_FOR_SYNC);
            return out;
        }

        let elapsed = now.saturating_sub(self.start);
        let days = elapsed / SECONDS_PER_DAY;
        let hours = (elapsed / SECONDS_PER_HOUR) % 24;
        let minutes = (elapsed / SECONDS_PER_MINUTE) % 60;

        let _ = if days > 0 {
            write!(out, "{days}D {hours:02}H")
        } else if hours > 0 {
            write!(out, "{hours}H {minutes:02}M")
        } else {
            write!(out, "{minutes}M")
        };
        out
    }
}

/// Offset in seconds for a retroactive start, saturating instead of
/// overflowing on absurd day counts.
pub fn retro_offset(days: u32, hours: u32) -> u32 {
    days.saturating_mul(SECONDS_PER_DAY)
        .saturating_add(hours.saturating_mul(SECONDS_PER_HOUR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TIME_SYNC_FLOOR;

    const NOW: EpochSeconds = 1_700_000_000;

    #[test]
    fn uninitialized_shows_placeholder() {
        let timer = IncubationTimer::from_start(0);
        assert!(!timer.is_started());
        assert_eq!(timer.elapsed_text(NOW).as_str(), WAITING_FOR_SYNC);
    }

    #[test]
    fn unsynced_clock_shows_placeholder_even_when_started() {
        let timer = IncubationTimer::from_start(NOW);
        assert_eq!(
            timer.elapsed_text(TIME_SYNC_FLOOR - 1).as_str(),
            WAITING_FOR_SYNC
        );
    }

    #[test]
    fn formats_days_and_hours() {
        let start = NOW - (3 * SECONDS_PER_DAY + 4 * SECONDS_PER_HOUR + 22 * 60);
        let timer = IncubationTimer::from_start(start);
        assert_eq!(timer.elapsed_text(NOW).as_str(), "3D 04H");
    }

    #[test]
    fn formats_hours_and_minutes() {
        let start = NOW - (4 * SECONDS_PER_HOUR + 2 * 60);
        let timer = IncubationTimer::from_start(start);
        assert_eq!(timer.elapsed_text(NOW).as_str(), "4H 02M");
    }

    #[test]
    fn formats_minutes_only() {
        let timer = IncubationTimer::from_start(NOW - 45 * 60);
        assert_eq!(timer.elapsed_text(NOW).as_str(), "45M");

        let timer = IncubationTimer::from_start(NOW);
        assert_eq!(timer.elapsed_text(NOW).as_str(), "0M");
    }

    #[test]
    fn offset_saturates() {
        assert_eq!(retro_offset(3, 4), 3 * SECONDS_PER_DAY + 4 * SECONDS_PER_HOUR);
        assert_eq!(retro_offset(u32::MAX, 1), u32::MAX);
    }

    #[cfg(feature = "std")]
    mod persistence {
        use super::*;
        use crate::settings::MemoryKv;

        #[test]
        fn initialize_only_once() {
            let mut kv = MemoryKv::new();
            let mut timer = IncubationTimer::load(&kv);

            assert!(timer.initialize_if_absent(&mut kv, NOW).unwrap());
            assert!(!timer.initialize_if_absent(&mut kv, NOW + 100).unwrap());
            assert_eq!(timer.start(), NOW);

            // Survives a reload
            assert_eq!(IncubationTimer::load(&kv).start(), NOW);
        }

        #[test]
        fn reset_moves_start() {
            let mut kv = MemoryKv::new();
            let mut timer = IncubationTimer::from_start(NOW);

            timer.reset(&mut kv, NOW + 500).unwrap();
            assert_eq!(timer.start(), NOW + 500);
            assert_eq!(IncubationTimer::load(&kv).start(), NOW + 500);
        }

        #[test]
        fn retroactive_subtracts_offset() {
            let mut kv = MemoryKv::new();
            let mut timer = IncubationTimer::from_start(0);

            let offset = retro_offset(3, 4);
            timer.set_retroactive(&mut kv, NOW, offset).unwrap();
            assert_eq!(timer.start(), NOW - offset);
            assert_eq!(timer.elapsed_text(NOW).as_str(), "3D 04H");
        }

        #[test]
        fn retroactive_saturates_to_uninitialized() {
            let mut kv = MemoryKv::new();
            let mut timer = IncubationTimer::from_start(NOW);

            timer.set_retroactive(&mut kv, NOW, u32::MAX).unwrap();
            assert_eq!(timer.start(), 0);
            assert!(!timer.is_started());
        }

        #[test]
        fn failed_write_still_updates_memory() {
            let mut kv = MemoryKv::new();
            let mut timer = IncubationTimer::from_start(NOW);
            kv.fail_writes(true);

            assert!(timer.reset(&mut kv, NOW + 42).is_err());
            assert_eq!(timer.start(), NOW + 42);
        }
    }
}
