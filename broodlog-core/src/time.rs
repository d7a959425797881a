//! Time handling for the telemetry core
//!
//! The device depends on an external wall-clock source (NTP-class) that may
//! not have synced yet at boot, and that can glitch into the far future.
//! Everything here treats time as plain epoch seconds and classifies it
//! against fixed plausibility bounds instead of trusting it.

use crate::constants::{MAX_REASONABLE_TIMESTAMP, TIME_SYNC_FLOOR};

/// Seconds since the Unix epoch. 0 doubles as "unknown" throughout the crate.
pub type EpochSeconds = u32;

/// Classification of a wall-clock value against the plausibility bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockStatus {
    /// Below [`TIME_SYNC_FLOOR`]; the time source has not delivered real
    /// time yet. Logging is suppressed, live display still works.
    AwaitingSync,
    /// Within the plausible range; safe to stamp readings with.
    Synced,
    /// Above [`MAX_REASONABLE_TIMESTAMP`]; clock corruption, not data.
    FarFuture,
}

impl ClockStatus {
    /// Classify an epoch value.
    pub fn of(now: EpochSeconds) -> Self {
        if now < TIME_SYNC_FLOOR {
            ClockStatus::AwaitingSync
        } else if now > MAX_REASONABLE_TIMESTAMP {
            ClockStatus::FarFuture
        } else {
            ClockStatus::Synced
        }
    }

    /// True when the value can be used to stamp or schedule readings.
    pub fn is_synced(self) -> bool {
        self == ClockStatus::Synced
    }
}

/// Source of wall-clock time for the device.
pub trait Clock {
    /// Current time in epoch seconds. May legitimately return implausible
    /// values before the underlying source syncs; callers classify with
    /// [`ClockStatus::of`].
    fn now(&self) -> EpochSeconds;
}

/// Fixed time source for tests and examples.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: EpochSeconds,
}

impl FixedClock {
    /// Create a clock pinned to the given epoch.
    pub fn new(now: EpochSeconds) -> Self {
        Self { now }
    }

    /// Pin the clock to a new epoch.
    pub fn set(&mut self, now: EpochSeconds) {
        self.now = now;
    }

    /// Move the clock forward.
    pub fn advance(&mut self, secs: u32) {
        self.now = self.now.saturating_add(secs);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> EpochSeconds {
        self.now
    }
}

/// Host wall clock (requires `std`).
#[cfg(feature = "std")]
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

#[cfg(feature = "std")]
impl Clock for SystemClock {
    fn now(&self) -> EpochSeconds {
        use std::time::{SystemTime, UNIX_EPOCH};

        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as EpochSeconds
    }
}

/// Shared-handle manual clock for driving a whole device from a test.
///
/// Clones observe the same underlying time, so one handle can be moved into
/// the device while the test keeps another to advance it.
#[cfg(feature = "std")]
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: std::sync::Arc<core::sync::atomic::AtomicU32>,
}

#[cfg(feature = "std")]
impl ManualClock {
    /// Create a manual clock starting at the given epoch.
    pub fn new(now: EpochSeconds) -> Self {
        Self {
            now: std::sync::Arc::new(core::sync::atomic::AtomicU32::new(now)),
        }
    }

    /// Pin all handles to a new epoch.
    pub fn set(&self, now: EpochSeconds) {
        self.now.store(now, core::sync::atomic::Ordering::Relaxed);
    }

    /// Move all handles forward.
    pub fn advance(&self, secs: u32) {
        self.now
            .fetch_add(secs, core::sync::atomic::Ordering::Relaxed);
    }
}

#[cfg(feature = "std")]
impl Clock for ManualClock {
    fn now(&self) -> EpochSeconds {
        self.now.load(core::sync::atomic::Ordering::Relaxed)
    }
}
