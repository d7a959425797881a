//! Update Scheduling State Machine
//!
//! Decides, once per tick, whether the device should poll the sensor and
//! whether it should attempt a history log. The tick itself can arrive at
//! any frequency (firmware loops call it every few milliseconds); all rate
//! limiting lives here, in seconds of wall-clock time.
//!
//! Two independent cadences:
//! - **Poll** every [`SENSOR_POLL_SECS`]: refreshes the live reading only.
//!   The first tick polls immediately so a freshly booted device has data
//!   before its first scheduled minute elapses.
//! - **Log** every [`LOG_INTERVAL_SECS`] measured from the last *attempt*
//!   (successful or not), or immediately if never attempted. Gated by the
//!   clock guard: below the sync floor nothing is attempted or recorded;
//!   beyond the far-future bound the attempt is recorded but skipped.
//!
//! A manual log (reset, retroactive start change) arms a debounce that
//! suppresses exactly one subsequent automatic log, so a manual point and
//! the next due automatic point cannot land at nearly the same timestamp.
//!
//! Wall-clock regressions (NTP stepping the clock backwards) re-base both
//! cadences: the next tick is treated as due rather than waiting out an
//! interval measured from a future timestamp.
//!
//! The scheduler only decides; it never touches the sensor, the history,
//! or storage. The device orchestrator acts on the returned decision, which
//! keeps every transition testable with plain numbers.

use crate::constants::{LOG_INTERVAL_SECS, SENSOR_POLL_SECS};
use crate::time::{ClockStatus, EpochSeconds};

/// What the current tick should do about history logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDecision {
    /// Due: run the normalizer over live values and append if valid.
    Attempt,
    /// Due, but a manual log just happened; this one cycle is suppressed.
    Debounced,
    /// Clock has not synced; nothing attempted, nothing recorded.
    AwaitingSync,
    /// Clock reads beyond the plausible maximum; skipped, attempt recorded.
    FarFuture,
    /// Not yet due.
    NotDue,
}

/// Poll/log cadence state. Plain data, no I/O.
#[derive(Debug, Clone)]
pub struct Scheduler {
    last_poll: Option<EpochSeconds>,
    /// Epoch of the last log attempt; 0 = never attempted.
    last_log_attempt: EpochSeconds,
    skip_next_auto_log: bool,
}

/// Due when `interval` has elapsed since `last`, or when the clock has
/// regressed past `last` entirely.
fn due_since(last: EpochSeconds, now: EpochSeconds, interval: u32) -> bool {
    now < last || now - last >= interval
}

impl Scheduler {
    /// Fresh state: first tick polls, first sane tick attempts a log.
    pub fn new() -> Self {
        Self {
            last_poll: None,
            last_log_attempt: 0,
            skip_next_auto_log: false,
        }
    }

    /// Should this tick refresh the live reading?
    pub fn poll_due(&self, now: EpochSeconds) -> bool {
        match self.last_poll {
            None => true,
            Some(last) => due_since(last, now, SENSOR_POLL_SECS),
        }
    }

    /// Record that a poll cycle ran at `now` (whether or not the read
    /// produced a valid pair).
    pub fn mark_polled(&mut self, now: EpochSeconds) {
        self.last_poll = Some(now);
    }

    /// Decide this tick's log action and update cadence state accordingly.
    ///
    /// Every decision except [`LogDecision::AwaitingSync`] and
    /// [`LogDecision::NotDue`] counts as an attempt: the next one comes an
    /// interval later regardless of whether the device managed to append.
    pub fn decide_log(&mut self, now: EpochSeconds) -> LogDecision {
        let status = ClockStatus::of(now);
        if status == ClockStatus::AwaitingSync {
            return LogDecision::AwaitingSync;
        }

        let due = self.last_log_attempt == 0
            || due_since(self.last_log_attempt, now, LOG_INTERVAL_SECS);
        if !due {
            return LogDecision::NotDue;
        }

        if self.skip_next_auto_log {
            self.skip_next_auto_log = false;
            self.last_log_attempt = now;
            return LogDecision::Debounced;
        }

        self.last_log_attempt = now;
        if status == ClockStatus::FarFuture {
            return LogDecision::FarFuture;
        }
        LogDecision::Attempt
    }

    /// Record a manual log at `now`: arm the debounce and restart the
    /// automatic interval from here.
    pub fn note_manual_log(&mut self, now: EpochSeconds) {
        self.skip_next_auto_log = true;
        self.last_log_attempt = now;
    }

    /// Forget the log cadence so the next sane tick attempts immediately.
    ///
    /// Used when a manual action cleared the history but could not log a
    /// replacement point (invalid sensor): recovery should not wait out a
    /// full interval.
    pub fn clear_log_schedule(&mut self) {
        self.last_log_attempt = 0;
        self.skip_next_auto_log = false;
    }

    /// Epoch of the last log attempt, if any.
    pub fn last_log_attempt(&self) -> Option<EpochSeconds> {
        (self.last_log_attempt != 0).then_some(self.last_log_attempt)
    }

    /// True while one automatic log remains suppressed.
    pub fn debounce_pending(&self) -> bool {
        self.skip_next_auto_log
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
