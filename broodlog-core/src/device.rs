//! Device Orchestration
//!
//! [`Device`] owns the whole incubator state and wires the pieces
//! together behind four seams: a [`Clock`], a [`Sensor`], a
//! [`SnapshotStore`] and a [`KvStore`]. Firmware hands in the real
//! peripherals; tests hand in scripted doubles and drive time by hand.
//!
//! ## Tick walkthrough
//!
//! `tick()` is called from the outer loop as often as the caller likes;
//! everything is rate limited internally:
//!
//! ```text
//!   tick(now)
//!     ├─ poll due?            no → idle report
//!     ├─ sample sensor        valid pair → live reading replaced
//!     ├─ provision timer      once, first tick with a plausible clock
//!     ├─ log decision         due + sane clock → append live + save
//!     └─ push state           every poll cycle, all attached clients
//! ```
//!
//! Manual actions (reset, retroactive start, threshold changes, client
//! attach) run between ticks, never concurrently with one; each performs
//! its own push so dashboards observe the change immediately.
//!
//! Nothing in here aborts: sensor faults, clock anomalies and store
//! write failures are logged and survived, with in-memory state carrying
//! on and the next scheduled cycle retrying.

use crate::buffer::HistoryBuffer;
use crate::constants::MAX_DATA_POINTS;
use crate::persist::{NoYield, SnapshotStore, YieldHook};
use crate::reading::Measurement;
use crate::scheduler::{LogDecision, Scheduler};
use crate::sensor::Sensor;
use crate::settings::{KvStore, Thresholds};
use crate::sync::{Broadcaster, SyncMessage, SyncSink};
use crate::time::{Clock, ClockStatus, EpochSeconds};
use crate::timer::{self, IncubationTimer};

/// What one tick did, for callers that trace or test the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// A poll cycle ran this tick.
    pub polled: bool,
    /// The log decision taken; `NotDue` on idle ticks.
    pub log: LogDecision,
    /// A point was appended to the history.
    pub logged: bool,
    /// Clients that received the post-poll push.
    pub synced: usize,
}

impl TickReport {
    const IDLE: Self = Self {
        polled: false,
        log: LogDecision::NotDue,
        logged: false,
        synced: 0,
    };
}

/// The incubator core: history, live reading, timer, thresholds,
/// scheduler and attached clients, behind explicit peripheral seams.
pub struct Device<C, S, P, K> {
    clock: C,
    sensor: S,
    snapshots: P,
    kv: K,
    pacer: Box<dyn YieldHook>,
    history: HistoryBuffer<MAX_DATA_POINTS>,
    live: Option<Measurement>,
    timer: IncubationTimer,
    thresholds: Thresholds,
    scheduler: Scheduler,
    clients: Broadcaster,
}

impl<C, S, P, K> Device<C, S, P, K>
where
    C: Clock,
    S: Sensor,
    P: SnapshotStore,
    K: KvStore,
{
    /// Bring the device up from whatever the stores hold.
    ///
    /// Never fails: a damaged snapshot loads as empty, missing settings
    /// fall back to defaults (and are written back), and the timer stays
    /// unprovisioned until the first tick with a plausible clock.
    pub fn boot(clock: C, sensor: S, mut snapshots: P, mut kv: K) -> Self {
        let mut history = HistoryBuffer::new();
        let restored = history.replace(snapshots.load());
        if restored > 0 {
            log::info!("restored {restored} history records");
        }

        let thresholds = Thresholds::load(&kv);
        if let Err(err) = thresholds.ensure_persisted(&mut kv) {
            log::warn!("could not persist default thresholds: {err:?}");
        }
        let timer = IncubationTimer::load(&kv);

        Self {
            clock,
            sensor,
            snapshots,
            kv,
            pacer: Box::new(NoYield),
            history,
            live: None,
            timer,
            thresholds,
            scheduler: Scheduler::new(),
            clients: Broadcaster::new(),
        }
    }

    /// Replace the no-op save pacer. Firmware hands control to system
    /// tasks here; the default suits hosts with preemption.
    pub fn set_pacer(&mut self, pacer: Box<dyn YieldHook>) {
        self.pacer = pacer;
    }

    /// One cooperative scheduler pass. Safe to call at any frequency.
    pub fn tick(&mut self) -> TickReport {
        let now = self.clock.now();
        if !self.scheduler.poll_due(now) {
            return TickReport::IDLE;
        }
        self.scheduler.mark_polled(now);
        self.poll_sensor();
        self.provision_timer(now);

        let decision = self.scheduler.decide_log(now);
        let logged = match decision {
            LogDecision::Attempt => self.append_live_point(now),
            LogDecision::Debounced => {
                log::debug!("automatic log suppressed after manual log");
                false
            }
            LogDecision::AwaitingSync => {
                log::debug!("history log deferred until time sync");
                false
            }
            LogDecision::FarFuture => {
                log::warn!("clock reports an implausible future time; skipping data point");
                false
            }
            LogDecision::NotDue => false,
        };
        let synced = self.push_state(now);

        TickReport {
            polled: true,
            log: decision,
            logged,
            synced,
        }
    }

    /// Restart incubation: timer to now, history and snapshot cleared,
    /// one fresh point if the sensor cooperates. Returns the number of
    /// clients that saw the resulting push.
    pub fn reset(&mut self) -> usize {
        let now = self.clock.now();
        log::info!("timer reset requested");
        if let Err(err) = self.timer.reset(&mut self.kv, now) {
            log::warn!("could not persist incubation start: {err:?}");
        }
        self.relog_after_manual_change(now)
    }

    /// Backdate the incubation start by whole `days` and `hours`, with
    /// the same history invalidation as [`Device::reset`].
    pub fn set_start_retroactive(&mut self, days: u32, hours: u32) -> usize {
        let now = self.clock.now();
        let offset = timer::retro_offset(days, hours);
        if let Err(err) = self.timer.set_retroactive(&mut self.kv, now, offset) {
            log::warn!("could not persist incubation start: {err:?}");
        }
        log::info!(
            "incubation start moved to {} ({offset} seconds back)",
            self.timer.start()
        );
        self.relog_after_manual_change(now)
    }

    /// Persist and adopt a new high-temperature alert level, pushing the
    /// change to attached clients.
    pub fn set_temperature_alert(&mut self, value: f32) -> Result<(), K::Error> {
        self.thresholds.set_temperature(&mut self.kv, value)?;
        let now = self.clock.now();
        self.push_state(now);
        Ok(())
    }

    /// Persist and adopt a new low-humidity alert level, pushing the
    /// change to attached clients.
    pub fn set_humidity_alert(&mut self, value: f32) -> Result<(), K::Error> {
        self.thresholds.set_humidity(&mut self.kv, value)?;
        let now = self.clock.now();
        self.push_state(now);
        Ok(())
    }

    /// In-memory history as the JSON array the chart consumes.
    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.history)
    }

    /// Persisted snapshot bytes for download, `None` when no snapshot
    /// exists yet.
    pub fn download_raw(&mut self) -> Result<Option<Vec<u8>>, P::Error> {
        self.snapshots.read_raw()
    }

    /// Replace the snapshot verbatim and reload the history from it.
    ///
    /// The uploaded bytes face the forgiving snapshot decoder: garbage
    /// loads as an empty history rather than an error. Returns how many
    /// records the history now holds.
    pub fn import_raw(&mut self, bytes: &[u8]) -> Result<usize, P::Error> {
        self.snapshots.write_raw(bytes)?;
        let kept = self.history.replace(self.snapshots.load());
        log::info!("snapshot imported, history now holds {kept} records");
        Ok(kept)
    }

    /// Attach a live client. Triggers a fresh poll and a push so the new
    /// client never starts out stale; returns the id for detaching.
    pub fn attach_client(&mut self, sink: Box<dyn SyncSink>) -> u32 {
        let id = self.clients.attach(sink);
        let now = self.clock.now();
        self.poll_sensor();
        self.push_state(now);
        log::info!("client {id} attached ({} total)", self.clients.client_count());
        id
    }

    /// Detach a client by the id [`Device::attach_client`] returned.
    pub fn detach_client(&mut self, id: u32) -> bool {
        let detached = self.clients.detach(id);
        if detached {
            log::info!("client {id} detached");
        }
        detached
    }

    /// Latest valid measurement, `None` until the sensor produces one.
    pub fn live(&self) -> Option<Measurement> {
        self.live
    }

    /// The recorded history.
    pub fn history(&self) -> &HistoryBuffer<MAX_DATA_POINTS> {
        &self.history
    }

    /// The incubation timer.
    pub fn timer(&self) -> IncubationTimer {
        self.timer
    }

    /// Elapsed incubation time as shown to clients.
    pub fn elapsed_text(&self) -> heapless::String<32> {
        self.timer.elapsed_text(self.clock.now())
    }

    /// Current alert thresholds.
    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Number of attached clients.
    pub fn client_count(&self) -> usize {
        self.clients.client_count()
    }

    /// Sample once; a valid pair replaces the live reading, anything
    /// else keeps the last one. Returns what this sample produced.
    fn poll_sensor(&mut self) -> Option<Measurement> {
        let fresh = match self.sensor.sample() {
            Ok(raw) => {
                let pair = Measurement::from_raw(raw.temperature, raw.humidity);
                if pair.is_none() {
                    log::warn!("sensor pair rejected (NaN or zero), keeping last reading");
                }
                pair
            }
            Err(nb::Error::WouldBlock) => None,
            Err(nb::Error::Other(err)) => {
                log::warn!("sensor read failed: {err}");
                None
            }
        };
        if let Some(pair) = fresh {
            self.live = Some(pair);
        }
        fresh
    }

    /// Adopt the start epoch once, on the first tick with a synced clock.
    fn provision_timer(&mut self, now: EpochSeconds) {
        if self.timer.is_started() || !ClockStatus::of(now).is_synced() {
            return;
        }
        match self.timer.initialize_if_absent(&mut self.kv, now) {
            Ok(true) => log::info!("incubation start set to {now}"),
            Ok(false) => {}
            Err(err) => log::warn!("could not persist incubation start: {err:?}"),
        }
    }

    /// Stamp the live reading with `now`, append it and save.
    fn append_live_point(&mut self, now: EpochSeconds) -> bool {
        let live = match self.live {
            Some(live) => live,
            None => {
                log::warn!("no valid reading yet, skipping data point");
                return false;
            }
        };
        self.history.push(live.at(now));
        self.save_history();
        true
    }

    /// Shared tail of reset and retroactive-set: wipe everything, then
    /// try to seed the cleared history with one fresh point.
    fn relog_after_manual_change(&mut self, now: EpochSeconds) -> usize {
        self.scheduler.clear_log_schedule();
        self.history.clear();
        if let Err(err) = self.snapshots.wipe() {
            log::warn!("snapshot wipe failed: {err:?}");
        }

        match self.poll_sensor() {
            Some(_) => {
                self.scheduler.note_manual_log(now);
                if ClockStatus::of(now) == ClockStatus::FarFuture {
                    log::warn!(
                        "clock reports an implausible future time; skipping data point"
                    );
                } else {
                    self.append_live_point(now);
                }
            }
            // Schedule stays cleared: the next sane tick logs without
            // waiting out a full interval.
            None => log::debug!("no valid pair after manual change, history left empty"),
        }
        self.push_state(now)
    }

    fn save_history(&mut self) -> bool {
        match self
            .snapshots
            .save(&mut self.history.iter().copied(), self.pacer.as_mut())
        {
            Ok(_) => true,
            Err(err) => {
                log::error!("snapshot save failed: {err:?}");
                false
            }
        }
    }

    fn push_state(&mut self, now: EpochSeconds) -> usize {
        let message = SyncMessage::build(self.live, &self.timer, &self.history, now);
        self.clients.broadcast(&message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{LOG_INTERVAL_SECS, SENSOR_POLL_SECS};
    use crate::persist::MemorySnapshot;
    use crate::sensor::FixedSensor;
    use crate::settings::MemoryKv;
    use crate::time::ManualClock;

    const T0: EpochSeconds = 1_700_000_000;

    fn booted(
        start: EpochSeconds,
    ) -> (
        Device<ManualClock, FixedSensor, MemorySnapshot, MemoryKv>,
        ManualClock,
    ) {
        let clock = ManualClock::new(start);
        let device = Device::boot(
            clock.clone(),
            FixedSensor::new(99.5, 54.3),
            MemorySnapshot::new(),
            MemoryKv::new(),
        );
        (device, clock)
    }

    #[test]
    fn boot_restores_history_and_settings() {
        let mut kv = MemoryKv::new();
        kv.put_u32("timer", "startTime", T0 - 500).unwrap();
        kv.put_f32("thresholds", "threshold", 97.5).unwrap();
        let snapshot = MemorySnapshot::preloaded(
            r#"[{"timestamp":1699990000,"temperature":99.1,"humidity":52.0},
                {"timestamp":1699993600,"temperature":99.3,"humidity":51.5}]"#,
        );

        let device = Device::boot(
            ManualClock::new(T0),
            FixedSensor::new(99.5, 54.3),
            snapshot,
            MemoryKv::default(),
        );
        let fresh = Device::boot(
            ManualClock::new(T0),
            FixedSensor::new(99.5, 54.3),
            MemorySnapshot::new(),
            kv,
        );

        assert_eq!(device.history().len(), 2);
        assert!(device.live().is_none());

        assert_eq!(fresh.timer().start(), T0 - 500);
        assert_eq!(fresh.thresholds().temperature, 97.5);
        // Missing humidity level fell back to its default.
        assert_eq!(fresh.thresholds().humidity, 40.0);
    }

    #[test]
    fn first_tick_polls_provisions_and_logs() {
        let (mut device, _clock) = booted(T0);

        let report = device.tick();
        assert!(report.polled);
        assert_eq!(report.log, LogDecision::Attempt);
        assert!(report.logged);

        assert_eq!(device.live(), Measurement::from_raw(99.5, 54.3));
        assert_eq!(device.history().len(), 1);
        assert_eq!(device.timer().start(), T0);

        // Within the poll interval nothing more happens.
        assert_eq!(device.tick(), TickReport::IDLE);
    }

    #[test]
    fn unsynced_clock_blocks_logging_but_not_live_updates() {
        let (mut device, clock) = booted(120);

        let report = device.tick();
        assert!(report.polled);
        assert_eq!(report.log, LogDecision::AwaitingSync);
        assert!(device.live().is_some());
        assert!(device.history().is_empty());
        assert!(!device.timer().is_started());

        // Clock syncs: the next poll provisions the timer and logs.
        clock.set(T0);
        let report = device.tick();
        assert_eq!(report.log, LogDecision::Attempt);
        assert_eq!(device.timer().start(), T0);
        assert_eq!(device.history().len(), 1);
    }

    #[test]
    fn hourly_cadence_between_polls() {
        let (mut device, clock) = booted(T0);
        device.tick();

        clock.set(T0 + SENSOR_POLL_SECS);
        let report = device.tick();
        assert!(report.polled);
        assert_eq!(report.log, LogDecision::NotDue);
        assert_eq!(device.history().len(), 1);

        clock.set(T0 + LOG_INTERVAL_SECS);
        assert!(device.tick().logged);
        assert_eq!(device.history().len(), 2);
    }

    #[test]
    fn reset_clears_everything_and_seeds_one_point() {
        let (mut device, clock) = booted(T0);
        device.tick();
        clock.set(T0 + LOG_INTERVAL_SECS);
        device.tick();
        assert_eq!(device.history().len(), 2);

        clock.set(T0 + LOG_INTERVAL_SECS + 10);
        device.reset();

        assert_eq!(device.timer().start(), T0 + LOG_INTERVAL_SECS + 10);
        assert_eq!(device.history().len(), 1);
        let seeded = device.history().last().unwrap();
        assert_eq!(seeded.timestamp, T0 + LOG_INTERVAL_SECS + 10);

        // The manual point debounces the next due automatic log.
        clock.set(T0 + 2 * LOG_INTERVAL_SECS + 10);
        let report = device.tick();
        assert_eq!(report.log, LogDecision::Debounced);
        assert_eq!(device.history().len(), 1);

        clock.set(T0 + 3 * LOG_INTERVAL_SECS + 10);
        assert!(device.tick().logged);
        assert_eq!(device.history().len(), 2);
    }

    #[test]
    fn retroactive_start_backdates_the_timer() {
        let (mut device, _clock) = booted(T0);
        device.tick();

        device.set_start_retroactive(3, 4);
        assert_eq!(device.timer().start(), T0 - (3 * 86_400 + 4 * 3_600));
        assert_eq!(device.elapsed_text().as_str(), "3D 04H");
        assert_eq!(device.history().len(), 1);
    }

    #[test]
    fn import_replaces_history_via_the_forgiving_decoder() {
        let (mut device, _clock) = booted(T0);
        device.tick();
        assert_eq!(device.history().len(), 1);

        let kept = device
            .import_raw(br#"[{"timestamp":0,"temperature":0,"humidity":0}]"#)
            .unwrap();
        assert_eq!(kept, 1);
        let imported = device.history().last().unwrap();
        assert_eq!(imported.temperature, 0.0);

        // Garbage uploads load as empty, not as an error.
        assert_eq!(device.import_raw(b"not json").unwrap(), 0);
        assert!(device.history().is_empty());
    }

    #[test]
    fn export_matches_snapshot_wire_format() {
        let (mut device, _clock) = booted(T0);
        assert_eq!(device.export_json().unwrap(), "[]");

        device.tick();
        assert_eq!(
            device.export_json().unwrap(),
            format!("[{{\"timestamp\":{T0},\"temperature\":99.5,\"humidity\":54.3}}]")
        );
    }

    #[test]
    fn save_failure_keeps_memory_state() {
        let (mut device, clock) = booted(T0);
        device.tick();

        device.snapshots.fail_writes(true);
        clock.set(T0 + LOG_INTERVAL_SECS);
        let report = device.tick();

        // The append survives; only the save failed.
        assert!(report.logged);
        assert_eq!(device.history().len(), 2);
    }
}
