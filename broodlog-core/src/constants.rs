//! Constants for the Broodlog Telemetry Core
//!
//! Centralized, documented constants used throughout the crate. Always use
//! these instead of magic numbers; when adding new ones, state the rationale
//! and units in the doc comment.

// ===== TIME UNIT CONVERSIONS =====

/// Seconds per minute.
pub const SECONDS_PER_MINUTE: u32 = 60;

/// Seconds per hour.
pub const SECONDS_PER_HOUR: u32 = 3600;

/// Seconds per day.
pub const SECONDS_PER_DAY: u32 = 86_400;

// ===== HISTORY CAPACITY =====

/// Maximum number of readings retained in the telemetry history.
///
/// 504 = 21 days at one sample per hour, the full incubation-plus-hatch
/// cycle for chicken eggs. Once full, the oldest reading is evicted for
/// each new one (FIFO).
pub const MAX_DATA_POINTS: usize = 504;

// ===== SCHEDULER CADENCE =====

/// Interval between sensor polls (seconds).
///
/// Polls refresh the live reading shown to clients; they never touch the
/// history. One minute keeps the dashboard fresh without stressing a
/// DHT2x-class sensor, whose own sampling period is ~2 s.
pub const SENSOR_POLL_SECS: u32 = SECONDS_PER_MINUTE;

/// Interval between automatic history log entries (seconds).
///
/// One reading per hour fills `MAX_DATA_POINTS` in exactly 21 days.
pub const LOG_INTERVAL_SECS: u32 = SECONDS_PER_HOUR;

// ===== CLOCK PLAUSIBILITY BOUNDS =====

/// Epoch seconds below which the wall clock is considered not yet synced.
///
/// 1_600_000_000 is 2020-09-13; any earlier value means the NTP-class time
/// source has not delivered real time yet (typically it still reads 1970).
/// Logging is suppressed entirely below this floor.
pub const TIME_SYNC_FLOOR: u32 = 1_600_000_000;

/// Epoch seconds above which a timestamp is considered corrupt.
///
/// 1_800_000_000 is 2027-01-15, comfortably beyond the firmware's service
/// life. A reading stamped later than this is clock corruption, not data,
/// and is never appended to the history.
pub const MAX_REASONABLE_TIMESTAMP: u32 = 1_800_000_000;

// ===== SUMMARY WINDOWS =====

/// Rolling summary window (seconds): the last 24 hours.
pub const SUMMARY_WINDOW_SECS: u32 = SECONDS_PER_DAY;

// ===== PERSISTENCE =====

/// Records written between cooperative yields during a snapshot save.
///
/// A full 504-record serialization is long enough to starve the network
/// stack on a single-core device, so the save path hands control back to
/// the system every 32 records. Power of two so the check stays a mask.
pub const SAVE_YIELD_STRIDE: usize = 32;

// ===== ALERT THRESHOLD DEFAULTS =====

/// Default high-temperature alert level (degrees, one decimal).
///
/// Exposed to clients as passthrough configuration; no alerting logic in
/// this core consumes it.
pub const DEFAULT_TEMPERATURE_ALERT: f32 = 95.0;

/// Default low-humidity alert level (percent relative humidity).
pub const DEFAULT_HUMIDITY_ALERT: f32 = 40.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_covers_incubation_cycle() {
        let samples_per_day = SECONDS_PER_DAY / LOG_INTERVAL_SECS;
        assert_eq!(MAX_DATA_POINTS, (samples_per_day * 21) as usize);
    }

    #[test]
    fn clock_bounds_are_ordered() {
        assert!(TIME_SYNC_FLOOR < MAX_REASONABLE_TIMESTAMP);
    }

    #[test]
    fn yield_stride_is_power_of_two() {
        assert!(SAVE_YIELD_STRIDE.is_power_of_two());
    }
}
