//! Reading data model and normalization
//!
//! ## Sentinel convention
//!
//! The sensor family this core targets reports a failed read as either NaN
//! or exactly 0.0. Zero is therefore reserved as the "no sensor data yet"
//! sentinel and is never a legitimate live value; [`Measurement::from_raw`]
//! rejects both before a value can reach the history.
//!
//! ## Rounding
//!
//! Stored and exported values carry one decimal place. Rounding is
//! round-half-away-from-zero on the value scaled by ten (`roundf(v * 10) /
//! 10`, via [`libm`] so the same code runs without `std`). The operation is
//! idempotent, which lets the persistence layer re-round on load without
//! drifting values that were already rounded on save.
//!
//! Normalization applies only to the live sensor path. Records arriving via
//! snapshot load or bulk import are trusted as-is apart from the defensive
//! re-round; see the persistence module.

use crate::time::EpochSeconds;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Round to one decimal place, half away from zero.
pub fn round_tenths(value: f32) -> f32 {
    libm::roundf(value * 10.0) / 10.0
}

/// A validated, rounded temperature/humidity pair without a timestamp.
///
/// Construction goes through [`Measurement::from_raw`], so a `Measurement`
/// always comes from a non-NaN, non-zero raw pair and carries one decimal
/// place. (Rounding a tiny raw value like 0.04 can still produce 0.0; the
/// sentinel check applies to what the sensor reported, not the rounded
/// result.)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Temperature in degrees, one decimal place.
    pub temperature: f32,
    /// Relative humidity in percent, one decimal place.
    pub humidity: f32,
}

impl Measurement {
    /// Normalize a raw sensor pair.
    ///
    /// Returns `None` if either value is NaN or exactly zero (the sensor's
    /// own failed-read sentinels); otherwise rounds both to one decimal
    /// place. Pure, no side effects.
    pub fn from_raw(raw_temperature: f32, raw_humidity: f32) -> Option<Self> {
        if raw_temperature.is_nan() || raw_humidity.is_nan() {
            return None;
        }
        if raw_temperature == 0.0 || raw_humidity == 0.0 {
            return None;
        }
        Some(Self {
            temperature: round_tenths(raw_temperature),
            humidity: round_tenths(raw_humidity),
        })
    }

    /// Stamp this measurement, producing a history-ready reading.
    pub fn at(self, timestamp: EpochSeconds) -> Reading {
        Reading {
            timestamp,
            temperature: self.temperature,
            humidity: self.humidity,
        }
    }
}

/// One timestamped observation, as kept in the history and on disk.
///
/// Field names are the wire names: the persisted snapshot and the bulk
/// export are JSON arrays of exactly this shape.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reading {
    /// Epoch seconds at the moment of logging.
    pub timestamp: EpochSeconds,
    /// Temperature in degrees, one decimal place.
    pub temperature: f32,
    /// Relative humidity in percent, one decimal place.
    pub humidity: f32,
}

impl Reading {
    /// Build a reading, defensively re-rounding both values.
    ///
    /// Used by the load path, where values are normally rounded already;
    /// re-rounding is idempotent so this is safe either way. No validity
    /// check happens here: loaded data is trusted.
    pub fn new(timestamp: EpochSeconds, temperature: f32, humidity: f32) -> Self {
        Self {
            timestamp,
            temperature: round_tenths(temperature),
            humidity: round_tenths(humidity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_nan() {
        assert!(Measurement::from_raw(f32::NAN, 50.0).is_none());
        assert!(Measurement::from_raw(99.5, f32::NAN).is_none());
        assert!(Measurement::from_raw(f32::NAN, f32::NAN).is_none());
    }

    #[test]
    fn rejects_zero_sentinel() {
        assert!(Measurement::from_raw(0.0, 50.0).is_none());
        assert!(Measurement::from_raw(99.5, 0.0).is_none());
    }

    #[test]
    fn rounds_half_away_from_zero() {
        // 2.25 and 2.75 scale to exactly representable 22.5 / 27.5
        let m = Measurement::from_raw(2.25, 2.75).unwrap();
        assert_eq!(m.temperature, 2.3);
        assert_eq!(m.humidity, 2.8);

        let m = Measurement::from_raw(-2.25, 60.0).unwrap();
        assert_eq!(m.temperature, -2.3);
    }

    #[test]
    fn rounding_is_idempotent() {
        for raw in [99.46_f32, 71.25, -3.85, 0.04, 100.0, 37.777] {
            let once = round_tenths(raw);
            assert_eq!(round_tenths(once), once);
        }
    }

    #[test]
    fn near_zero_rounds_to_zero_but_raw_is_accepted() {
        // 0.04 is a legitimate (if unlikely) raw value; the sentinel check
        // runs on the raw value, before rounding can produce 0.0.
        let m = Measurement::from_raw(0.04, 50.0).unwrap();
        assert_eq!(m.temperature, 0.0);
    }

    #[test]
    fn stamping_preserves_values() {
        let r = Measurement::from_raw(99.46, 54.32).unwrap().at(1_700_000_000);
        assert_eq!(r.timestamp, 1_700_000_000);
        assert_eq!(r.temperature, 99.5);
        assert_eq!(r.humidity, 54.3);
    }

    #[test]
    fn loaded_reading_is_not_validated() {
        // Load path trusts persisted data: zeros survive, only rounding runs.
        let r = Reading::new(0, 0.0, 0.0);
        assert_eq!(r.timestamp, 0);
        assert_eq!(r.temperature, 0.0);
        assert_eq!(r.humidity, 0.0);
    }

    #[cfg(feature = "std")]
    #[test]
    fn wire_shape_matches_snapshot_format() {
        let r = Reading::new(1_700_000_000, 99.46, 54.3);
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(
            json,
            r#"{"timestamp":1700000000,"temperature":99.5,"humidity":54.3}"#
        );

        let back: Reading = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Rounding settles after one application.
            #[test]
            fn rounding_settles_in_one_step(raw in -1000.0f32..1000.0) {
                let once = round_tenths(raw);
                prop_assert_eq!(round_tenths(once), once);
            }

            /// A normalized measurement is a fixed point of normalization.
            #[test]
            fn normalization_is_idempotent(
                temp in 0.1f32..150.0,
                humid in 0.1f32..100.0,
            ) {
                let m = Measurement::from_raw(temp, humid).unwrap();
                prop_assert_eq!(Measurement::from_raw(m.temperature, m.humidity), Some(m));
            }
        }
    }
}
