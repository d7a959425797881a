//! Rolling-Window and All-Time Aggregates
//!
//! Computes avg/min/max per metric over the history, either bounded to a
//! trailing window (the dashboard's "last 24 h" card) or over everything
//! retained. Recomputed fresh on every call: at 504 readings a single O(n)
//! pass is cheaper than maintaining incremental state, and there is nothing
//! to invalidate after evictions, resets, or imports.
//!
//! An empty input (or a window that excludes everything) yields `None`, not
//! a zero-filled struct. The distinction is visible on the wire as
//! `"summary": null` and clients rely on it; an all-zero summary would look
//! like data.

use crate::constants::SUMMARY_WINDOW_SECS;
use crate::reading::{round_tenths, Reading};
use crate::time::EpochSeconds;

/// Aggregates over one set of readings, both metrics jointly.
///
/// Serializes with the wire key names (`avgTemp`, `minHumid`, ...) used by
/// the live sync message. Averages are rounded to one decimal at build time
/// to match the wire's fixed precision; min/max come from the store already
/// rounded.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Summary {
    /// Mean temperature over the set.
    pub avg_temp: f32,
    /// Lowest temperature in the set.
    pub min_temp: f32,
    /// Highest temperature in the set.
    pub max_temp: f32,
    /// Mean humidity over the set.
    pub avg_humid: f32,
    /// Lowest humidity in the set.
    pub min_humid: f32,
    /// Highest humidity in the set.
    pub max_humid: f32,
}

impl Summary {
    /// Aggregate every reading in the iterator; `None` when it is empty.
    pub fn over<'a, I>(readings: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Reading>,
    {
        let mut count: u32 = 0;
        let mut sum_temp = 0.0_f32;
        let mut sum_humid = 0.0_f32;
        let mut min_temp = f32::MAX;
        let mut max_temp = f32::MIN;
        let mut min_humid = f32::MAX;
        let mut max_humid = f32::MIN;

        for reading in readings {
            sum_temp += reading.temperature;
            sum_humid += reading.humidity;
            min_temp = min_temp.min(reading.temperature);
            max_temp = max_temp.max(reading.temperature);
            min_humid = min_humid.min(reading.humidity);
            max_humid = max_humid.max(reading.humidity);
            count += 1;
        }

        if count == 0 {
            return None;
        }

        Some(Self {
            avg_temp: round_tenths(sum_temp / count as f32),
            min_temp,
            max_temp,
            avg_humid: round_tenths(sum_humid / count as f32),
            min_humid,
            max_humid,
        })
    }

    /// Aggregate readings with `timestamp >= now - window_secs`.
    ///
    /// The cutoff saturates at zero, so an early `now` simply includes
    /// everything rather than wrapping.
    pub fn windowed<'a, I>(readings: I, now: EpochSeconds, window_secs: u32) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Reading>,
    {
        let cutoff = now.saturating_sub(window_secs);
        Self::over(readings.into_iter().filter(|r| r.timestamp >= cutoff))
    }

    /// The standard dashboard window: the trailing 24 hours.
    pub fn last_day<'a, I>(readings: I, now: EpochSeconds) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Reading>,
    {
        Self::windowed(readings, now, SUMMARY_WINDOW_SECS)
    }
}
