//! Sensor Sampling Seam
//!
//! The physical driver (DHT-class, I2C, whatever the build wires in) lives
//! outside this crate; the core only needs one non-blocking operation:
//! give me a raw temperature/humidity pair or tell me why not. The [`nb`]
//! contract keeps the seam usable from both blocking firmware loops and
//! polling schedulers: `WouldBlock` means "not ready this tick, ask again",
//! any [`SensorError`] means this cycle is lost.
//!
//! Raw values are exactly what the driver reported. NaN and 0.0 failure
//! sentinels pass through here untouched; rejection is the normalizer's
//! job, so the seam stays a dumb pipe.

use crate::errors::SensorError;

/// One raw, unvalidated sensor read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    /// Temperature as reported, degrees.
    pub temperature: f32,
    /// Relative humidity as reported, percent.
    pub humidity: f32,
}

impl RawSample {
    /// Bundle a raw pair.
    pub const fn new(temperature: f32, humidity: f32) -> Self {
        Self {
            temperature,
            humidity,
        }
    }
}

/// Result of one sampling attempt.
pub type SampleResult = nb::Result<RawSample, SensorError>;

/// Non-blocking access to the physical sensor.
pub trait Sensor {
    /// Attempt one read. `Err(nb::Error::WouldBlock)` when the sensor is
    /// mid-conversion; real faults surface as [`SensorError`].
    fn sample(&mut self) -> SampleResult;
}

/// Sensor double that always reports the same pair.
#[derive(Debug, Clone, Copy)]
pub struct FixedSensor {
    sample: RawSample,
}

impl FixedSensor {
    /// A sensor pinned to the given raw pair.
    pub const fn new(temperature: f32, humidity: f32) -> Self {
        Self {
            sample: RawSample::new(temperature, humidity),
        }
    }
}

impl Sensor for FixedSensor {
    fn sample(&mut self) -> SampleResult {
        Ok(self.sample)
    }
}

/// Sensor double that replays a scripted sequence of results.
///
/// Steps are consumed one per call; once exhausted the last step repeats
/// forever, so "fail twice, then work" is a three-step script. An empty
/// script acts as a disconnected sensor.
#[derive(Debug, Clone)]
pub struct ScriptedSensor<'a> {
    script: &'a [SampleResult],
    pos: usize,
}

impl<'a> ScriptedSensor<'a> {
    /// Create a sensor replaying `script`.
    pub const fn new(script: &'a [SampleResult]) -> Self {
        Self { script, pos: 0 }
    }
}

impl Sensor for ScriptedSensor<'_> {
    fn sample(&mut self) -> SampleResult {
        match self.script.get(self.pos) {
            Some(step) => {
                self.pos += 1;
                *step
            }
            None => match self.script.last() {
                Some(step) => *step,
                None => Err(nb::Error::Other(SensorError::Disconnected)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_sensor_repeats() {
        let mut sensor = FixedSensor::new(99.5, 54.3);
        for _ in 0..3 {
            let s = sensor.sample().unwrap();
            assert_eq!(s.temperature, 99.5);
            assert_eq!(s.humidity, 54.3);
        }
    }

    #[test]
    fn scripted_sensor_replays_then_holds_last() {
        let script = [
            Err(nb::Error::Other(SensorError::Timeout)),
            Err(nb::Error::WouldBlock),
            Ok(RawSample::new(99.5, 54.3)),
        ];
        let mut sensor = ScriptedSensor::new(&script);

        assert_eq!(
            sensor.sample(),
            Err(nb::Error::Other(SensorError::Timeout))
        );
        assert_eq!(sensor.sample(), Err(nb::Error::WouldBlock));
        assert!(sensor.sample().is_ok());
        // Exhausted: last step repeats
        assert!(sensor.sample().is_ok());
    }

    #[test]
    fn empty_script_is_disconnected() {
        let mut sensor = ScriptedSensor::new(&[]);
        assert_eq!(
            sensor.sample(),
            Err(nb::Error::Other(SensorError::Disconnected))
        );
    }
}
