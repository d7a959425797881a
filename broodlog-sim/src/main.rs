//! Desktop simulator for the Broodlog device core.
//!
//! Stands in for the incubator hardware: a synthetic DHT-class sensor with
//! slow sinusoidal drift and occasional dropouts, file-backed snapshot and
//! settings stores in a state directory, and one attached client that
//! prints every sync frame to stdout.
//!
//! ```text
//! RUST_LOG=debug cargo run -p broodlog-sim -- ./broodlog-data
//! ```
//!
//! State survives restarts. Stop the simulator, start it again with the
//! same directory, and the history, thresholds and incubation timer pick
//! up where they left off.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use log::{info, warn};

use broodlog_core::device::Device;
use broodlog_core::errors::{SensorError, SinkError};
use broodlog_core::persist::FileSnapshot;
use broodlog_core::sensor::{RawSample, SampleResult, Sensor};
use broodlog_core::settings::FileKv;
use broodlog_core::sync::SyncSink;
use broodlog_core::time::SystemClock;

// ---- Pacing ----

/// Wall-clock pause between scheduler ticks.
const TICK_PAUSE: Duration = Duration::from_secs(1);

// ---- Synthetic incubator ----

/// Every Nth sample fails with a read timeout, so the dropout path gets
/// exercised without unplugging anything.
const DROPOUT_EVERY: u32 = 47;

/// Synthetic DHT-class sensor. Temperature and humidity drift sinusoidally
/// around brooding setpoints so charts and summaries have something to show.
struct WavySensor {
    samples: u32,
}

impl WavySensor {
    fn new() -> Self {
        Self { samples: 0 }
    }
}

impl Sensor for WavySensor {
    fn sample(&mut self) -> SampleResult {
        self.samples = self.samples.wrapping_add(1);
        if self.samples % DROPOUT_EVERY == 0 {
            return Err(nb::Error::Other(SensorError::Timeout));
        }

        let t = f64::from(self.samples);
        let temperature = 99.5 + 0.8 * (t / 120.0).sin() + 0.2 * (t / 37.0).cos();
        let humidity = 55.0 + 6.0 * (t / 180.0).sin() + 1.5 * (t / 23.0).cos();
        Ok(RawSample::new(temperature as f32, humidity as f32))
    }
}

// ---- Stdout client ----

/// Client stand-in: prints every sync frame as one JSON line.
struct StdoutSink;

impl SyncSink for StdoutSink {
    fn push(&mut self, payload: &str) -> Result<(), SinkError> {
        println!("{payload}");
        Ok(())
    }
}

// ---- Entry point ----

fn main() {
    env_logger::init();

    let state_dir: PathBuf = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "broodlog-data".to_owned())
        .into();
    if let Err(err) = std::fs::create_dir_all(&state_dir) {
        eprintln!(
            "cannot create state directory {}: {err}",
            state_dir.display()
        );
        std::process::exit(1);
    }

    info!("Starting Broodlog simulator v{}", broodlog_core::VERSION);
    info!("State directory: {}", state_dir.display());

    let mut device = Device::boot(
        SystemClock,
        WavySensor::new(),
        FileSnapshot::new(state_dir.join("data.json")),
        FileKv::open(state_dir.join("settings.json")),
    );
    device.attach_client(Box::new(StdoutSink));

    info!(
        "Device up: {} stored readings, incubation {}",
        device.history().len(),
        device.elapsed_text(),
    );

    loop {
        let started = Instant::now();

        let report = device.tick();
        if report.polled {
            match device.live() {
                Some(live) => info!(
                    "poll: {:.1} F / {:.1} %RH, history {}, log {:?}",
                    live.temperature,
                    live.humidity,
                    device.history().len(),
                    report.log,
                ),
                None => warn!("poll: no live reading yet"),
            }
        }

        let elapsed = started.elapsed();
        if elapsed < TICK_PAUSE {
            std::thread::sleep(TICK_PAUSE - elapsed);
        }
    }
}
