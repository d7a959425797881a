//! Telemetry core for Broodlog
//!
//! Keeps a bounded, durable history of incubator readings and serves live
//! summaries to connected clients. Designed for small always-on devices.
//!
//! Key constraints:
//! - Fixed-capacity history (21 days at one sample per hour), FIFO eviction
//! - Snapshot survives reboots; corrupt snapshots degrade to empty, never fatal
//! - Single producer; all mutation happens inside one scheduler tick
//!
//! ```no_run
//! use broodlog_core::reading::Measurement;
//! use broodlog_core::buffer::HistoryBuffer;
//! use broodlog_core::constants::MAX_DATA_POINTS;
//!
//! let mut history: HistoryBuffer<MAX_DATA_POINTS> = HistoryBuffer::new();
//!
//! // Only normalized measurements enter the history
//! if let Some(m) = Measurement::from_raw(99.46, 54.32) {
//!     history.push(m.at(1_700_000_000));
//! }
//! ```
//!
//! The `std` feature (default) unlocks the durable stores, the device
//! orchestrator, and the request dispatch surface. Without it the crate
//! provides the data model only: readings, the ring buffer, summaries,
//! the timer, and the scheduler state machine.

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod buffer;
pub mod constants;
pub mod errors;
pub mod reading;
pub mod scheduler;
pub mod sensor;
pub mod settings;
pub mod summary;
pub mod time;
pub mod timer;

#[cfg(feature = "std")]
pub mod api;
#[cfg(feature = "std")]
pub mod device;
#[cfg(feature = "std")]
pub mod persist;
#[cfg(feature = "std")]
pub mod sync;

// Public API
pub use buffer::HistoryBuffer;
pub use reading::{Measurement, Reading};
pub use scheduler::{LogDecision, Scheduler};
pub use summary::Summary;
pub use timer::IncubationTimer;

#[cfg(feature = "std")]
pub use device::Device;

/// Crate version, from the package manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
