//! Error Types for the Telemetry Core
//!
//! ## Design Philosophy
//!
//! Nothing in this crate is fatal to the running device. Every failure mode
//! is a representable value the scheduler can inspect and skip past:
//!
//! 1. **Sensor faults are transient**: a failed read skips one cycle and is
//!    retried at the next, so `SensorError` stays small and `Copy`.
//!
//! 2. **Storage faults are recoverable**: a corrupt or unreadable snapshot
//!    degrades to an empty history; a failed write leaves in-memory state
//!    authoritative until the next save succeeds.
//!
//! 3. **Fanout faults are ignorable**: a client that cannot take a frame is
//!    detached, never waited on.
//!
//! The no-`std` build keeps only the inline, `Copy` errors; the storage
//! errors wrap `std::io::Error` and `serde_json::Error` sources and come in
//! with the `std` feature.

use thiserror_no_std::Error;

/// Transient sensor-read failures.
///
/// All variants mean the same thing to the scheduler: no usable sample this
/// cycle, try again at the next one. The distinction is kept for diagnostics.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// Sensor did not answer within its protocol deadline.
    #[error("sensor read timed out")]
    Timeout,

    /// Transfer completed but the checksum did not match.
    #[error("sensor checksum mismatch")]
    ChecksumMismatch,

    /// Sensor is not responding at all (unplugged, wrong pin).
    #[error("sensor not responding")]
    Disconnected,
}

/// Failures pushing a frame to one live client.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkError {
    /// Peer has gone away; the sink should be detached.
    #[error("client disconnected")]
    Closed,

    /// Peer cannot take the frame right now; the frame is dropped.
    #[error("client send buffer full")]
    Full,
}

/// Failures reading or writing the snapshot file.
#[cfg(feature = "std")]
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// Underlying filesystem error.
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot content could not be encoded or decoded.
    #[error("snapshot encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures reading or writing the key/value settings store.
#[cfg(feature = "std")]
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Underlying filesystem error.
    #[error("settings I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Settings content could not be encoded or decoded.
    #[error("settings encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_error_is_small() {
        // Returned from every poll; must stay register-sized.
        assert!(core::mem::size_of::<SensorError>() <= 4);
    }

    #[cfg(feature = "std")]
    #[test]
    fn snapshot_error_wraps_io() {
        let io = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        let err = SnapshotError::from(io);
        assert!(matches!(err, SnapshotError::Io(_)));
    }
}
