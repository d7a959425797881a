//! Client Sync Broadcasting
//!
//! Connected dashboards all receive the same state push: a single JSON
//! object carrying the live reading, the incubation timer and both
//! summaries. Pushes happen after every poll cycle, after manual history
//! actions, after threshold changes and when a client attaches; clients
//! never request state, they only listen.
//!
//! Delivery is fire and forget. A sink that reports failure is detached
//! on the spot and never retried, so one stalled connection cannot hold
//! up the tick. With no clients attached the broadcast is skipped before
//! the message is even encoded.

use serde::Serialize;

use crate::buffer::HistoryBuffer;
use crate::errors::SinkError;
use crate::reading::Measurement;
use crate::summary::Summary;
use crate::time::EpochSeconds;
use crate::timer::IncubationTimer;

/// State push sent to every attached client.
///
/// Field order is the wire order. Absent summaries are sent as `null`,
/// and a device that has not yet seen a valid sample sends zero for both
/// live values.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMessage {
    /// Message discriminator, always `"update"`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Live temperature, one decimal.
    pub temperature: f32,
    /// Live relative humidity, one decimal.
    pub humidity: f32,
    /// Human-readable elapsed incubation time.
    pub incubation_time: String,
    /// Raw start epoch, 0 when the timer has not started.
    pub start_time: u32,
    /// Trailing 24 h summary, `None` when the window is empty.
    pub summary: Option<Summary>,
    /// All-time summary, `None` when the history is empty.
    pub all_summary: Option<Summary>,
}

impl SyncMessage {
    /// Assemble the push from current device state.
    pub fn build<const N: usize>(
        live: Option<Measurement>,
        timer: &IncubationTimer,
        history: &HistoryBuffer<N>,
        now: EpochSeconds,
    ) -> Self {
        Self {
            kind: "update",
            temperature: live.map_or(0.0, |m| m.temperature),
            humidity: live.map_or(0.0, |m| m.humidity),
            incubation_time: timer.elapsed_text(now).as_str().into(),
            start_time: timer.start(),
            summary: Summary::last_day(history.iter(), now),
            all_summary: Summary::over(history.iter()),
        }
    }

    /// Encode for the wire.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// One attached client connection.
///
/// Implementations wrap whatever transport carries the push; the core
/// only needs a best-effort send.
pub trait SyncSink {
    /// Deliver one encoded message.
    fn push(&mut self, payload: &str) -> Result<(), SinkError>;
}

/// Fan-out of [`SyncMessage`] pushes over attached [`SyncSink`]s.
pub struct Broadcaster {
    sinks: Vec<(u32, Box<dyn SyncSink>)>,
    next_id: u32,
}

impl Broadcaster {
    /// Broadcaster with no clients.
    pub fn new() -> Self {
        Self {
            sinks: Vec::new(),
            next_id: 0,
        }
    }

    /// Register a client; the returned id detaches it later.
    pub fn attach(&mut self, sink: Box<dyn SyncSink>) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.sinks.push((id, sink));
        id
    }

    /// Remove a client. Returns false when the id is unknown (already
    /// dropped after a failed push, usually).
    pub fn detach(&mut self, id: u32) -> bool {
        let before = self.sinks.len();
        self.sinks.retain(|(sid, _)| *sid != id);
        self.sinks.len() != before
    }

    /// Number of attached clients.
    pub fn client_count(&self) -> usize {
        self.sinks.len()
    }

    /// Push `message` to every client, dropping the ones that fail.
    /// Returns the number of successful deliveries.
    pub fn broadcast(&mut self, message: &SyncMessage) -> usize {
        if self.sinks.is_empty() {
            return 0;
        }
        let payload = match message.to_json() {
            Ok(payload) => payload,
            Err(err) => {
                log::error!("sync message encode failed: {err}");
                return 0;
            }
        };
        let mut delivered = 0;
        self.sinks.retain_mut(|(id, sink)| match sink.push(&payload) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(err) => {
                log::warn!("client {id} detached after failed push: {err}");
                false
            }
        });
        delivered
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}
