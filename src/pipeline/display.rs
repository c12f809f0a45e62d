//! Display collaborators
//!
//! The poll loop hands every processed sample to a [`DisplaySink`] as a
//! [`Snapshot`]. Rendering is someone else's job: [`ChannelDisplay`] forwards
//! snapshots to another thread and [`ConsoleDisplay`] prints them.

use crate::processing::rate::TemperatureUnit;
use crate::types::LinkStatus;
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::io::Write;
use std::time::Duration;

fn serialize_secs<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// Quantities derived from one sample
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Derived {
    Angular {
        angle_deg: f64,
        speed_rpm: f64,
        turns: f64,
    },
    Thermal {
        temperature: f64,
        unit: TemperatureUnit,
        rate_code: i64,
        rate_label: String,
    },
}

/// Everything a display needs for one poll
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Time since the session started, in seconds when serialized
    #[serde(rename = "t", serialize_with = "serialize_secs")]
    pub timestamp: Duration,
    pub wall_clock: DateTime<Utc>,
    /// Raw channel values by name
    pub channel_values: BTreeMap<String, f64>,
    pub derived: Derived,
    /// Republished after a failed read
    pub stale: bool,
}

/// Receives snapshots from a poll loop
#[cfg_attr(test, mockall::automock)]
pub trait DisplaySink: Send {
    /// A new (or republished stale) snapshot
    fn publish(&mut self, snapshot: &Snapshot);

    /// The link to the signal source changed
    fn link_changed(&mut self, _status: LinkStatus) {}
}

/// Event forwarded by [`ChannelDisplay`]
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayEvent {
    Snapshot(Snapshot),
    Link(LinkStatus),
}

/// Forwards events over a bounded channel without ever blocking the loop
pub struct ChannelDisplay {
    sender: Sender<DisplayEvent>,
    dropped: u64,
}

impl ChannelDisplay {
    /// Create a sink and its receiving end
    pub fn new(capacity: usize) -> (Self, DisplayReceiver) {
        let (sender, receiver) = bounded(capacity);
        (
            Self { sender, dropped: 0 },
            DisplayReceiver { receiver },
        )
    }

    /// Events discarded because the receiver fell behind or went away
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn forward(&mut self, event: DisplayEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                if self.dropped.is_power_of_two() {
                    tracing::warn!("Display channel full, {} events dropped", self.dropped);
                }
            }
            Err(TrySendError::Disconnected(_)) => {
                self.dropped += 1;
            }
        }
    }
}

impl DisplaySink for ChannelDisplay {
    fn publish(&mut self, snapshot: &Snapshot) {
        self.forward(DisplayEvent::Snapshot(snapshot.clone()));
    }

    fn link_changed(&mut self, status: LinkStatus) {
        self.forward(DisplayEvent::Link(status));
    }
}

/// Receiving end of a [`ChannelDisplay`]
pub struct DisplayReceiver {
    receiver: Receiver<DisplayEvent>,
}

impl DisplayReceiver {
    /// Try to receive an event without blocking
    pub fn try_recv(&self) -> Option<DisplayEvent> {
        self.receiver.try_recv().ok()
    }

    /// Receive all pending events
    pub fn drain(&self) -> Vec<DisplayEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Console output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One human-readable line per snapshot
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Prints every Nth snapshot to a writer
pub struct ConsoleDisplay<W: Write + Send> {
    out: W,
    format: OutputFormat,
    every: u64,
    seen: u64,
}

impl<W: Write + Send> ConsoleDisplay<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out,
            format,
            every: 1,
            seen: 0,
        }
    }

    /// Print only every `n`th snapshot (minimum 1)
    pub fn every(mut self, n: u64) -> Self {
        self.every = n.max(1);
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{}", line) {
            tracing::warn!("Failed to write snapshot: {}", e);
        }
    }
}

/// Human-readable line for a snapshot
pub fn format_text(snapshot: &Snapshot) -> String {
    let mut line = match &snapshot.derived {
        Derived::Angular {
            angle_deg,
            speed_rpm,
            turns,
        } => format!(
            "Angle: {:.1}°  Speed: {:.1} RPM  Turns: {:.2}",
            angle_deg, speed_rpm, turns
        ),
        Derived::Thermal {
            temperature,
            unit,
            rate_label,
            ..
        } => format!(
            "Temperature: {:.0} {}  Sample rate: {}",
            temperature, unit, rate_label
        ),
    };
    if snapshot.stale {
        line.push_str("  (stale)");
    }
    line
}

impl<W: Write + Send> DisplaySink for ConsoleDisplay<W> {
    fn publish(&mut self, snapshot: &Snapshot) {
        self.seen += 1;
        if (self.seen - 1) % self.every != 0 {
            return;
        }
        let line = match self.format {
            OutputFormat::Text => format_text(snapshot),
            OutputFormat::Json => match serde_json::to_string(snapshot) {
                Ok(json) => json,
                Err(e) => {
                    tracing::warn!("Failed to serialize snapshot: {}", e);
                    return;
                }
            },
        };
        self.write_line(&line);
    }

    fn link_changed(&mut self, status: LinkStatus) {
        let line = match self.format {
            OutputFormat::Text => format!("[link] {}", status),
            OutputFormat::Json => serde_json::json!({ "link": status }).to_string(),
        };
        self.write_line(&line);
    }
}
