//! Core data types for sensorscope
//!
//! This module contains the data structures shared across the acquisition
//! pipeline: how a firmware variable is declared and decoded, what one
//! acquisition produces, and the connection states reported to the display.
//!
//! # Main Types
//!
//! - [`VariableType`] - Memory representation of a firmware variable
//! - [`VariableDef`] - A named variable to bind, with its type and scale
//! - [`Sample`] - One acquisition, tagged with monotonic and wall-clock time
//! - [`AngularReading`] / [`ThermalReading`] - The raw channel tuples
//! - [`DataPoint`] - A timestamped value held by history buffers

use crate::processing::unwrap::wrap_angle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Represents the type of a variable being observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    /// 8-bit unsigned integer
    U8,
    /// 16-bit unsigned integer
    U16,
    /// 32-bit unsigned integer
    U32,
    /// 8-bit signed integer
    I8,
    /// 16-bit signed integer
    I16,
    /// 32-bit signed integer
    I32,
    /// 32-bit floating point
    #[default]
    F32,
    /// 64-bit floating point
    F64,
    /// Boolean value
    Bool,
}

impl VariableType {
    /// Returns the size in bytes of this variable type
    pub fn size_bytes(&self) -> usize {
        match self {
            VariableType::U8 | VariableType::I8 | VariableType::Bool => 1,
            VariableType::U16 | VariableType::I16 => 2,
            VariableType::U32 | VariableType::I32 | VariableType::F32 => 4,
            VariableType::F64 => 8,
        }
    }

    /// Parse little-endian bytes into a f64 value
    pub fn parse_to_f64(&self, bytes: &[u8]) -> Option<f64> {
        if bytes.len() < self.size_bytes() {
            return None;
        }

        Some(match self {
            VariableType::U8 => bytes[0] as f64,
            VariableType::I8 => bytes[0] as i8 as f64,
            VariableType::Bool => {
                if bytes[0] != 0 {
                    1.0
                } else {
                    0.0
                }
            }
            VariableType::U16 => u16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            VariableType::I16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            VariableType::U32 => {
                u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
            }
            VariableType::I32 => {
                i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
            }
            VariableType::F32 => {
                f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
            }
            VariableType::F64 => f64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ]),
        })
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableType::U8 => write!(f, "u8"),
            VariableType::U16 => write!(f, "u16"),
            VariableType::U32 => write!(f, "u32"),
            VariableType::I8 => write!(f, "i8"),
            VariableType::I16 => write!(f, "i16"),
            VariableType::I32 => write!(f, "i32"),
            VariableType::F32 => write!(f, "f32"),
            VariableType::F64 => write!(f, "f64"),
            VariableType::Bool => write!(f, "bool"),
        }
    }
}

fn default_scale() -> f64 {
    1.0
}

/// A firmware variable to bind by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDef {
    /// Symbol name as it appears in the firmware image
    pub name: String,
    /// Memory representation
    #[serde(default, rename = "type")]
    pub var_type: VariableType,
    /// Multiplier applied to the decoded value (e.g. 1/32768 for Q15)
    #[serde(default = "default_scale")]
    pub scale: f64,
}

impl VariableDef {
    /// Create a new variable definition with unit scale
    pub fn new(name: impl Into<String>, var_type: VariableType) -> Self {
        Self {
            name: name.into(),
            var_type,
            scale: 1.0,
        }
    }

    /// Set the scale factor
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }
}

/// A single timestamped value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Time since the session started
    pub timestamp: Duration,
    /// Value
    pub value: f64,
}

impl DataPoint {
    /// Create a new data point
    pub fn new(timestamp: Duration, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// Timestamp in seconds
    pub fn seconds(&self) -> f64 {
        self.timestamp.as_secs_f64()
    }
}

/// Raw channel tuple produced by one read
///
/// Live backends deliver values in channel order; [`Reading::from_raw`]
/// turns them back into the typed tuple.
pub trait Reading: Clone + fmt::Debug {
    /// Channel names, in the order values arrive
    const CHANNELS: &'static [&'static str];

    /// Build a reading from raw values. `values.len()` equals `CHANNELS.len()`.
    fn from_raw(values: &[f64]) -> Self;

    /// Values in channel order
    fn raw_values(&self) -> Vec<f64>;

    /// Channel name/value pairs
    fn channel_values(&self) -> Vec<(&'static str, f64)> {
        Self::CHANNELS
            .iter()
            .copied()
            .zip(self.raw_values())
            .collect()
    }
}

/// Resolver sample: sine, cosine and wrapped absolute angle in (-π, π]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngularReading {
    pub sine: f64,
    pub cosine: f64,
    pub angle: f64,
}

impl Reading for AngularReading {
    const CHANNELS: &'static [&'static str] = &["sine", "cosine", "angle"];

    fn from_raw(values: &[f64]) -> Self {
        Self {
            sine: values[0],
            cosine: values[1],
            angle: wrap_angle(values[2]),
        }
    }

    fn raw_values(&self) -> Vec<f64> {
        vec![self.sine, self.cosine, self.angle]
    }
}

/// Temperature sample: degrees Celsius plus the firmware's sample-rate code
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalReading {
    pub temperature_c: f64,
    pub rate_code: i64,
}

impl Reading for ThermalReading {
    const CHANNELS: &'static [&'static str] = &["temperature_c", "rate_code"];

    fn from_raw(values: &[f64]) -> Self {
        Self {
            temperature_c: values[0],
            rate_code: values[1].round() as i64,
        }
    }

    fn raw_values(&self) -> Vec<f64> {
        vec![self.temperature_c, self.rate_code as f64]
    }
}

/// One acquisition
#[derive(Debug, Clone)]
pub struct Sample<R> {
    /// Monotonic acquisition time
    pub acquired: Instant,
    /// Wall-clock acquisition time
    pub wall_clock: DateTime<Utc>,
    /// The values read
    pub reading: R,
}

impl<R> Sample<R> {
    /// Tag a reading with its acquisition time
    pub fn new(acquired: Instant, reading: R) -> Self {
        Self {
            acquired,
            wall_clock: Utc::now(),
            reading,
        }
    }
}

/// Where the signal provider currently gets its values from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceState {
    /// Live capability exists but no backend is bound
    #[default]
    Disconnected,
    /// Reading from a live backend
    Connected,
    /// No live capability; synthetic values only
    DemoFallback,
}

impl fmt::Display for SourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceState::Disconnected => write!(f, "Disconnected"),
            SourceState::Connected => write!(f, "Connected"),
            SourceState::DemoFallback => write!(f, "Demo"),
        }
    }
}

/// Link status reported to the display collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LinkStatus {
    /// Polling a live backend
    Live,
    /// Polling the synthetic source
    Demo,
    /// Polling stopped by request
    Idle,
    /// Polling stopped after repeated read faults
    Faulted,
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkStatus::Live => write!(f, "Live"),
            LinkStatus::Demo => write!(f, "Demo"),
            LinkStatus::Idle => write!(f, "Idle"),
            LinkStatus::Faulted => write!(f, "Faulted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_type_size() {
        assert_eq!(VariableType::U8.size_bytes(), 1);
        assert_eq!(VariableType::U16.size_bytes(), 2);
        assert_eq!(VariableType::U32.size_bytes(), 4);
        assert_eq!(VariableType::F32.size_bytes(), 4);
        assert_eq!(VariableType::F64.size_bytes(), 8);
    }

    #[test]
    fn test_variable_type_parse() {
        let bytes_u32: [u8; 4] = 1000u32.to_le_bytes();
        assert_eq!(VariableType::U32.parse_to_f64(&bytes_u32), Some(1000.0));

        let bytes_f32: [u8; 4] = 1.5f32.to_le_bytes();
        assert_eq!(VariableType::F32.parse_to_f64(&bytes_f32), Some(1.5));

        let bytes_i16: [u8; 2] = (-1234i16).to_le_bytes();
        assert_eq!(VariableType::I16.parse_to_f64(&bytes_i16), Some(-1234.0));

        // Too short
        assert_eq!(VariableType::U32.parse_to_f64(&[1, 2]), None);
    }

    #[test]
    fn test_thermal_reading_rounds_rate_code() {
        let reading = ThermalReading::from_raw(&[31.0, 2.0000001]);
        assert_eq!(reading.rate_code, 2);
        assert_eq!(reading.temperature_c, 31.0);
    }

    #[test]
    fn test_angular_reading_wraps_live_angle() {
        use std::f64::consts::PI;

        // Firmware reporting in [0, 2π)
        let reading = AngularReading::from_raw(&[-1.0, 0.0, 1.5 * PI]);
        assert!((reading.angle + 0.5 * PI).abs() < 1e-12);

        let in_range = AngularReading::from_raw(&[0.0, 1.0, 2.0]);
        assert_eq!(in_range.angle, 2.0);
    }

    #[test]
    fn test_channel_values_follow_channel_order() {
        let reading = AngularReading {
            sine: 0.5,
            cosine: -0.5,
            angle: 1.0,
        };
        let pairs = reading.channel_values();
        assert_eq!(pairs, vec![("sine", 0.5), ("cosine", -0.5), ("angle", 1.0)]);
    }

    #[test]
    fn test_variable_def_deserializes_with_defaults() {
        let def: VariableDef = toml::from_str(r#"name = "resolver_position""#).unwrap();
        assert_eq!(def.var_type, VariableType::F32);
        assert_eq!(def.scale, 1.0);

        let def: VariableDef =
            toml::from_str("name = \"tempSampleRate\"\ntype = \"u32\"").unwrap();
        assert_eq!(def.var_type, VariableType::U32);
    }
}
