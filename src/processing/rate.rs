//! Rate estimation and display mapping
//!
//! - [`SpeedEstimator`] turns the unwrapped angle delta into RPM using the
//!   measured time between polls, not the nominal poll period.
//! - [`RateLabels`] maps the thermal firmware's sample-rate code to a label.
//! - [`TemperatureUnit`] converts Celsius readings for display.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::TAU;
use std::fmt;
use std::time::Duration;

/// Convert an angular delta over an interval into revolutions per minute
///
/// Returns 0 for a zero interval.
pub fn rpm_from_delta(delta_rad: f64, dt: Duration) -> f64 {
    let dt_secs = dt.as_secs_f64();
    if dt_secs <= 0.0 {
        return 0.0;
    }
    delta_rad / dt_secs * 60.0 / TAU
}

/// Instantaneous speed from successive unwrapped deltas
#[derive(Debug, Clone, Default)]
pub struct SpeedEstimator {
    last_timestamp: Option<Duration>,
    last_rpm: f64,
}

impl SpeedEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the sample time and the delta from the turn counter
    ///
    /// `delta` is `None` for the first sample after a reset, which reports 0.
    pub fn update(&mut self, timestamp: Duration, delta: Option<f64>) -> f64 {
        let previous = self.last_timestamp.replace(timestamp);
        self.last_rpm = match (previous, delta) {
            (Some(prev), Some(delta)) => rpm_from_delta(delta, timestamp.saturating_sub(prev)),
            _ => 0.0,
        };
        self.last_rpm
    }

    /// Most recent estimate
    pub fn rpm(&self) -> f64 {
        self.last_rpm
    }

    pub fn reset(&mut self) {
        self.last_timestamp = None;
        self.last_rpm = 0.0;
    }
}

/// One entry of the rate-code label table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLabel {
    pub code: i64,
    pub label: String,
}

impl RateLabel {
    pub fn new(code: i64, label: impl Into<String>) -> Self {
        Self {
            code,
            label: label.into(),
        }
    }
}

/// The firmware's RTC sample-rate codes
pub fn default_rate_labels() -> Vec<RateLabel> {
    vec![
        RateLabel::new(0, "500 ms"),
        RateLabel::new(1, "1 s"),
        RateLabel::new(2, "2 s"),
        RateLabel::new(3, "4 s"),
    ]
}

/// Lookup from rate code to display label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLabels {
    labels: BTreeMap<i64, String>,
}

impl RateLabels {
    /// Build a lookup from table entries; later entries win on duplicate codes
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a RateLabel>) -> Self {
        Self {
            labels: entries
                .into_iter()
                .map(|e| (e.code, e.label.clone()))
                .collect(),
        }
    }

    /// Label for a code; unknown codes are shown as the raw number
    pub fn label(&self, code: i64) -> String {
        self.labels
            .get(&code)
            .cloned()
            .unwrap_or_else(|| code.to_string())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Default for RateLabels {
    fn default() -> Self {
        Self::from_entries(&default_rate_labels())
    }
}

/// Unit used to display temperatures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    Celsius,
    #[default]
    Fahrenheit,
    Kelvin,
}

impl TemperatureUnit {
    /// Convert a Celsius value into this unit
    pub fn from_celsius(&self, celsius: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
            TemperatureUnit::Kelvin => celsius + 273.15,
        }
    }

    /// Unit suffix for display
    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
            TemperatureUnit::Kelvin => "K",
        }
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_rpm_formula() {
        // Quarter turn in 20 ms is 12.5 rev/s
        let rpm = rpm_from_delta(PI / 2.0, Duration::from_millis(20));
        assert!((rpm - 750.0).abs() < 1e-9);

        assert_eq!(rpm_from_delta(1.0, Duration::ZERO), 0.0);
    }

    #[test]
    fn test_first_sample_reports_zero() {
        let mut est = SpeedEstimator::new();
        assert_eq!(est.update(Duration::from_millis(100), None), 0.0);

        let rpm = est.update(Duration::from_millis(1100), Some(PI));
        assert!((rpm - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_uses_measured_interval() {
        let mut est = SpeedEstimator::new();
        est.update(Duration::from_millis(0), None);
        // Nominal period is 20 ms but the poll arrived late
        let rpm = est.update(Duration::from_millis(40), Some(PI / 2.0));
        assert!((rpm - 375.0).abs() < 1e-9);
    }

    #[test]
    fn test_reset_returns_to_zero() {
        let mut est = SpeedEstimator::new();
        est.update(Duration::from_secs(1), None);
        est.update(Duration::from_secs(2), Some(1.0));
        est.reset();
        assert_eq!(est.rpm(), 0.0);
        assert_eq!(est.update(Duration::from_secs(3), None), 0.0);
    }

    #[test]
    fn test_default_rate_labels() {
        let labels = RateLabels::default();
        assert_eq!(labels.label(0), "500 ms");
        assert_eq!(labels.label(1), "1 s");
        assert_eq!(labels.label(2), "2 s");
        assert_eq!(labels.label(3), "4 s");
    }

    #[test]
    fn test_unknown_rate_code_shows_raw() {
        let labels = RateLabels::default();
        assert_eq!(labels.label(5), "5");
        assert_eq!(labels.label(-1), "-1");
    }

    #[test]
    fn test_temperature_conversion() {
        assert_eq!(TemperatureUnit::Fahrenheit.from_celsius(25.0), 77.0);
        assert_eq!(TemperatureUnit::Celsius.from_celsius(25.0), 25.0);
        assert!((TemperatureUnit::Kelvin.from_celsius(0.0) - 273.15).abs() < 1e-9);
        assert_eq!(TemperatureUnit::Fahrenheit.to_string(), "°F");
    }
}
