//! Temperature pipeline
//!
//! Keeps a temperature history in °C and derives the display temperature
//! and the label of the firmware's sample-rate code.

use super::display::{Derived, DisplaySink};
use super::poll_loop::{LoopSettings, PollLoop, Processed, Stages};
use crate::backend::synthetic::DEFAULT_NOISE_SEED;
use crate::backend::{LiveConnector, ThermalSynth};
use crate::clock::Clock;
use crate::config::ThermalConfig;
use crate::processing::rate::{RateLabels, TemperatureUnit};
use crate::provider::SignalProvider;
use crate::types::ThermalReading;
use std::sync::Arc;
use std::time::Duration;

/// Display mapping for temperature readings
#[derive(Debug, Clone, Default)]
pub struct ThermalStages {
    labels: RateLabels,
    unit: TemperatureUnit,
}

impl ThermalStages {
    pub fn new(labels: RateLabels, unit: TemperatureUnit) -> Self {
        Self { labels, unit }
    }
}

impl Stages for ThermalStages {
    type Synth = ThermalSynth;

    const HISTORY_CHANNELS: &'static [&'static str] = &["temperature_c"];

    fn process(&mut self, reading: &ThermalReading, _timestamp: Duration) -> Processed {
        Processed {
            row: vec![reading.temperature_c],
            derived: Derived::Thermal {
                temperature: self.unit.from_celsius(reading.temperature_c),
                unit: self.unit,
                rate_code: reading.rate_code,
                rate_label: self.labels.label(reading.rate_code),
            },
        }
    }

    // Stateless between samples
    fn reset(&mut self) {}
}

/// Poll loop for the temperature sensor
pub type ThermalLoop = PollLoop<ThermalStages>;

/// Build the temperature loop from its config section
pub fn thermal_loop(
    config: &ThermalConfig,
    connector: Option<Box<dyn LiveConnector>>,
    display: Box<dyn DisplaySink>,
    clock: Arc<dyn Clock>,
) -> ThermalLoop {
    let synth = ThermalSynth::new(clock.clone(), config.synth_params())
        .with_noise(config.demo_noise, DEFAULT_NOISE_SEED);
    let provider = SignalProvider::new(synth, connector, clock.clone());
    PollLoop::new(
        provider,
        ThermalStages::new(
            RateLabels::from_entries(&config.rate_labels),
            config.display_unit,
        ),
        display,
        clock,
        LoopSettings {
            period: config.poll_period(),
            history_capacity: config.history_capacity,
            fault_limit: config.fault_limit,
            definitions: config.variables.clone(),
        },
    )
}
