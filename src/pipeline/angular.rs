//! Resolver pipeline
//!
//! Plots sine, cosine and angle/π, and derives angle in degrees, speed in
//! RPM and the continuous turn count.

use super::display::{Derived, DisplaySink};
use super::poll_loop::{LoopSettings, PollLoop, Processed, Stages};
use crate::backend::{AngularSynth, LiveConnector};
use crate::clock::Clock;
use crate::config::AngularConfig;
use crate::processing::rate::SpeedEstimator;
use crate::processing::unwrap::TurnCounter;
use crate::provider::SignalProvider;
use crate::types::AngularReading;
use std::f64::consts::PI;
use std::sync::Arc;
use std::time::Duration;

/// Unwrap and speed stages for the resolver
#[derive(Debug, Clone, Default)]
pub struct AngularStages {
    counter: TurnCounter,
    speed: SpeedEstimator,
}

impl AngularStages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ambiguous_threshold(threshold: f64) -> Self {
        Self {
            counter: TurnCounter::with_ambiguous_threshold(threshold),
            speed: SpeedEstimator::new(),
        }
    }

    pub fn turn_counter(&self) -> &TurnCounter {
        &self.counter
    }
}

impl Stages for AngularStages {
    type Synth = AngularSynth;

    const HISTORY_CHANNELS: &'static [&'static str] = &["sine", "cosine", "angle_over_pi"];

    fn process(&mut self, reading: &AngularReading, timestamp: Duration) -> Processed {
        let step = self.counter.update(reading.angle);
        let speed_rpm = self.speed.update(timestamp, step.delta);

        Processed {
            row: vec![reading.sine, reading.cosine, reading.angle / PI],
            derived: Derived::Angular {
                angle_deg: reading.angle.to_degrees(),
                speed_rpm,
                turns: step.turns,
            },
        }
    }

    fn reset(&mut self) {
        self.counter.reset();
        self.speed.reset();
    }
}

/// Poll loop for the resolver
pub type AngularLoop = PollLoop<AngularStages>;

/// Build the resolver loop from its config section
pub fn angular_loop(
    config: &AngularConfig,
    connector: Option<Box<dyn LiveConnector>>,
    display: Box<dyn DisplaySink>,
    clock: Arc<dyn Clock>,
) -> AngularLoop {
    let synth = AngularSynth::new(clock.clone(), config.demo_frequency_hz)
        .with_noise(config.demo_noise, crate::backend::synthetic::DEFAULT_NOISE_SEED);
    let provider = SignalProvider::new(synth, connector, clock.clone());
    PollLoop::new(
        provider,
        AngularStages::with_ambiguous_threshold(config.ambiguous_threshold_rad),
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
