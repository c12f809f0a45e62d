//! Synthetic signal sources
//!
//! Used when no live backend is available or bound. Both generators read
//! time from an injected [`Clock`], so tests can step time by hand.

use crate::clock::Clock;
use crate::processing::unwrap::wrap_angle;
use crate::types::{AngularReading, Reading, ThermalReading};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::TAU;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Seed for the demo noise generator
pub const DEFAULT_NOISE_SEED: u64 = 0x5eed_5c09;

/// A source of fabricated readings
pub trait SyntheticSource {
    type Output: Reading;

    /// Produce the next reading. Never fails.
    fn read(&mut self) -> Self::Output;
}

/// Uniform noise in `[-amplitude, amplitude]`, or nothing when amplitude is 0
#[derive(Debug, Clone)]
struct Noise {
    amplitude: f64,
    rng: StdRng,
}

impl Noise {
    fn new(amplitude: f64, seed: u64) -> Self {
        Self {
            amplitude,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn sample(&mut self) -> f64 {
        if self.amplitude > 0.0 {
            self.rng.gen_range(-self.amplitude..=self.amplitude)
        } else {
            0.0
        }
    }
}

/// Rotating resolver at a fixed frequency
pub struct AngularSynth {
    clock: Arc<dyn Clock>,
    frequency_hz: f64,
    phase: f64,
    last: Instant,
    noise: Noise,
}

impl AngularSynth {
    pub fn new(clock: Arc<dyn Clock>, frequency_hz: f64) -> Self {
        let last = clock.now();
        Self {
            clock,
            frequency_hz,
            phase: 0.0,
            last,
            noise: Noise::new(0.0, DEFAULT_NOISE_SEED),
        }
    }

    /// Add uniform noise to sine and cosine. The angle stays clean.
    pub fn with_noise(mut self, amplitude: f64, seed: u64) -> Self {
        self.noise = Noise::new(amplitude, seed);
        self
    }

    /// Current phase in [0, 2π)
    pub fn phase(&self) -> f64 {
        self.phase
    }
}

impl SyntheticSource for AngularSynth {
    type Output = AngularReading;

    fn read(&mut self) -> AngularReading {
        let now = self.clock.now();
        let dt = now.saturating_duration_since(self.last).as_secs_f64();
        self.last = now;

        self.phase = (self.phase + TAU * self.frequency_hz * dt).rem_euclid(TAU);

        AngularReading {
            sine: self.phase.sin() + self.noise.sample(),
            cosine: self.phase.cos() + self.noise.sample(),
            angle: wrap_angle(self.phase),
        }
    }
}

/// Parameters for [`ThermalSynth`]
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalSynthParams {
    /// Mean temperature in °C
    pub base_c: f64,
    /// Swing around the mean in °C
    pub amplitude_c: f64,
    /// A gap between reads longer than this advances the rate code
    pub rate_change_gap: Duration,
    /// Number of distinct rate codes
    pub rate_codes: u32,
}

impl Default for ThermalSynthParams {
    fn default() -> Self {
        Self {
            base_c: 25.0,
            amplitude_c: 5.0,
            rate_change_gap: Duration::from_millis(1500),
            rate_codes: 4,
        }
    }
}

/// Slowly oscillating temperature sensor
pub struct ThermalSynth {
    clock: Arc<dyn Clock>,
    params: ThermalSynthParams,
    origin: Instant,
    last: Instant,
    rate_code: i64,
    noise: Noise,
}

impl ThermalSynth {
    pub fn new(clock: Arc<dyn Clock>, params: ThermalSynthParams) -> Self {
        let origin = clock.now();
        Self {
            clock,
            params,
            origin,
            last: origin,
            rate_code: 0,
            noise: Noise::new(0.0, DEFAULT_NOISE_SEED),
        }
    }

    /// Add uniform noise to the temperature
    pub fn with_noise(mut self, amplitude: f64, seed: u64) -> Self {
        self.noise = Noise::new(amplitude, seed);
        self
    }
}

impl SyntheticSource for ThermalSynth {
    type Output = ThermalReading;

    fn read(&mut self) -> ThermalReading {
        let now = self.clock.now();
        let gap = now.saturating_duration_since(self.last);
        self.last = now;

        if gap > self.params.rate_change_gap && self.params.rate_codes > 0 {
            self.rate_code = (self.rate_code + 1) % i64::from(self.params.rate_codes);
        }

        let t = now.saturating_duration_since(self.origin).as_secs_f64();
        ThermalReading {
            temperature_c: self.params.base_c
                + self.params.amplitude_c * t.sin()
                + self.noise.sample(),
            rate_code: self.rate_code,
        }
    }
}
