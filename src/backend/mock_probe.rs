//! Mock Probe Implementation for Testing
//!
//! This module provides a simulated target that can be used for testing the
//! pipelines without real hardware. Each firmware variable is driven by a
//! [`MockDataPattern`], and the shared [`MockTarget`] exposes fault-injection
//! hooks (failed opens, failed reads) for exercising error paths.
//!
//! # Example
//!
//! ```ignore
//! use sensorscope::backend::mock_probe::{MockConnector, MockDataPattern, MockTarget};
//!
//! let target = MockTarget::new(clock.clone())
//!     .with_variable("resolver_position", 4, MockDataPattern::Constant(0.5));
//! let connector = MockConnector::new(target);
//! let handle = connector.target();
//!
//! provider.set_connector(Box::new(connector));
//! handle.fail_next_reads(3);
//! ```
//!
//! # Enabling
//!
//! Outside of unit tests the mock probe is only available when the
//! `mock-probe` feature is enabled:
//!
//! ```bash
//! cargo run --features mock-probe -- angular --mock
//! ```

use super::probe_trait::{Endpoint, LiveBackend, LiveConnector, ProbeStats, VariableHandle};
use crate::clock::Clock;
use crate::error::{ConnectError, ReadFault};
use crate::processing::unwrap::wrap_angle;
use crate::types::VariableDef;
use std::collections::HashMap;
use std::f64::consts::TAU;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// Pattern for generating mock data
#[derive(Debug, Clone, PartialEq)]
pub enum MockDataPattern {
    /// Constant value
    Constant(f64),
    /// Sine wave
    Sine {
        frequency: f64,
        amplitude: f64,
        offset: f64,
        phase: f64,
    },
    /// Rotating angle wrapped into (-π, π]
    Angle { frequency: f64 },
    /// Counter that steps once per read and wraps
    Counter { step: f64, min: f64, max: f64 },
    /// Sawtooth wave
    Sawtooth { period: f64, amplitude: f64 },
    /// Fixed list of values, one per read; the last value repeats
    Sequence(Vec<f64>),
}

impl Default for MockDataPattern {
    fn default() -> Self {
        MockDataPattern::Constant(0.0)
    }
}

/// A simulated firmware variable
#[derive(Debug, Clone)]
struct MockVariable {
    address: u64,
    size: u64,
    pattern: MockDataPattern,
    reads: usize,
    counter_value: f64,
}

impl MockVariable {
    fn generate_value(&mut self, elapsed_secs: f64) -> f64 {
        let value = match &self.pattern {
            MockDataPattern::Constant(v) => *v,
            MockDataPattern::Sine {
                frequency,
                amplitude,
                offset,
                phase,
            } => offset + amplitude * (TAU * frequency * elapsed_secs + phase).sin(),
            MockDataPattern::Angle { frequency } => wrap_angle(TAU * frequency * elapsed_secs),
            MockDataPattern::Counter { step, min, max } => {
                let value = self.counter_value;
                self.counter_value += step;
                if self.counter_value > *max {
                    self.counter_value = *min;
                } else if self.counter_value < *min {
                    self.counter_value = *max;
                }
                value
            }
            MockDataPattern::Sawtooth { period, amplitude } => {
                let t = elapsed_secs % period;
                amplitude * (t / period)
            }
            MockDataPattern::Sequence(values) => values
                .get(self.reads)
                .or_else(|| values.last())
                .copied()
                .unwrap_or(0.0),
        };
        self.reads += 1;
        value
    }
}

/// Shared state of the simulated target
#[derive(Debug)]
struct TargetState {
    variables: HashMap<String, MockVariable>,
    next_address: u64,
    open_error: Option<String>,
    pending_read_failures: u32,
    opens: u32,
    sessions_live: u32,
}

/// Handle to a simulated target, shared between a test and its connector
#[derive(Clone)]
pub struct MockTarget {
    clock: Arc<dyn Clock>,
    start: Instant,
    state: Arc<Mutex<TargetState>>,
}

impl MockTarget {
    /// Create an empty target whose patterns run on `clock`
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let start = clock.now();
        Self {
            clock,
            start,
            state: Arc::new(Mutex::new(TargetState {
                variables: HashMap::new(),
                next_address: 0x2000_0000,
                open_error: None,
                pending_read_failures: 0,
                opens: 0,
                sessions_live: 0,
            })),
        }
    }

    /// Resolver firmware turning at `frequency` Hz
    pub fn resolver(clock: Arc<dyn Clock>, frequency: f64) -> Self {
        Self::new(clock)
            .with_variable(
                "sin_calibrated",
                4,
                MockDataPattern::Sine {
                    frequency,
                    amplitude: 1.0,
                    offset: 0.0,
                    phase: 0.0,
                },
            )
            .with_variable(
                "cos_calibrated",
                4,
                MockDataPattern::Sine {
                    frequency,
                    amplitude: 1.0,
                    offset: 0.0,
                    phase: TAU / 4.0,
                },
            )
            .with_variable("resolver_position", 4, MockDataPattern::Angle { frequency })
    }

    /// Temperature firmware cycling through its sample-rate codes
    pub fn thermal(clock: Arc<dyn Clock>) -> Self {
        Self::new(clock)
            .with_variable(
                "TemperatureValueX2C",
                1,
                MockDataPattern::Sine {
                    frequency: 0.05,
                    amplitude: 4.0,
                    offset: 31.0,
                    phase: 0.0,
                },
            )
            .with_variable(
                "tempSampleRate",
                4,
                MockDataPattern::Counter {
                    step: 0.02,
                    min: 0.0,
                    max: 3.99,
                },
            )
    }

    /// Add a variable of `size` bytes driven by `pattern`
    pub fn with_variable(self, name: &str, size: u64, pattern: MockDataPattern) -> Self {
        {
            let mut state = self.lock();
            let address = state.next_address;
            state.next_address += size.max(4);
            let counter_value = match pattern {
                MockDataPattern::Counter { min, .. } => min,
                _ => 0.0,
            };
            state.variables.insert(
                name.to_string(),
                MockVariable {
                    address,
                    size,
                    pattern,
                    reads: 0,
                    counter_value,
                },
            );
        }
        self
    }

    fn lock(&self) -> MutexGuard<'_, TargetState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace a variable's pattern with a constant
    pub fn set_value(&self, name: &str, value: f64) {
        self.set_pattern(name, MockDataPattern::Constant(value));
    }

    /// Replace a variable's pattern
    pub fn set_pattern(&self, name: &str, pattern: MockDataPattern) {
        if let Some(var) = self.lock().variables.get_mut(name) {
            var.pattern = pattern;
            var.reads = 0;
        }
    }

    /// Make the next `count` reads fail
    pub fn fail_next_reads(&self, count: u32) {
        self.lock().pending_read_failures = count;
    }

    /// Make every open fail with `message` until cleared with `None`
    pub fn fail_open(&self, message: Option<&str>) {
        self.lock().open_error = message.map(str::to_string);
    }

    /// Number of successful opens so far
    pub fn open_count(&self) -> u32 {
        self.lock().opens
    }

    /// Sessions opened and not yet disconnected or dropped
    pub fn live_sessions(&self) -> u32 {
        self.lock().sessions_live
    }
}

/// Connector that opens sessions against a [`MockTarget`]
pub struct MockConnector {
    target: MockTarget,
}

impl MockConnector {
    pub fn new(target: MockTarget) -> Self {
        Self { target }
    }

    /// Handle for steering the target while the connector is owned elsewhere
    pub fn target(&self) -> MockTarget {
        self.target.clone()
    }
}

impl LiveConnector for MockConnector {
    fn open(&self, endpoint: &Endpoint) -> Result<Box<dyn LiveBackend>, ConnectError> {
        {
            let mut state = self.target.lock();
            if let Some(message) = &state.open_error {
                return Err(ConnectError::NoProbe(message.clone()));
            }
            state.opens += 1;
            state.sessions_live += 1;
        }
        tracing::info!("Mock probe connected to target: {}", endpoint.target_chip);
        Ok(Box::new(MockBackend {
            target: self.target.clone(),
            connected: true,
            stats: ProbeStats::default(),
        }))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// An open session on a [`MockTarget`]
pub struct MockBackend {
    target: MockTarget,
    connected: bool,
    stats: ProbeStats,
}

impl LiveBackend for MockBackend {
    fn bind(&mut self, definition: &VariableDef) -> Result<VariableHandle, ConnectError> {
        let state = self.target.lock();
        let var = state
            .variables
            .get(&definition.name)
            .ok_or_else(|| ConnectError::UnknownSymbol {
                name: definition.name.clone(),
            })?;

        let required = definition.var_type.size_bytes();
        if var.size < required as u64 {
            return Err(ConnectError::SizeMismatch {
                name: definition.name.clone(),
                symbol_size: var.size,
                required,
            });
        }

        Ok(VariableHandle {
            name: definition.name.clone(),
            address: var.address,
            var_type: definition.var_type,
        })
    }

    fn read(&mut self, handle: &VariableHandle) -> Result<f64, ReadFault> {
        if !self.connected {
            return Err(ReadFault::NotConnected);
        }

        let elapsed = self
            .target
            .clock
            .now()
            .saturating_duration_since(self.target.start)
            .as_secs_f64();

        let mut state = self.target.lock();
        if state.pending_read_failures > 0 {
            state.pending_read_failures -= 1;
            self.stats.record_failure();
            return Err(ReadFault::Backend {
                name: handle.name.clone(),
                message: "simulated read failure".to_string(),
            });
        }

        let var = state
            .variables
            .get_mut(&handle.name)
            .ok_or_else(|| ReadFault::Backend {
                name: handle.name.clone(),
                message: "variable removed from target".to_string(),
            })?;
        let value = var.generate_value(elapsed);
        self.stats
            .record_success(0, handle.var_type.size_bytes() as u64);
        Ok(value)
    }

    fn disconnect(&mut self) {
        if self.connected {
            self.connected = false;
            let mut state = self.target.lock();
            state.sessions_live = state.sessions_live.saturating_sub(1);
            tracing::info!("Mock probe disconnected");
        }
    }

    fn stats(&self) -> &ProbeStats {
        &self.stats
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.disconnect();
    }
}
