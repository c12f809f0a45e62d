//! Signal provider
//!
//! [`SignalProvider`] hides where readings come from. It reads a bound live
//! backend while connected and falls back to its synthetic source otherwise.
//! The live/demo choice is made at connect time and never changes mid-session.

use crate::backend::{Endpoint, LiveBackend, LiveConnector, ProbeStats, SyntheticSource, VariableHandle};
use crate::clock::Clock;
use crate::error::{ConnectError, ReadFault};
use crate::types::{Reading, Sample, SourceState, VariableDef};
use std::sync::Arc;

/// A bound live backend plus the scale of each bound variable
struct LiveSession {
    backend: Box<dyn LiveBackend>,
    bindings: Vec<(VariableHandle, f64)>,
}

impl LiveSession {
    fn bind_all(
        mut backend: Box<dyn LiveBackend>,
        definitions: &[VariableDef],
    ) -> Result<Self, ConnectError> {
        let mut bindings = Vec::with_capacity(definitions.len());
        for def in definitions {
            match backend.bind(def) {
                Ok(handle) => bindings.push((handle, def.scale)),
                Err(e) => {
                    backend.disconnect();
                    return Err(e);
                }
            }
        }
        Ok(Self { backend, bindings })
    }

    fn read_values(&mut self) -> Result<Vec<f64>, ReadFault> {
        let mut values = Vec::with_capacity(self.bindings.len());
        for (handle, scale) in &self.bindings {
            let value = self.backend.read(handle)? * scale;
            if !value.is_finite() {
                return Err(ReadFault::NonFinite {
                    name: handle.name.clone(),
                });
            }
            values.push(value);
        }
        Ok(values)
    }
}

/// Source of readings for one pipeline
pub struct SignalProvider<S: SyntheticSource> {
    synthetic: S,
    connector: Option<Box<dyn LiveConnector>>,
    session: Option<LiveSession>,
    clock: Arc<dyn Clock>,
    state: SourceState,
}

impl<S: SyntheticSource> SignalProvider<S> {
    /// Create a provider. Without a connector it can only produce demo data.
    pub fn new(
        synthetic: S,
        connector: Option<Box<dyn LiveConnector>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let state = if connector.is_some() {
            SourceState::Disconnected
        } else {
            SourceState::DemoFallback
        };
        Self {
            synthetic,
            connector,
            session: None,
            clock,
            state,
        }
    }

    /// Current source state
    pub fn state(&self) -> SourceState {
        self.state
    }

    /// Whether a live connector is available
    pub fn has_live_capability(&self) -> bool {
        self.connector.is_some()
    }

    /// Read statistics of the bound backend, if connected
    pub fn stats(&self) -> Option<&ProbeStats> {
        self.session.as_ref().map(|s| s.backend.stats())
    }

    /// Bind every definition against a fresh live backend
    ///
    /// Without live capability this is a no-op that stays in demo mode. The
    /// new session is fully bound before the current one is released, so a
    /// failed attempt leaves the provider exactly as it was and never keeps a
    /// partial bind.
    pub fn connect(
        &mut self,
        endpoint: &Endpoint,
        definitions: &[VariableDef],
    ) -> Result<(), ConnectError> {
        let Some(connector) = self.connector.as_ref() else {
            tracing::info!("No live backend available; staying in demo mode");
            return Ok(());
        };

        let expected = S::Output::CHANNELS.len();
        if definitions.len() != expected {
            return Err(ConnectError::DefinitionCount {
                expected,
                actual: definitions.len(),
            });
        }

        let backend = connector.open(endpoint)?;
        let session = LiveSession::bind_all(backend, definitions)?;
        tracing::info!(
            "Bound {} variables via {}",
            session.bindings.len(),
            connector.name()
        );

        self.release_session();
        self.session = Some(session);
        self.state = SourceState::Connected;
        Ok(())
    }

    /// Release the live backend, if any
    pub fn disconnect(&mut self) {
        self.release_session();
        self.state = if self.connector.is_some() {
            SourceState::Disconnected
        } else {
            SourceState::DemoFallback
        };
    }

    fn release_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.backend.disconnect();
        }
    }

    /// Acquire one sample
    ///
    /// Only reads from a connected live backend can fail.
    pub fn read(&mut self) -> Result<Sample<S::Output>, ReadFault> {
        let acquired = self.clock.now();
        let reading = match (self.state, self.session.as_mut()) {
            (SourceState::Connected, Some(session)) => {
                S::Output::from_raw(&session.read_values()?)
            }
            (SourceState::Connected, None) => return Err(ReadFault::NotConnected),
            _ => self.synthetic.read(),
        };
        Ok(Sample::new(acquired, reading))
    }
}
