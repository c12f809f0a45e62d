//! Variable sources
//!
//! Live values come from a [`LiveConnector`] / [`LiveBackend`] pair: the
//! connector opens a session for an [`Endpoint`], and the backend binds
//! variable names once and then reads them by handle. Synthetic values come
//! from a [`SyntheticSource`].
//!
//! # Components
//!
//! - [`ProbeConnector`] - probe-rs session for real hardware (feature `probe`)
//! - [`MockConnector`] - Simulated target for testing (feature `mock-probe`)
//! - [`SymbolTable`] - ELF symbol lookup used to resolve variable names
//! - [`AngularSynth`] / [`ThermalSynth`] - Demo signal generators

#[cfg(any(test, feature = "mock-probe"))]
pub mod mock_probe;
#[cfg(feature = "probe")]
pub mod probe;
pub mod probe_trait;
pub mod symbols;
pub mod synthetic;

#[cfg(any(test, feature = "mock-probe"))]
pub use mock_probe::{MockBackend, MockConnector, MockDataPattern, MockTarget};
#[cfg(feature = "probe")]
pub use probe::{ProbeBackend, ProbeConnector};
pub use probe_trait::{Endpoint, LiveBackend, LiveConnector, ProbeStats, VariableHandle};
pub use symbols::{demangle_symbol, SymbolInfo, SymbolTable};
pub use synthetic::{AngularSynth, SyntheticSource, ThermalSynth, ThermalSynthParams};

/// The live connector compiled into this build, if any
#[cfg(feature = "probe")]
pub fn default_connector(settings: &crate::config::ProbeSettings) -> Option<Box<dyn LiveConnector>> {
    Some(Box::new(ProbeConnector::new(settings)))
}

/// The live connector compiled into this build, if any
#[cfg(not(feature = "probe"))]
pub fn default_connector(_settings: &crate::config::ProbeSettings) -> Option<Box<dyn LiveConnector>> {
    None
}
