//! Error handling for sensorscope
//!
//! This module defines the crate-wide error type, the connect-time
//! [`ConnectError`] and the steady-state [`ReadFault`], plus a Result alias
//! for use throughout the library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for sensorscope operations
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Errors related to probe/SWD operations
    #[cfg(feature = "probe")]
    #[error("Probe error: {0}")]
    Probe(#[from] probe_rs::Error),

    /// Errors related to debug probe operations
    #[cfg(feature = "probe")]
    #[error("Debug probe error: {0}")]
    DebugProbe(#[from] probe_rs::probe::DebugProbeError),

    /// Errors related to target registry
    #[cfg(feature = "probe")]
    #[error("Registry error: {0}")]
    Registry(#[from] probe_rs::config::RegistryError),

    /// Errors raised while connecting a signal provider
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to ELF file parsing
    #[error("ELF parsing error: {0}")]
    ElfParsing(String),

    /// History buffer invariant violations
    #[error("History error: {0}")]
    History(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<MonitorError>,
    },
}

impl MonitorError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        MonitorError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Failure to bind a signal provider against a live backend
///
/// A connect that fails with this error leaves the provider exactly as it was
/// before the attempt.
#[derive(Error, Debug)]
pub enum ConnectError {
    /// No debug probe was found or matched the selector
    #[error("No probe available: {0}")]
    NoProbe(String),

    /// The symbol table could not be loaded
    #[error("Failed to load symbol table {path:?}: {message}")]
    SymbolTable { path: PathBuf, message: String },

    /// A named variable is not present in the symbol table
    #[error("Variable '{name}' not found in symbol table")]
    UnknownSymbol { name: String },

    /// The symbol is smaller than the type it was declared as
    #[error("Variable '{name}' is {symbol_size} bytes but its declared type needs {required}")]
    SizeMismatch {
        name: String,
        symbol_size: u64,
        required: usize,
    },

    /// The wrong number of variable definitions was supplied
    #[error("Expected {expected} variable definitions, got {actual}")]
    DefinitionCount { expected: usize, actual: usize },

    /// Underlying backend failure (probe open, attach, IO)
    #[error("Backend error: {0}")]
    Backend(#[source] Box<MonitorError>),
}

impl From<MonitorError> for ConnectError {
    fn from(err: MonitorError) -> Self {
        match err {
            MonitorError::Connect(inner) => inner,
            other => ConnectError::Backend(Box::new(other)),
        }
    }
}

#[cfg(feature = "probe")]
impl From<probe_rs::Error> for ConnectError {
    fn from(err: probe_rs::Error) -> Self {
        MonitorError::from(err).into()
    }
}

#[cfg(feature = "probe")]
impl From<probe_rs::probe::DebugProbeError> for ConnectError {
    fn from(err: probe_rs::probe::DebugProbeError) -> Self {
        MonitorError::from(err).into()
    }
}

#[cfg(feature = "probe")]
impl From<probe_rs::config::RegistryError> for ConnectError {
    fn from(err: probe_rs::config::RegistryError) -> Self {
        MonitorError::from(err).into()
    }
}

/// A read from a bound variable failed after connecting
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReadFault {
    /// The backend reported an error for this variable
    #[error("Read of '{name}' failed: {message}")]
    Backend { name: String, message: String },

    /// The backend returned NaN or an infinity
    #[error("Read of '{name}' returned a non-finite value")]
    NonFinite { name: String },

    /// The backend session is gone
    #[error("Live backend is not connected")]
    NotConnected,
}

/// Result type alias for sensorscope operations
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MonitorError::Config("poll period must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: poll period must be positive"
        );
    }

    #[test]
    fn test_error_with_context() {
        let err = MonitorError::History("test".to_string());
        let with_ctx = err.with_context("Failed to push row");
        assert!(with_ctx.to_string().contains("Failed to push row"));
    }

    #[test]
    fn test_connect_error_unwraps_from_monitor_error() {
        let inner = ConnectError::UnknownSymbol {
            name: "resolver_position".to_string(),
        };
        let converted: ConnectError = MonitorError::Connect(inner).into();
        assert!(matches!(converted, ConnectError::UnknownSymbol { ref name } if name == "resolver_position"));

        let wrapped: ConnectError = MonitorError::ElfParsing("bad magic".to_string()).into();
        assert!(matches!(wrapped, ConnectError::Backend(_)));
        assert!(wrapped.to_string().contains("bad magic"));
    }

    #[test]
    fn test_read_fault_display() {
        let fault = ReadFault::NonFinite {
            name: "sin_calibrated".to_string(),
        };
        assert!(fault.to_string().contains("sin_calibrated"));
    }
}
