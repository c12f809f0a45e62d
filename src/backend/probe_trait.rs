//! Live backend traits
//!
//! A [`LiveConnector`] opens a session against real (or simulated) hardware
//! and hands back a [`LiveBackend`]. The backend resolves variable names to
//! [`VariableHandle`]s once at connect time and then reads them by handle on
//! every poll.

use crate::error::{ConnectError, ReadFault};
use crate::types::{VariableDef, VariableType};
use std::path::PathBuf;

/// Where and how to connect
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Endpoint {
    /// Optional probe selector (`VID:PID` or a serial number fragment)
    pub probe_selector: Option<String>,
    /// Target chip name (e.g. "STM32F407VGTx")
    pub target_chip: String,
    /// Firmware image used to resolve variable names
    pub symbol_file: PathBuf,
}

impl Endpoint {
    pub fn new(target_chip: impl Into<String>, symbol_file: impl Into<PathBuf>) -> Self {
        Self {
            probe_selector: None,
            target_chip: target_chip.into(),
            symbol_file: symbol_file.into(),
        }
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.probe_selector = Some(selector.into());
        self
    }
}

/// A variable resolved against the firmware image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableHandle {
    /// Name as requested
    pub name: String,
    /// Target memory address
    pub address: u64,
    /// Memory representation used to decode reads
    pub var_type: VariableType,
}

/// Statistics for backend read operations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeStats {
    /// Total number of successful reads
    pub successful_reads: u64,
    /// Total number of failed reads
    pub failed_reads: u64,
    /// Total read time in microseconds
    pub total_read_time_us: u64,
    /// Last read time in microseconds
    pub last_read_time_us: u64,
    /// Maximum read time observed (microseconds)
    pub max_read_time_us: u64,
    /// Total bytes read
    pub total_bytes_read: u64,
}

impl ProbeStats {
    /// Calculate average read time in microseconds
    pub fn avg_read_time_us(&self) -> f64 {
        if self.successful_reads == 0 {
            0.0
        } else {
            self.total_read_time_us as f64 / self.successful_reads as f64
        }
    }

    /// Calculate success rate as percentage
    pub fn success_rate(&self) -> f64 {
        let total = self.successful_reads + self.failed_reads;
        if total == 0 {
            100.0
        } else {
            (self.successful_reads as f64 / total as f64) * 100.0
        }
    }

    /// Record a successful read operation
    pub fn record_success(&mut self, time_us: u64, bytes: u64) {
        self.successful_reads += 1;
        self.total_read_time_us = self.total_read_time_us.saturating_add(time_us);
        self.last_read_time_us = time_us;
        self.max_read_time_us = self.max_read_time_us.max(time_us);
        self.total_bytes_read += bytes;
    }

    /// Record a failed read operation
    pub fn record_failure(&mut self) {
        self.failed_reads += 1;
    }

    /// Reset all statistics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Something that can open a live session
pub trait LiveConnector: Send {
    /// Open a backend for `endpoint`
    ///
    /// Nothing is bound yet; the caller binds each variable afterwards.
    fn open(&self, endpoint: &Endpoint) -> Result<Box<dyn LiveBackend>, ConnectError>;

    /// Short description for logs
    fn name(&self) -> &str;
}

/// An open live session
///
/// Implementations must be `Send` so a session can be handed to another
/// thread by hosts that need it.
#[cfg_attr(test, mockall::automock)]
pub trait LiveBackend: Send {
    /// Resolve a variable definition to a readable handle
    fn bind(&mut self, definition: &VariableDef) -> Result<VariableHandle, ConnectError>;

    /// Read the current raw value of a bound variable
    fn read(&mut self, handle: &VariableHandle) -> Result<f64, ReadFault>;

    /// Release the session
    fn disconnect(&mut self);

    /// Read statistics since the session was opened
    fn stats(&self) -> &ProbeStats;
}
