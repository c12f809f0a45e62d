//! Probe-RS backend for SWD communication
//!
//! This module connects to a debug probe with probe-rs, attaches to the
//! target chip and reads firmware variables straight out of target memory
//! while the core keeps running. Variable names are resolved through the
//! firmware's ELF symbol table.
//!
//! # Supported Probes
//!
//! Any probe supported by probe-rs, including:
//! - ST-Link (V2, V2-1, V3)
//! - J-Link
//! - CMSIS-DAP compatible probes
//! - Raspberry Pi Pico (picoprobe)

use super::probe_trait::{Endpoint, LiveBackend, LiveConnector, ProbeStats, VariableHandle};
use super::symbols::SymbolTable;
use crate::config::{ProbeProtocol, ProbeSettings};
use crate::error::{ConnectError, ReadFault};
use crate::types::VariableDef;
use probe_rs::{probe::list::Lister, MemoryInterface, Permissions, Session};
use std::time::Instant;

/// Opens probe-rs sessions
#[derive(Debug, Clone)]
pub struct ProbeConnector {
    speed_khz: u32,
    protocol: ProbeProtocol,
}

impl ProbeConnector {
    pub fn new(settings: &ProbeSettings) -> Self {
        Self {
            speed_khz: settings.speed_khz,
            protocol: settings.protocol,
        }
    }

    fn attach(&self, endpoint: &Endpoint) -> Result<Session, ConnectError> {
        let lister = Lister::new();
        let probes = lister.list_all();

        if probes.is_empty() {
            tracing::error!("No probes found");
            return Err(ConnectError::NoProbe("no probes found".to_string()));
        }
        tracing::debug!("Found {} probe(s)", probes.len());

        let probe = if let Some(selector) = endpoint.probe_selector.as_deref() {
            let selector_lower = selector.to_lowercase();
            // Match by VID:PID format or serial number
            probes
                .into_iter()
                .find(|p| {
                    let vid_pid = format!("{:04x}:{:04x}", p.vendor_id, p.product_id);
                    vid_pid == selector_lower
                        || p.serial_number
                            .as_ref()
                            .is_some_and(|s| s.to_lowercase().contains(&selector_lower))
                })
                .ok_or_else(|| ConnectError::NoProbe(format!("probe not found: {}", selector)))?
                .open()?
        } else {
            probes
                .first()
                .ok_or_else(|| ConnectError::NoProbe("no probes available".to_string()))?
                .open()?
        };

        let mut probe = probe;
        tracing::debug!("Setting probe speed to {} kHz", self.speed_khz);
        if let Err(e) = probe.set_speed(self.speed_khz) {
            tracing::warn!("Failed to set probe speed: {}", e);
        }

        let protocol = match self.protocol {
            ProbeProtocol::Swd => probe_rs::probe::WireProtocol::Swd,
            ProbeProtocol::Jtag => probe_rs::probe::WireProtocol::Jtag,
        };
        tracing::debug!("Selecting protocol: {:?}", protocol);
        probe.select_protocol(protocol).map_err(|e| {
            tracing::error!("Failed to select protocol: {}", e);
            ConnectError::from(e)
        })?;

        let target = probe_rs::config::Registry::from_builtin_families()
            .get_target_by_name(&endpoint.target_chip).map_err(|e| {
            tracing::error!("Failed to find target '{}': {}", endpoint.target_chip, e);
            ConnectError::from(e)
        })?;

        let session = probe.attach(target, Permissions::default()).map_err(|e| {
            tracing::error!("Attach failed: {}", e);
            ConnectError::from(e)
        })?;
        tracing::info!("Connected to target: {}", endpoint.target_chip);
        Ok(session)
    }
}

impl LiveConnector for ProbeConnector {
    fn open(&self, endpoint: &Endpoint) -> Result<Box<dyn LiveBackend>, ConnectError> {
        tracing::info!(
            "Connecting with config: target={}, speed={}kHz, protocol={:?}, symbols={}",
            endpoint.target_chip,
            self.speed_khz,
            self.protocol,
            endpoint.symbol_file.display()
        );

        // Symbols first so a bad file never touches the probe
        let symbols =
            SymbolTable::load(&endpoint.symbol_file).map_err(|e| ConnectError::SymbolTable {
                path: endpoint.symbol_file.clone(),
                message: e.to_string(),
            })?;

        let session = self.attach(endpoint)?;
        Ok(Box::new(ProbeBackend {
            session: Some(session),
            symbols,
            read_buffer: vec![0u8; 8],
            stats: ProbeStats::default(),
        }))
    }

    fn name(&self) -> &str {
        "probe-rs"
    }
}

/// An attached probe-rs session
pub struct ProbeBackend {
    session: Option<Session>,
    symbols: SymbolTable,
    read_buffer: Vec<u8>,
    stats: ProbeStats,
}

impl LiveBackend for ProbeBackend {
    fn bind(&mut self, definition: &VariableDef) -> Result<VariableHandle, ConnectError> {
        let symbol =
            self.symbols
                .lookup(&definition.name)
                .ok_or_else(|| ConnectError::UnknownSymbol {
                    name: definition.name.clone(),
                })?;

        // Size 0 means the toolchain did not record one
        let required = definition.var_type.size_bytes();
        if symbol.size != 0 && symbol.size < required as u64 {
            return Err(ConnectError::SizeMismatch {
                name: definition.name.clone(),
                symbol_size: symbol.size,
                required,
            });
        }

        tracing::debug!(
            "Bound '{}' at 0x{:08x} as {}",
            definition.name,
            symbol.address,
            definition.var_type
        );
        Ok(VariableHandle {
            name: definition.name.clone(),
            address: symbol.address,
            var_type: definition.var_type,
        })
    }

    fn read(&mut self, handle: &VariableHandle) -> Result<f64, ReadFault> {
        let session = self.session.as_mut().ok_or(ReadFault::NotConnected)?;
        let fault = |message: String| ReadFault::Backend {
            name: handle.name.clone(),
            message,
        };

        let size = handle.var_type.size_bytes();
        if self.read_buffer.len() < size {
            self.read_buffer.resize(size, 0);
        }

        let start = Instant::now();
        let mut core = session
            .core(0)
            .map_err(|e| fault(format!("failed to access core: {}", e)))?;

        match core.read(handle.address, &mut self.read_buffer[..size]) {
            Ok(()) => {
                let micros = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);
                self.stats.record_success(micros, size as u64);
                handle
                    .var_type
                    .parse_to_f64(&self.read_buffer[..size])
                    .ok_or_else(|| fault("failed to parse value".to_string()))
            }
            Err(e) => {
                self.stats.record_failure();
                Err(fault(format!("memory read at 0x{:08x}: {}", handle.address, e)))
            }
        }
    }

    fn disconnect(&mut self) {
        if self.session.take().is_some() {
            tracing::info!("Disconnected from probe");
        }
    }

    fn stats(&self) -> &ProbeStats {
        &self.stats
    }
}

impl Drop for ProbeBackend {
    fn drop(&mut self) {
        self.disconnect();
    }
}
