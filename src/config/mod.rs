//! Configuration module for sensorscope
//!
//! Settings live in a single TOML file with one section per concern:
//!
//! ```toml
//! [probe]
//! target_chip = "STM32F407VGTx"
//! symbol_file = "firmware.elf"
//!
//! [angular]
//! poll_period_ms = 20
//! history_capacity = 1000
//!
//! [thermal]
//! display_unit = "fahrenheit"
//!
//! [logging]
//! filter = "info,sensorscope=debug"
//! ```
//!
//! Every field has a default, so a partial (or missing) file is fine.
//!
//! # Config Location
//!
//! - **Linux**: `~/.config/sensorscope/config.toml`
//! - **macOS**: `~/Library/Application Support/sensorscope/config.toml`
//! - **Windows**: `%APPDATA%\sensorscope\config.toml`

use crate::backend::{Endpoint, ThermalSynthParams};
use crate::error::{MonitorError, Result, ResultExt};
use crate::processing::rate::{default_rate_labels, RateLabel, TemperatureUnit};
use crate::processing::unwrap::DEFAULT_AMBIGUOUS_THRESHOLD;
use crate::types::{VariableDef, VariableType};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application directory name under the platform config dir
pub const APP_DIR: &str = "sensorscope";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Default consecutive read faults before the loop disconnects itself
pub const DEFAULT_FAULT_LIMIT: u32 = 3;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MonitorConfig {
    pub probe: ProbeSettings,
    pub angular: AngularConfig,
    pub thermal: ThermalConfig,
    pub logging: LoggingConfig,
}

impl MonitorConfig {
    /// Platform default path of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::config_dir().map(|p| p.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(MonitorError::from)
            .with_context(|| format!("Failed to read config file {:?}", path))?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            MonitorError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;
        config
            .validate()
            .with_context(|| format!("Invalid config file {:?}", path))?;
        Ok(config)
    }

    /// Load a config file, falling back to defaults if it is missing or invalid
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save as TOML, creating the parent directory if needed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                MonitorError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| MonitorError::Serialization(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(MonitorError::from)
            .with_context(|| format!("Failed to write config file {:?}", path))
    }

    /// Reject settings the pipelines cannot run with
    pub fn validate(&self) -> Result<()> {
        self.angular.validate()?;
        self.thermal.validate()
    }
}

fn check_positive(section: &str, field: &str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(MonitorError::Config(format!(
            "[{}] {} must be greater than zero",
            section, field
        )));
    }
    Ok(())
}

fn check_non_negative(section: &str, field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(MonitorError::Config(format!(
            "[{}] {} must be a finite, non-negative number (got {})",
            section, field, value
        )));
    }
    Ok(())
}

// ==================== Probe Config ====================

/// Debug probe connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    /// Probe selector (`VID:PID` or serial number); first probe when unset
    pub selector: Option<String>,

    /// Target chip name
    pub target_chip: String,

    /// SWD/JTAG clock speed in kHz
    pub speed_khz: u32,

    /// Wire protocol
    pub protocol: ProbeProtocol,

    /// Firmware image used to resolve variable names
    pub symbol_file: Option<PathBuf>,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            selector: None,
            target_chip: "STM32F407VGTx".to_string(),
            speed_khz: 4000,
            protocol: ProbeProtocol::Swd,
            symbol_file: None,
        }
    }
}

impl ProbeSettings {
    /// Connection endpoint, if a symbol file is configured
    pub fn endpoint(&self) -> Option<Endpoint> {
        let symbol_file = self.symbol_file.clone()?;
        Some(Endpoint {
            probe_selector: self.selector.clone(),
            target_chip: self.target_chip.clone(),
            symbol_file,
        })
    }
}

/// Probe protocol options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProbeProtocol {
    /// Serial Wire Debug
    #[default]
    Swd,
    /// JTAG
    Jtag,
}

impl std::fmt::Display for ProbeProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeProtocol::Swd => write!(f, "SWD"),
            ProbeProtocol::Jtag => write!(f, "JTAG"),
        }
    }
}

// ==================== Pipeline Config ====================

/// Resolver pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AngularConfig {
    pub poll_period_ms: u64,
    pub history_capacity: usize,
    pub fault_limit: u32,
    /// Steps larger than this (radians) are flagged as ambiguous
    pub ambiguous_threshold_rad: f64,
    /// Rotation frequency of the demo source
    pub demo_frequency_hz: f64,
    /// Uniform noise added to demo sine/cosine
    pub demo_noise: f64,
    /// Sine, cosine and angle variables, in that order
    pub variables: Vec<VariableDef>,
}

impl Default for AngularConfig {
    fn default() -> Self {
        Self {
            poll_period_ms: 20,
            history_capacity: 1000,
            fault_limit: DEFAULT_FAULT_LIMIT,
            ambiguous_threshold_rad: DEFAULT_AMBIGUOUS_THRESHOLD,
            demo_frequency_hz: 1.0,
            demo_noise: 0.0,
            variables: vec![
                VariableDef::new("sin_calibrated", VariableType::F32),
                VariableDef::new("cos_calibrated", VariableType::F32),
                VariableDef::new("resolver_position", VariableType::F32),
            ],
        }
    }
}

impl AngularConfig {
    pub fn poll_period(&self) -> Duration {
        Duration::from_millis(self.poll_period_ms)
    }

    fn validate(&self) -> Result<()> {
        check_positive("angular", "poll_period_ms", self.poll_period_ms)?;
        check_positive("angular", "history_capacity", self.history_capacity as u64)?;
        check_positive("angular", "fault_limit", u64::from(self.fault_limit))?;
        check_non_negative("angular", "ambiguous_threshold_rad", self.ambiguous_threshold_rad)?;
        check_non_negative("angular", "demo_frequency_hz", self.demo_frequency_hz)?;
        check_non_negative("angular", "demo_noise", self.demo_noise)
    }
}

/// Temperature pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalConfig {
    pub poll_period_ms: u64,
    pub history_capacity: usize,
    pub fault_limit: u32,
    pub display_unit: TemperatureUnit,
    pub demo_base_c: f64,
    pub demo_amplitude_c: f64,
    pub demo_rate_change_gap_ms: u64,
    pub demo_rate_codes: u32,
    /// Uniform noise added to the demo temperature
    pub demo_noise: f64,
    /// Rate-code display labels
    pub rate_labels: Vec<RateLabel>,
    /// Temperature and sample-rate variables, in that order
    pub variables: Vec<VariableDef>,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            poll_period_ms: 200,
            history_capacity: 300,
            fault_limit: DEFAULT_FAULT_LIMIT,
            display_unit: TemperatureUnit::Fahrenheit,
            rate_labels: default_rate_labels(),
            demo_base_c: 25.0,
            demo_amplitude_c: 5.0,
            demo_rate_change_gap_ms: 1500,
            demo_rate_codes: 4,
            demo_noise: 0.0,
            variables: vec![
                VariableDef::new("TemperatureValueX2C", VariableType::U8),
                VariableDef::new("tempSampleRate", VariableType::U32),
            ],
        }
    }
}

impl ThermalConfig {
    pub fn poll_period(&self) -> Duration {
        Duration::from_millis(self.poll_period_ms)
    }

    /// Parameters for the demo temperature source
    pub fn synth_params(&self) -> ThermalSynthParams {
        ThermalSynthParams {
            base_c: self.demo_base_c,
            amplitude_c: self.demo_amplitude_c,
            rate_change_gap: Duration::from_millis(self.demo_rate_change_gap_ms),
            rate_codes: self.demo_rate_codes,
        }
    }

    fn validate(&self) -> Result<()> {
        check_positive("thermal", "poll_period_ms", self.poll_period_ms)?;
        check_positive("thermal", "history_capacity", self.history_capacity as u64)?;
        check_positive("thermal", "fault_limit", u64::from(self.fault_limit))?;
        check_positive("thermal", "demo_rate_codes", u64::from(self.demo_rate_codes))?;
        if !self.demo_base_c.is_finite() {
            return Err(MonitorError::Config(
                "[thermal] demo_base_c must be finite".to_string(),
            ));
        }
        check_non_negative("thermal", "demo_amplitude_c", self.demo_amplitude_c)?;
        check_non_negative("thermal", "demo_noise", self.demo_noise)
    }
}

// ==================== Logging Config ====================

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` takes precedence
    pub filter: String,
    /// Also write logs to this file
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,sensorscope=debug".to_string(),
            file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_validate() {
        let config = MonitorConfig::default();
        config.validate().unwrap();
        assert_eq!(config.angular.poll_period(), Duration::from_millis(20));
        assert_eq!(config.angular.history_capacity, 1000);
        assert_eq!(config.thermal.poll_period(), Duration::from_millis(200));
        assert_eq!(config.thermal.display_unit, TemperatureUnit::Fahrenheit);
        assert_eq!(config.thermal.variables[0].var_type, VariableType::U8);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let mut config = MonitorConfig::default();
        config.probe.symbol_file = Some(PathBuf::from("fw.elf"));
        config.thermal.display_unit = TemperatureUnit::Celsius;
        config.thermal.rate_labels.push(RateLabel::new(4, "8 s"));
        config.save(&path).unwrap();

        let loaded = MonitorConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            "[angular]\npoll_period_ms = 10\n\n[probe]\nprotocol = \"jtag\"\n",
        )
        .unwrap();

        let config = MonitorConfig::load(&path).unwrap();
        assert_eq!(config.angular.poll_period_ms, 10);
        assert_eq!(config.angular.history_capacity, 1000);
        assert_eq!(config.probe.protocol, ProbeProtocol::Jtag);
        assert_eq!(config.thermal, ThermalConfig::default());
    }

    #[test]
    fn test_validation_rejects_zero_period() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[thermal]\npoll_period_ms = 0\n").unwrap();

        let err = MonitorConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("poll_period_ms"));
        match err {
            MonitorError::WithContext { context, source } => {
                assert!(context.contains(CONFIG_FILE));
                assert!(matches!(*source, MonitorError::Config(_)));
            }
            other => panic!("expected file context, got {:?}", other),
        }

        // load_or_default swallows the error
        assert_eq!(MonitorConfig::load_or_default(&path), MonitorConfig::default());
    }

    #[test]
    fn test_validation_rejects_negative_noise() {
        let mut config = MonitorConfig::default();
        config.angular.demo_noise = -0.1;
        assert!(config.validate().is_err());

        let mut config = MonitorConfig::default();
        config.thermal.demo_amplitude_c = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unreadable_file_names_the_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let err = MonitorConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
        match err {
            MonitorError::WithContext { source, .. } => {
                assert!(matches!(*source, MonitorError::Io(_)));
            }
            other => panic!("expected file context, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = MonitorConfig::load_or_default(dir.path().join("absent.toml"));
        assert_eq!(config, MonitorConfig::default());
    }

    #[test]
    fn test_endpoint_requires_symbol_file() {
        let mut probe = ProbeSettings::default();
        assert!(probe.endpoint().is_none());

        probe.symbol_file = Some(PathBuf::from("fw.elf"));
        probe.selector = Some("0483:374b".to_string());
        let endpoint = probe.endpoint().unwrap();
        assert_eq!(endpoint.target_chip, "STM32F407VGTx");
        assert_eq!(endpoint.probe_selector.as_deref(), Some("0483:374b"));
    }
}
