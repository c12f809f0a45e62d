//! # sensorscope: live sensor monitor over SWD
//!
//! Polls a resolver (sine, cosine, angle) or a temperature sensor on an
//! embedded target through a debug probe and turns the raw values into
//! display quantities: angle, speed and continuous turn count for the
//! resolver, temperature and sample-rate label for the thermal sensor.
//! Without a probe, or before connecting, the same pipelines run on a
//! synthetic signal.
//!
//! ## Architecture
//!
//! - **Backend**: probe-rs sessions, ELF symbol lookup and synthetic sources
//! - **Provider**: live-or-synthetic switch with per-variable scaling
//! - **Processing**: angle unwrapping, speed estimation, bounded history
//! - **Pipeline**: timer-driven poll loops publishing snapshots to a display
//!
//! ## Configuration
//!
//! Settings live in `config.toml` under the platform config directory in
//! `sensorscope/`:
//!
//! - **Linux**: `~/.config/sensorscope/`
//! - **macOS**: `~/Library/Application Support/sensorscope/`
//! - **Windows**: `%APPDATA%\sensorscope\`
//!
//! ## Example
//!
//! ```ignore
//! use sensorscope::{
//!     clock::SystemClock,
//!     config::MonitorConfig,
//!     pipeline::{angular_loop, ConsoleDisplay, LoopCommand, OutputFormat, Runner},
//! };
//! use std::sync::Arc;
//!
//! let config = MonitorConfig::default();
//! let clock = Arc::new(SystemClock);
//! let display = Box::new(ConsoleDisplay::new(std::io::stdout(), OutputFormat::Text));
//! let poll_loop = angular_loop(&config.angular, None, display, clock.clone());
//!
//! let (runner, commands) = Runner::channel(poll_loop, clock, 8);
//! commands.try_send(LoopCommand::StartDemo)?;
//! tokio::runtime::Builder::new_current_thread()
//!     .enable_time()
//!     .build()?
//!     .block_on(runner.run());
//! ```

pub mod backend;
pub mod clock;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod processing;
pub mod provider;
pub mod types;

// Re-export commonly used types
pub use backend::{Endpoint, LiveBackend, LiveConnector, SymbolTable};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::MonitorConfig;
pub use error::{ConnectError, MonitorError, ReadFault, Result};
pub use pipeline::{AngularLoop, LoopCommand, PollLoop, Runner, Snapshot, ThermalLoop};
pub use provider::SignalProvider;
pub use types::{AngularReading, LinkStatus, SourceState, ThermalReading, VariableDef, VariableType};
