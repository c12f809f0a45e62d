//! Sample processing stages
//!
//! - [`unwrap`] - Angle unwrapping and turn counting
//! - [`rate`] - Speed estimation, rate-code labels, temperature units
//! - [`history`] - Bounded per-channel history buffers

pub mod history;
pub mod rate;
pub mod unwrap;

pub use history::{ChannelHistory, HistoryBuffer};
pub use rate::{
    default_rate_labels, rpm_from_delta, RateLabel, RateLabels, SpeedEstimator, TemperatureUnit,
};
pub use unwrap::{minimal_wrap, wrap_angle, TurnCounter, UnwrapStep, DEFAULT_AMBIGUOUS_THRESHOLD};
