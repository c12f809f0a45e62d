//! Acquisition pipelines
//!
//! Each pipeline is a [`PollLoop`] over a stage set: a signal provider feeds
//! samples through the stages into a history and a display sink. Timers come
//! from a [`Scheduler`]; [`Runner`] hosts a loop on a tokio task.
//!
//! # Architecture
//!
//! ```text
//! [SignalProvider] ──► [Stages] ──► [ChannelHistory]
//!        ▲                     └──► [DisplaySink]
//!   [Scheduler] ◄── one pending timer per loop
//! ```

pub mod angular;
pub mod display;
pub mod poll_loop;
pub mod runtime;
pub mod scheduler;
pub mod thermal;

pub use angular::{angular_loop, AngularLoop, AngularStages};
pub use display::{
    format_text, ChannelDisplay, ConsoleDisplay, Derived, DisplayEvent, DisplayReceiver,
    DisplaySink, OutputFormat, Snapshot,
};
pub use poll_loop::{LoopSettings, LoopState, LoopStats, PollLoop, Processed, ReadingOf, Stages};
pub use runtime::{ConnectReply, LoopCommand, Runner};
pub use scheduler::{Scheduler, TimerId, TimerQueue};
pub use thermal::{thermal_loop, ThermalLoop, ThermalStages};
