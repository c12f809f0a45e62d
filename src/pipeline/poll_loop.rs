//! Periodic acquisition loop
//!
//! [`PollLoop`] owns one pipeline: its signal provider, processing stages,
//! history and display. Each cycle reads a sample, runs the stages, pushes
//! one history row and publishes a [`Snapshot`]. Timing comes from an
//! external [`Scheduler`]; the loop only ever has one pending timer.
//!
//! Read faults never stop a cycle outright. The last good snapshot is
//! republished as stale, and after `fault_limit` consecutive faults the loop
//! disconnects itself and reports [`LinkStatus::Faulted`].

use super::display::{Derived, DisplaySink, Snapshot};
use super::scheduler::{Scheduler, TimerId};
use crate::backend::{Endpoint, SyntheticSource};
use crate::clock::Clock;
use crate::error::ConnectError;
use crate::processing::history::ChannelHistory;
use crate::provider::SignalProvider;
use crate::types::{LinkStatus, Reading, SourceState, VariableDef};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Reading type produced by a stage set's synthetic source
pub type ReadingOf<T> = <<T as Stages>::Synth as SyntheticSource>::Output;

/// Output of the processing stages for one sample
#[derive(Debug, Clone, PartialEq)]
pub struct Processed {
    /// One value per history channel
    pub row: Vec<f64>,
    pub derived: Derived,
}

/// The processing stages of one pipeline
pub trait Stages {
    /// Synthetic source used when not connected
    type Synth: SyntheticSource;

    /// Names of the channels kept in history, in row order
    const HISTORY_CHANNELS: &'static [&'static str];

    /// Derive display quantities and the history row from one reading
    fn process(&mut self, reading: &ReadingOf<Self>, timestamp: Duration) -> Processed;

    /// Forget all state carried between samples
    fn reset(&mut self);
}

/// Loop settings
#[derive(Debug, Clone, PartialEq)]
pub struct LoopSettings {
    /// Nominal time between polls
    pub period: Duration,
    pub history_capacity: usize,
    /// Consecutive read faults before disconnecting
    pub fault_limit: u32,
    /// Variables to bind on a live connect, in channel order
    pub definitions: Vec<VariableDef>,
}

/// Whether the loop is polling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    #[default]
    Idle,
    Active,
}

/// Counters since the loop was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub polls: u64,
    pub read_faults: u64,
    pub published: u64,
    pub rejected_rows: u64,
}

/// One pipeline and its polling state
pub struct PollLoop<T: Stages> {
    provider: SignalProvider<T::Synth>,
    stages: T,
    history: ChannelHistory,
    display: Box<dyn DisplaySink>,
    clock: Arc<dyn Clock>,
    settings: LoopSettings,
    state: LoopState,
    pending: Option<TimerId>,
    t0: Instant,
    consecutive_faults: u32,
    last_snapshot: Option<Snapshot>,
    stats: LoopStats,
}

impl<T: Stages> PollLoop<T> {
    pub fn new(
        provider: SignalProvider<T::Synth>,
        stages: T,
        display: Box<dyn DisplaySink>,
        clock: Arc<dyn Clock>,
        settings: LoopSettings,
    ) -> Self {
        let t0 = clock.now();
        Self {
            provider,
            stages,
            history: ChannelHistory::new(T::HISTORY_CHANNELS, settings.history_capacity),
            display,
            clock,
            settings,
            state: LoopState::Idle,
            pending: None,
            t0,
            consecutive_faults: 0,
            last_snapshot: None,
            stats: LoopStats::default(),
        }
    }

    /// Bind the live backend and start polling
    ///
    /// Without live capability this starts polling the synthetic source.
    /// On failure nothing changes: a running loop keeps its timer and
    /// session, and nothing is published.
    pub fn connect(
        &mut self,
        endpoint: &Endpoint,
        scheduler: &mut dyn Scheduler,
    ) -> Result<(), ConnectError> {
        if let Err(e) = self
            .provider
            .connect(endpoint, &self.settings.definitions)
        {
            tracing::error!("Connect failed: {}", e);
            return Err(e);
        }
        self.stop_timer(scheduler);
        self.begin(scheduler);
        Ok(())
    }

    /// Start polling the synthetic source
    pub fn start_demo(&mut self, scheduler: &mut dyn Scheduler) {
        self.stop_timer(scheduler);
        self.provider.disconnect();
        self.begin(scheduler);
    }

    /// Stop polling and release the live backend
    ///
    /// The pending timer is cancelled before the backend goes away, so no
    /// poll can run against a released session.
    pub fn disconnect(&mut self, scheduler: &mut dyn Scheduler) {
        self.halt(scheduler, LinkStatus::Idle);
    }

    /// Handle an expired timer. Ids other than the pending one are ignored.
    pub fn on_timer(&mut self, id: TimerId, scheduler: &mut dyn Scheduler) {
        if self.state != LoopState::Active || self.pending != Some(id) {
            tracing::trace!("Ignoring stale timer {:?}", id);
            return;
        }
        self.pending = None;
        self.cycle(scheduler);
    }

    fn begin(&mut self, scheduler: &mut dyn Scheduler) {
        self.stages.reset();
        self.history.clear();
        self.t0 = self.clock.now();
        self.consecutive_faults = 0;
        self.last_snapshot = None;
        self.state = LoopState::Active;

        let status = match self.provider.state() {
            SourceState::Connected => LinkStatus::Live,
            SourceState::Disconnected | SourceState::DemoFallback => LinkStatus::Demo,
        };
        tracing::info!("Polling started ({}) every {:?}", status, self.settings.period);
        self.display.link_changed(status);
        self.cycle(scheduler);
    }

    fn halt(&mut self, scheduler: &mut dyn Scheduler, status: LinkStatus) {
        self.stop_timer(scheduler);
        self.provider.disconnect();
        if self.state == LoopState::Active {
            self.state = LoopState::Idle;
            tracing::info!("Polling stopped ({})", status);
            self.display.link_changed(status);
        }
    }

    fn stop_timer(&mut self, scheduler: &mut dyn Scheduler) {
        if let Some(id) = self.pending.take() {
            scheduler.cancel(id);
        }
    }

    fn cycle(&mut self, scheduler: &mut dyn Scheduler) {
        self.poll(scheduler);
        if self.state == LoopState::Active {
            self.pending = Some(scheduler.schedule_once(self.settings.period));
        }
    }

    fn poll(&mut self, scheduler: &mut dyn Scheduler) {
        self.stats.polls += 1;
        let sample = match self.provider.read() {
            Ok(sample) => sample,
            Err(fault) => {
                self.stats.read_faults += 1;
                self.consecutive_faults += 1;
                tracing::warn!(
                    "Read fault {}/{}: {}",
                    self.consecutive_faults,
                    self.settings.fault_limit,
                    fault
                );
                if let Some(last) = self.last_snapshot.as_mut() {
                    last.stale = true;
                    self.display.publish(last);
                    self.stats.published += 1;
                }
                if self.consecutive_faults >= self.settings.fault_limit {
                    tracing::error!(
                        "{} consecutive read faults, disconnecting",
                        self.consecutive_faults
                    );
                    self.halt(scheduler, LinkStatus::Faulted);
                }
                return;
            }
        };
        self.consecutive_faults = 0;

        let timestamp = sample.acquired.saturating_duration_since(self.t0);
        let processed = self.stages.process(&sample.reading, timestamp);

        if let Err(e) = self.history.push_row(timestamp, &processed.row) {
            self.stats.rejected_rows += 1;
            tracing::warn!("History row rejected: {}", e);
        }

        let channel_values: BTreeMap<String, f64> = sample
            .reading
            .channel_values()
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();

        let snapshot = Snapshot {
            timestamp,
            wall_clock: sample.wall_clock,
            channel_values,
            derived: processed.derived,
            stale: false,
        };
        self.display.publish(&snapshot);
        self.stats.published += 1;
        self.last_snapshot = Some(snapshot);
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn source_state(&self) -> SourceState {
        self.provider.state()
    }

    pub fn history(&self) -> &ChannelHistory {
        &self.history
    }

    pub fn last_snapshot(&self) -> Option<&Snapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn pending_timer(&self) -> Option<TimerId> {
        self.pending
    }

    pub fn consecutive_faults(&self) -> u32 {
        self.consecutive_faults
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn provider(&self) -> &SignalProvider<T::Synth> {
        &self.provider
    }

    pub fn stages(&self) -> &T {
        &self.stages
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }
}
