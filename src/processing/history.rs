//! Bounded history buffers
//!
//! [`HistoryBuffer`] is a fixed-capacity FIFO of [`DataPoint`]s for one
//! channel. [`ChannelHistory`] groups one buffer per plotted channel and only
//! ever pushes whole rows, so every channel has the same length and the same
//! timestamps after each push.

use crate::error::{MonitorError, Result};
use crate::types::DataPoint;
use std::collections::VecDeque;
use std::time::Duration;

/// Fixed-capacity ring buffer for a single channel
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    capacity: usize,
    points: VecDeque<DataPoint>,
}

impl HistoryBuffer {
    /// Create a buffer holding at most `capacity` points (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            points: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a point, evicting the oldest one when full
    ///
    /// Timestamps must be strictly increasing.
    pub fn push(&mut self, timestamp: Duration, value: f64) -> Result<()> {
        self.check_timestamp(timestamp)?;
        self.push_unchecked(timestamp, value);
        Ok(())
    }

    fn check_timestamp(&self, timestamp: Duration) -> Result<()> {
        match self.points.back() {
            Some(last) if timestamp <= last.timestamp => Err(MonitorError::History(format!(
                "timestamp {:?} does not follow {:?}",
                timestamp, last.timestamp
            ))),
            _ => Ok(()),
        }
    }

    fn push_unchecked(&mut self, timestamp: Duration, value: f64) {
        if self.points.len() >= self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(DataPoint::new(timestamp, value));
    }

    /// Owned copy of the current contents, oldest first
    pub fn snapshot(&self) -> Vec<DataPoint> {
        self.points.iter().copied().collect()
    }

    /// Contents as `[seconds, value]` pairs for plotting
    pub fn as_plot_points(&self) -> Vec<[f64; 2]> {
        self.points.iter().map(|p| [p.seconds(), p.value]).collect()
    }

    pub fn latest(&self) -> Option<&DataPoint> {
        self.points.back()
    }

    /// Time span covered, in seconds
    pub fn time_range(&self) -> Option<(f64, f64)> {
        let first = self.points.front()?.seconds();
        let last = self.points.back()?.seconds();
        Some((first, last))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

/// Lockstep set of per-channel history buffers
#[derive(Debug, Clone)]
pub struct ChannelHistory {
    names: Vec<&'static str>,
    buffers: Vec<HistoryBuffer>,
}

impl ChannelHistory {
    /// One buffer of `capacity` per channel name
    pub fn new(names: &[&'static str], capacity: usize) -> Self {
        Self {
            names: names.to_vec(),
            buffers: names.iter().map(|_| HistoryBuffer::new(capacity)).collect(),
        }
    }

    /// Push one value per channel at `timestamp`
    ///
    /// The row is validated before any buffer is touched, so a rejected row
    /// leaves every channel unchanged.
    pub fn push_row(&mut self, timestamp: Duration, values: &[f64]) -> Result<()> {
        if values.len() != self.buffers.len() {
            return Err(MonitorError::History(format!(
                "row has {} values for {} channels",
                values.len(),
                self.buffers.len()
            )));
        }
        if let Some(first) = self.buffers.first() {
            first.check_timestamp(timestamp)?;
        }
        for (buffer, &value) in self.buffers.iter_mut().zip(values) {
            buffer.push_unchecked(timestamp, value);
        }
        Ok(())
    }

    /// Buffer for a channel by name
    pub fn channel(&self, name: &str) -> Option<&HistoryBuffer> {
        self.names
            .iter()
            .position(|n| *n == name)
            .map(|idx| &self.buffers[idx])
    }

    /// Owned copies of every channel, in channel order
    pub fn snapshot(&self) -> Vec<(&'static str, Vec<DataPoint>)> {
        self.names
            .iter()
            .copied()
            .zip(self.buffers.iter().map(HistoryBuffer::snapshot))
            .collect()
    }

    pub fn names(&self) -> &[&'static str] {
        &self.names
    }

    /// Rows currently held (identical for every channel)
    pub fn len(&self) -> usize {
        self.buffers.first().map_or(0, HistoryBuffer::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.buffers.first().map_or(0, HistoryBuffer::capacity)
    }

    pub fn clear(&mut self) {
        for buffer in &mut self.buffers {
            buffer.clear();
        }
    }
}
