//! One-shot timers for the poll loop
//!
//! The poll loop never sleeps itself. It asks a [`Scheduler`] for a one-shot
//! timer and is called back through `on_timer` by whoever drives the
//! scheduler. [`TimerQueue`] is the in-process implementation; the host
//! event loop in [`super::runtime`] waits on its earliest deadline.

use crate::clock::Clock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Identifies a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Source of cancellable one-shot timers
pub trait Scheduler {
    /// Fire once after `delay`
    fn schedule_once(&mut self, delay: Duration) -> TimerId;

    /// Cancel a pending timer. Returns false if it already fired or never existed.
    fn cancel(&mut self, id: TimerId) -> bool;
}

/// Deadline-ordered timer queue
pub struct TimerQueue {
    clock: Arc<dyn Clock>,
    next_id: u64,
    by_deadline: BTreeSet<(Instant, TimerId)>,
    deadlines: HashMap<TimerId, Instant>,
}

impl TimerQueue {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            next_id: 0,
            by_deadline: BTreeSet::new(),
            deadlines: HashMap::new(),
        }
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.by_deadline.first().map(|(deadline, _)| *deadline)
    }

    /// Remove and return the earliest timer whose deadline is at or before `now`
    ///
    /// Timers sharing a deadline fire in scheduling order.
    pub fn pop_due(&mut self, now: Instant) -> Option<TimerId> {
        let &(deadline, id) = self.by_deadline.first()?;
        if deadline > now {
            return None;
        }
        self.by_deadline.remove(&(deadline, id));
        self.deadlines.remove(&id);
        Some(id)
    }

    /// Number of pending timers
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    /// Whether `id` is still pending
    pub fn contains(&self, id: TimerId) -> bool {
        self.deadlines.contains_key(&id)
    }
}

impl Scheduler for TimerQueue {
    fn schedule_once(&mut self, delay: Duration) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let deadline = self.clock.now() + delay;
        self.by_deadline.insert((deadline, id));
        self.deadlines.insert(id, deadline);
        id
    }

    fn cancel(&mut self, id: TimerId) -> bool {
        match self.deadlines.remove(&id) {
            Some(deadline) => {
                self.by_deadline.remove(&(deadline, id));
                true
            }
            None => false,
        }
    }
}
