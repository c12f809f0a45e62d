//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use sensorscope::pipeline::{DisplayEvent, DisplaySink, Snapshot};
use sensorscope::types::LinkStatus;
use std::sync::{Arc, Mutex};

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Display sink that keeps every event for later inspection
#[derive(Clone, Default)]
pub struct RecordingDisplay {
    events: Arc<Mutex<Vec<DisplayEvent>>>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn boxed(&self) -> Box<dyn DisplaySink> {
        Box::new(self.clone())
    }

    pub fn events(&self) -> Vec<DisplayEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DisplayEvent::Snapshot(s) => Some(s),
                DisplayEvent::Link(_) => None,
            })
            .collect()
    }

    pub fn links(&self) -> Vec<LinkStatus> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DisplayEvent::Link(status) => Some(status),
                DisplayEvent::Snapshot(_) => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl DisplaySink for RecordingDisplay {
    fn publish(&mut self, snapshot: &Snapshot) {
        self.events
            .lock()
            .unwrap()
            .push(DisplayEvent::Snapshot(snapshot.clone()));
    }

    fn link_changed(&mut self, status: LinkStatus) {
        self.events.lock().unwrap().push(DisplayEvent::Link(status));
    }
}
