//! Observer that keeps every decision for assertions.

use std::sync::{Mutex, MutexGuard};

use crate::cascade::{DecisionEnvelope, DecisionEvent, DecisionObserver};

/// Records decision events in the order they were observed.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<DecisionEnvelope>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<DecisionEnvelope>> {
        // a panicking test thread must not hide the events from the others
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn envelopes(&self) -> Vec<DecisionEnvelope> {
        self.lock().clone()
    }

    pub fn events(&self) -> Vec<DecisionEvent> {
        self.lock().iter().map(|e| e.event.clone()).collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl DecisionObserver for RecordingObserver {
    fn observe(&self, envelope: &DecisionEnvelope) {
        self.lock().push(envelope.clone());
    }
}
