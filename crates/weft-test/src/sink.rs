//! Event capture for assertions.

use std::sync::Mutex;

use jiff::Timestamp;
use weft_engine::engine::{EngineEvent, EventSink};

/// Sink that records every engine event with a capture timestamp.
#[derive(Debug, Default)]
pub struct CollectorSink {
    events: Mutex<Vec<(Timestamp, EngineEvent)>>,
}

impl CollectorSink {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all captured events in order.
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events
            .lock()
            .map(|events| events.iter().map(|(_, e)| e.clone()).collect())
            .unwrap_or_default()
    }

    /// Returns captured events with their timestamps.
    pub fn timestamped(&self) -> Vec<(Timestamp, EngineEvent)> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Returns the node names of execution-started events, in order.
    pub fn execution_order(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                EngineEvent::ExecutionStarted { node } => Some(node),
                _ => None,
            })
            .collect()
    }

    /// Returns the node names of node-resolved events, in order.
    pub fn resolved_order(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                EngineEvent::NodeResolved { node, .. } => Some(node),
                _ => None,
            })
            .collect()
    }

    /// Clears the captured events.
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl EventSink for CollectorSink {
    fn emit(&self, event: EngineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push((Timestamp::now(), event));
        }
    }
}
