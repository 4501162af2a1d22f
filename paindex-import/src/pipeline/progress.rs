//! Progress reporting seam between pipelines and their observers
//!
//! Pipelines emit through this trait rather than holding the broadcast bus
//! directly, so tests can capture the event sequence without SSE plumbing.

use paindex_common::events::{EventBus, ImportEvent};

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ImportEvent);
}

/// Production sink: fan events out over the service event bus
pub struct BusSink {
    bus: EventBus,
}

impl BusSink {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }
}

impl ProgressSink for BusSink {
    fn emit(&self, event: ImportEvent) {
        self.bus.emit(event);
    }
}

/// Test sink: record every event in order
#[derive(Default)]
pub struct CollectingSink {
    events: std::sync::Mutex<Vec<ImportEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ImportEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressSink for CollectingSink {
    fn emit(&self, event: ImportEvent) {
        self.events.lock().unwrap().push(event);
    }
}
