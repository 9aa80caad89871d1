//! Recording [`Sink`] for event assertions.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::port::{Attributes, Sink};

/// Thread-safe event collector. Clones share the same buffer.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<(String, Attributes)>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn events(&self) -> Vec<(String, Attributes)> {
        self.events.lock().clone()
    }

    /// Attributes of every event recorded under `name`, in order.
    pub fn events_named(&self, name: &str) -> Vec<Attributes> {
        self.events
            .lock()
            .iter()
            .filter(|(event, _)| event == name)
            .map(|(_, attributes)| attributes.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Sink for RecordingSink {
    fn record(&self, event: &str, attributes: Attributes) {
        self.events.lock().push((event.to_string(), attributes));
    }
}
