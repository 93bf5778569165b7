//! Delivery side of the reconciliation loop.

use std::sync::{Arc, Mutex};

use runwatch_types::Event;

/// Receives delivered events, one call per event, in timestamp order.
///
/// Delivery is synchronous: once a cycle has fetched its snapshot, nothing
/// between delivery and checkpointing can be interrupted.
pub trait EventSink: Send {
    fn deliver(&mut self, event: &Event);
}

impl EventSink for Vec<Event> {
    fn deliver(&mut self, event: &Event) {
        self.push(event.clone());
    }
}

impl<T: EventSink + ?Sized> EventSink for Box<T> {
    fn deliver(&mut self, event: &Event) {
        (**self).deliver(event);
    }
}

/// Collects delivered events in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<Event>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything delivered so far, in delivery order.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Removes and returns everything delivered so far.
    pub fn drain(&self) -> Vec<Event> {
        self.events
            .lock()
            .map(|mut e| std::mem::take(&mut *e))
            .unwrap_or_default()
    }
}

impl EventSink for MemorySink {
    fn deliver(&mut self, event: &Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
