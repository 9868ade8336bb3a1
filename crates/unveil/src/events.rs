//! Event sinks: where the kernel sends notifications after each commit.

use std::sync::{Arc, Mutex};

use unveil_core::AssetEvent;

/// Receives events after the state they describe is committed.
///
/// Delivery is best-effort. A sink cannot fail an operation.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &AssetEvent);
}

/// Logs every event through `tracing`. The kernel's default sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &AssetEvent) {
        tracing::info!(
            event = event.name(),
            collection = %event.collection_id(),
            detail = ?event,
            "asset event"
        );
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AssetEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every event received so far, in order.
    pub fn events(&self) -> Vec<AssetEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Remove and return the recorded events.
    pub fn take(&self) -> Vec<AssetEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &AssetEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }
}

impl<E: EventSink + ?Sized> EventSink for Arc<E> {
    fn emit(&self, event: &AssetEvent) {
        (**self).emit(event)
    }
}
