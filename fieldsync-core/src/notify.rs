//! Engine Notifications
//!
//! Callbacks for engine-internal happenings. Capture and sync are
//! decoupled from their callers, so background outcomes (acks, retries,
//! dead letters, degraded capture) surface here instead of being lost.

use std::sync::Arc;

use crate::event::EventType;

/// Notifications emitted by the engine.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// An event was captured and durably written.
    EventCaptured {
        event_id: String,
        event_type: EventType,
    },

    /// Durable storage failed during capture; the event was dropped
    /// rather than blocking the workflow.
    CaptureDegraded {
        event_type: EventType,
        error: String,
    },

    /// The remote authority acknowledged an event.
    EventSynced { event_id: String },

    /// A sync attempt failed; the drain pass stopped and will retry.
    SyncFailed {
        event_id: String,
        retry_count: u32,
        error: String,
    },

    /// The remote authority permanently rejected an event; it was
    /// dead-lettered for operator inspection.
    DeadLettered { event_id: String, reason: String },

    /// A stored record could not be decrypted while listing the
    /// pending queue. The record stays in place; it is skipped, not
    /// silently dropped.
    UndecryptableRecord { event_id: String, error: String },
}

/// Notification handler trait.
pub trait EventHandler: Send + Sync {
    /// Called when a notification occurs.
    fn on_event(&self, event: EngineEvent);
}

/// Simple callback-based handler.
///
/// Wraps a closure for easy event handling.
pub struct CallbackHandler<F>
where
    F: Fn(EngineEvent) + Send + Sync,
{
    callback: F,
}

impl<F> CallbackHandler<F>
where
    F: Fn(EngineEvent) + Send + Sync,
{
    /// Creates a new callback handler.
    pub fn new(callback: F) -> Self {
        CallbackHandler { callback }
    }
}

impl<F> EventHandler for CallbackHandler<F>
where
    F: Fn(EngineEvent) + Send + Sync,
{
    fn on_event(&self, event: EngineEvent) {
        (self.callback)(event);
    }
}

/// Dispatcher fanning notifications out to registered handlers.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    /// Creates a new event dispatcher.
    pub fn new() -> Self {
        EventDispatcher {
            handlers: Vec::new(),
        }
    }

    /// Adds a handler.
    pub fn add_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    /// Returns the number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Dispatches a notification to all handlers.
    pub fn dispatch(&self, event: EngineEvent) {
        for handler in &self.handlers {
            handler.on_event(event.clone());
        }
    }
}
