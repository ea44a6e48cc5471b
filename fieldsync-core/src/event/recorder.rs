// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Event Capture Service
//!
//! The single entry point every business workflow calls to record a
//! fact. An event is stamped (id, wall-clock time, identity context)
//! and durably written before the call returns; the sync trigger is
//! handed off to the background worker and never awaited.

use std::sync::{Arc, Mutex};
use tracing::{debug, error};
use uuid::Uuid;

use super::{DeviceContext, EventType, GeoPoint, LocalEnvelope, OperationalEvent};
use crate::notify::{EngineEvent, EventDispatcher};
use crate::storage::Storage;
use crate::sync::SyncHandle;

/// Returns the current Unix timestamp in milliseconds.
/// Falls back to 0 if the system clock is before UNIX_EPOCH (should never happen).
fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Captures operational events on behalf of business workflows.
///
/// The identity context is fixed for the recorder's lifetime and
/// stamped onto every event.
#[derive(Clone)]
pub struct EventRecorder {
    storage: Arc<Mutex<Storage>>,
    context: DeviceContext,
    sync: SyncHandle,
    events: Arc<EventDispatcher>,
}

impl EventRecorder {
    /// Creates a recorder for the given device session.
    pub fn new(
        storage: Arc<Mutex<Storage>>,
        context: DeviceContext,
        sync: SyncHandle,
        events: Arc<EventDispatcher>,
    ) -> Self {
        EventRecorder {
            storage,
            context,
            sync,
            events,
        }
    }

    /// Records a business fact.
    ///
    /// The timestamp is stamped at the moment of this call, not at sync
    /// time. The envelope is written to durable storage before the call
    /// returns; a storage fault is logged and reported through the
    /// dispatcher but never propagated — losing one audit event is
    /// preferable to blocking a driver's delivery action.
    pub fn capture_event(
        &self,
        event_type: EventType,
        trip_id: &str,
        dispatch_id: &str,
        geo: GeoPoint,
        metadata: serde_json::Value,
    ) -> OperationalEvent {
        let event = OperationalEvent {
            event_id: Uuid::new_v4().to_string(),
            event_type,
            actor_id: self.context.actor_id.clone(),
            device_id: self.context.device_id.clone(),
            vehicle_id: self.context.vehicle_id.clone(),
            trip_id: trip_id.to_string(),
            dispatch_id: dispatch_id.to_string(),
            timestamp_ms: now_ms(),
            geo,
            metadata,
        };

        let envelope = LocalEnvelope::new(event.clone());
        let saved = {
            let store = self.storage.lock().expect("storage lock poisoned");
            store.save_envelope(&envelope)
        };

        match saved {
            Ok(()) => {
                debug!("captured {} ({})", event.event_id, event_type.as_str());
                self.events.dispatch(EngineEvent::EventCaptured {
                    event_id: event.event_id.clone(),
                    event_type,
                });
                // Fire-and-forget: sync proceeds on its own schedule.
                self.sync.trigger();
            }
            Err(e) => {
                error!(
                    "durable write failed, {} event dropped: {}",
                    event_type.as_str(),
                    e
                );
                self.events.dispatch(EngineEvent::CaptureDegraded {
                    event_type,
                    error: e.to_string(),
                });
            }
        }

        event
    }

    /// Explicit "sync now" trigger for interactive retry.
    pub fn force_sync(&self) {
        self.sync.trigger();
    }

    /// The identity context stamped onto captured events.
    pub fn context(&self) -> &DeviceContext {
        &self.context
    }
}
