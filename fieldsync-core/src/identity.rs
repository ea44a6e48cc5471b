// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Device Identity Observer
//!
//! Watches logins for actor changes on this device. Purely
//! observational: a first-ever login or an actor change emits an
//! auditable `new_device_login` event and updates the local marker,
//! but login itself is never gated or blocked.

use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::warn;

use crate::event::{EventRecorder, EventType, GeoPoint, OperationalEvent, SYSTEM_CORRELATION};
use crate::storage::Storage;

#[derive(Serialize)]
struct NewDeviceMetadata<'a> {
    previous_actor: Option<&'a str>,
    device_id: &'a str,
}

/// Detects first-use-on-new-device at login.
pub struct DeviceIdentityObserver {
    storage: Arc<Mutex<Storage>>,
    recorder: EventRecorder,
}

impl DeviceIdentityObserver {
    /// Creates an observer over the device's known-actor marker.
    pub fn new(storage: Arc<Mutex<Storage>>, recorder: EventRecorder) -> Self {
        DeviceIdentityObserver { storage, recorder }
    }

    /// Compares the presented actor against the last-known actor.
    ///
    /// Returns the emitted `new_device_login` event when the actor is
    /// new to this device. Storage faults are logged and the check is
    /// skipped; they never block the login.
    pub fn observe_login(&self, actor_id: &str, geo: GeoPoint) -> Option<OperationalEvent> {
        let known = {
            let store = self.storage.lock().expect("storage lock poisoned");
            store.load_known_actor()
        };

        let known = match known {
            Ok(known) => known,
            Err(e) => {
                warn!("known-actor lookup failed, skipping device check: {}", e);
                return None;
            }
        };

        if known.as_deref() == Some(actor_id) {
            return None;
        }

        let metadata = serde_json::to_value(NewDeviceMetadata {
            previous_actor: known.as_deref(),
            device_id: &self.recorder.context().device_id,
        })
        .unwrap_or(serde_json::Value::Null);

        let event = self.recorder.capture_event(
            EventType::NewDeviceLogin,
            SYSTEM_CORRELATION,
            SYSTEM_CORRELATION,
            geo,
            metadata,
        );

        let store = self.storage.lock().expect("storage lock poisoned");
        if let Err(e) = store.save_known_actor(actor_id) {
            warn!("updating known-actor marker failed: {}", e);
        }

        Some(event)
    }
}
