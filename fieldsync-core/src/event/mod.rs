// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Operational Event Model
//!
//! Immutable business facts captured in the field. An event is written
//! once at capture time and never mutated afterwards; corrections are
//! modeled as new events.

pub mod recorder;

pub use recorder::EventRecorder;

use serde::{Deserialize, Serialize};

/// Sentinel correlation id for events with no trip/dispatch context
/// (e.g. login events).
pub const SYSTEM_CORRELATION: &str = "system";

/// Closed set of business facts this engine records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A delivery was finalized at (or near) the target facility.
    DeliveryCompleted,
    /// Justification for confirming a delivery outside the facility
    /// geofence; always causally prior to the completion event.
    ProxyDeliveryReasonRecorded,
    /// An actor logged in on a device that last saw a different actor.
    NewDeviceLogin,
}

impl EventType {
    /// Wire name of the event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::DeliveryCompleted => "delivery_completed",
            EventType::ProxyDeliveryReasonRecorded => "proxy_delivery_reason_recorded",
            EventType::NewDeviceLogin => "new_device_login",
        }
    }
}

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        GeoPoint { lat, lng }
    }
}

/// Identity context supplied by the external session layer at
/// construction time; stamped onto every captured event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceContext {
    pub actor_id: String,
    pub device_id: String,
    pub vehicle_id: String,
}

/// An immutable operational fact.
///
/// `timestamp_ms` is device wall-clock time at the moment of capture,
/// not at sync time; it remains the authoritative event time even when
/// the server observes the event much later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationalEvent {
    pub event_id: String,
    pub event_type: EventType,
    pub actor_id: String,
    pub device_id: String,
    pub vehicle_id: String,
    pub trip_id: String,
    pub dispatch_id: String,
    pub timestamp_ms: u64,
    pub geo: GeoPoint,
    /// Event-type-specific payload (reconciliation lines, proof of
    /// delivery, justification text, computed distance, ...).
    pub metadata: serde_json::Value,
}

/// Sync bookkeeping wrapper around an immutable event.
///
/// `synced` flips false -> true exactly once, when the remote authority
/// acknowledges receipt; `retry_count` increments on each failed sync
/// attempt. The wrapped event itself is never touched.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalEnvelope {
    pub event: OperationalEvent,
    pub synced: bool,
    pub retry_count: u32,
}

impl LocalEnvelope {
    /// Wraps a freshly captured event: unsynced, no retries.
    pub fn new(event: OperationalEvent) -> Self {
        LocalEnvelope {
            event,
            synced: false,
            retry_count: 0,
        }
    }
}
