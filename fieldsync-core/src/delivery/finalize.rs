// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Delivery Finalization Workflow
//!
//! Validates reconciliation completeness and detects out-of-geofence
//! ("proxy") deliveries before any terminal event is emitted. Both
//! failures are recoverable: the caller re-invokes with discrepancy
//! reasons or a proxy justification once the driver supplies them.

use serde::Serialize;
use thiserror::Error;

use super::geo::haversine_distance_m;
use super::reconciliation::{unexplained_discrepancies, ReconciliationItem};
use crate::event::{EventRecorder, EventType, GeoPoint, OperationalEvent};

/// Default geofence radius around the expected facility, in meters.
pub const DEFAULT_FACILITY_RADIUS_M: f64 = 100.0;

/// Delivery finalization error types.
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// Items have quantity mismatches with no discrepancy reason.
    #[error("Reconciliation required for items: {item_ids:?}")]
    ReconciliationRequired { item_ids: Vec<String> },

    /// The confirmation location is outside the facility geofence and
    /// no justification was supplied. Re-invoke with one to proceed.
    #[error("Proxy delivery detected: {distance_meters:.0}m from expected location")]
    ProxyDeliveryDetected { distance_meters: f64 },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// How proof of delivery was collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofMethod {
    Signature,
    Photo,
    PinCode,
}

/// Proof-of-delivery artifact attached to the completion event.
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
pub struct ProofOfDelivery {
    pub method: ProofMethod,
    /// Method-specific payload (image reference, signature strokes,
    /// confirmation code, ...).
    pub artifact: serde_json::Value,
}

/// Input to a finalization attempt.
#[derive(Debug, Clone)]
pub struct DeliveryFinalization {
    pub trip_id: String,
    pub dispatch_id: String,
    pub current_geo: GeoPoint,
    pub expected_geo: GeoPoint,
    pub items: Vec<ReconciliationItem>,
    pub proof: ProofOfDelivery,
    /// Geofence radius override; the finalizer's default applies when
    /// unset.
    pub facility_radius_m: Option<f64>,
    /// Supplied on re-invocation after a proxy-delivery failure.
    pub proxy_justification: Option<String>,
}

impl DeliveryFinalization {
    pub fn new(
        trip_id: impl Into<String>,
        dispatch_id: impl Into<String>,
        current_geo: GeoPoint,
        expected_geo: GeoPoint,
        items: Vec<ReconciliationItem>,
        proof: ProofOfDelivery,
    ) -> Self {
        DeliveryFinalization {
            trip_id: trip_id.into(),
            dispatch_id: dispatch_id.into(),
            current_geo,
            expected_geo,
            items,
            proof,
            facility_radius_m: None,
            proxy_justification: None,
        }
    }

    pub fn with_radius(mut self, radius_m: f64) -> Self {
        self.facility_radius_m = Some(radius_m);
        self
    }

    pub fn with_justification(mut self, justification: impl Into<String>) -> Self {
        self.proxy_justification = Some(justification.into());
        self
    }
}

/// Ephemeral result of a successful finalization.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    /// Computed distance from the expected facility, meters.
    pub distance_meters: f64,
    /// True when the delivery was confirmed out of fence under a
    /// justification.
    pub proxy_delivery: bool,
    /// The terminal `delivery_completed` event.
    pub completion: OperationalEvent,
}

#[derive(Serialize)]
struct ProxyReasonMetadata<'a> {
    justification: &'a str,
    distance_meters: f64,
}

#[derive(Serialize)]
struct CompletionMetadata<'a> {
    distance_meters: f64,
    items: &'a [ReconciliationItem],
    proof_of_delivery: &'a ProofOfDelivery,
}

/// Runs the finalization business rules and emits the terminal events.
pub struct DeliveryFinalizer<'a> {
    recorder: &'a EventRecorder,
    default_radius_m: f64,
}

impl<'a> DeliveryFinalizer<'a> {
    /// Creates a finalizer with the standard geofence radius.
    pub fn new(recorder: &'a EventRecorder) -> Self {
        DeliveryFinalizer {
            recorder,
            default_radius_m: DEFAULT_FACILITY_RADIUS_M,
        }
    }

    /// Overrides the default geofence radius.
    pub fn with_default_radius(mut self, radius_m: f64) -> Self {
        self.default_radius_m = radius_m;
        self
    }

    /// Finalizes a delivery.
    ///
    /// Validation runs before any event is emitted. When the driver
    /// confirms out of fence under a justification, the justification
    /// event is captured *before* the completion event so it is
    /// causally prior to the completion fact.
    pub fn finalize(
        &self,
        request: DeliveryFinalization,
    ) -> Result<DeliveryOutcome, DeliveryError> {
        let unexplained = unexplained_discrepancies(&request.items);
        if !unexplained.is_empty() {
            return Err(DeliveryError::ReconciliationRequired {
                item_ids: unexplained,
            });
        }

        let radius_m = request.facility_radius_m.unwrap_or(self.default_radius_m);
        let distance_meters = haversine_distance_m(request.current_geo, request.expected_geo);
        let out_of_fence = distance_meters > radius_m;

        if out_of_fence && request.proxy_justification.is_none() {
            return Err(DeliveryError::ProxyDeliveryDetected { distance_meters });
        }

        if out_of_fence {
            // Unreachable without a justification: the guard above
            // returned already.
            if let Some(justification) = request.proxy_justification.as_deref() {
                let metadata = serde_json::to_value(ProxyReasonMetadata {
                    justification,
                    distance_meters,
                })
                .map_err(|e| DeliveryError::Serialization(e.to_string()))?;

                self.recorder.capture_event(
                    EventType::ProxyDeliveryReasonRecorded,
                    &request.trip_id,
                    &request.dispatch_id,
                    request.current_geo,
                    metadata,
                );
            }
        }

        let metadata = serde_json::to_value(CompletionMetadata {
            distance_meters,
            items: &request.items,
            proof_of_delivery: &request.proof,
        })
        .map_err(|e| DeliveryError::Serialization(e.to_string()))?;

        let completion = self.recorder.capture_event(
            EventType::DeliveryCompleted,
            &request.trip_id,
            &request.dispatch_id,
            request.current_geo,
            metadata,
        );

        Ok(DeliveryOutcome {
            distance_meters,
            proxy_delivery: out_of_fence,
            completion,
        })
    }
}
