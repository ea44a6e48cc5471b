// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Delivery finalization: reconciliation gate, geofence check, and the
//! terminal events they allow.

pub mod finalize;
pub mod geo;
pub mod reconciliation;

pub use finalize::{
    DeliveryError, DeliveryFinalization, DeliveryFinalizer, DeliveryOutcome, ProofMethod,
    ProofOfDelivery, DEFAULT_FACILITY_RADIUS_M,
};
pub use geo::haversine_distance_m;
pub use reconciliation::{unexplained_discrepancies, ReconciliationItem};
