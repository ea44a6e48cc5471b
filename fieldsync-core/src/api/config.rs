// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Engine Configuration

use std::path::PathBuf;

use crate::crypto::KdfParams;
use crate::delivery::DEFAULT_FACILITY_RADIUS_M;
use crate::sync::RetryPolicy;

/// Configuration for a FieldSync engine instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Database file path. `None` keeps the event log in memory
    /// (testing only — nothing survives the process).
    pub db_path: Option<PathBuf>,

    /// Key derivation function for the at-rest key.
    pub kdf: KdfParams,

    /// Backoff schedule for failed sync attempts.
    pub retry: RetryPolicy,

    /// Default geofence radius for delivery finalization, meters.
    pub facility_radius_m: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            db_path: None,
            kdf: KdfParams::default(),
            retry: RetryPolicy::default(),
            facility_radius_m: DEFAULT_FACILITY_RADIUS_M,
        }
    }
}

impl EngineConfig {
    /// Configuration persisting to a database file.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        EngineConfig {
            db_path: Some(path.into()),
            ..Default::default()
        }
    }
}
