// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! FieldSync API Layer
//!
//! High-level API assembling the capture-and-sync engine for a host
//! application.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use fieldsync_core::api::{EngineConfig, FieldSync};
//! use fieldsync_core::event::{DeviceContext, EventType, GeoPoint};
//! use fieldsync_core::sync::HttpEndpoint;
//!
//! let engine = FieldSync::builder()
//!     .config(EngineConfig::at_path("/data/fieldsync.db"))
//!     .context(DeviceContext {
//!         actor_id: "driver-17".into(),
//!         device_id: "device-a1".into(),
//!         vehicle_id: "truck-9".into(),
//!     })
//!     .endpoint(Arc::new(HttpEndpoint::new(
//!         "https://authority.example/events",
//!         session_token,
//!     )?))
//!     .build(pin.as_bytes())?;
//!
//! // Events are durable before capture returns; sync runs in the
//! // background on its own schedule.
//! engine.observe_login("driver-17", GeoPoint::new(47.37, 8.54));
//! ```
//!
//! # Module Structure
//!
//! - [`error`] - Unified error type for the API layer
//! - [`config`] - Engine configuration
//! - [`engine`] - The [`FieldSync`] orchestrator and its builder

pub mod config;
pub mod engine;
pub mod error;

pub use config::EngineConfig;
pub use engine::{FieldSync, FieldSyncBuilder};
pub use error::{EngineError, EngineResult};
