// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Background Synchronization
//!
//! At-least-once delivery of the local event log to the remote
//! authority: resumable across restarts, retried with capped
//! exponential backoff, never blocking the capture path.

pub mod endpoint;
pub mod engine;
#[cfg(feature = "http-endpoint")]
pub mod http;
pub mod retry;

pub use endpoint::{EndpointError, MockEndpoint, PushOutcome, SyncEndpoint};
pub use engine::{drain_once, DrainReport, SyncEngine, SyncFailure, SyncHandle};
#[cfg(feature = "http-endpoint")]
pub use http::HttpEndpoint;
pub use retry::RetryPolicy;
