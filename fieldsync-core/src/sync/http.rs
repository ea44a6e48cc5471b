// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! HTTPS push endpoint.
//!
//! Posts one event per request with the session credential issued by
//! the external auth layer. Response mapping follows the at-least-once
//! contract: 2xx is an acknowledgment, 4xx is a permanent rejection,
//! everything else is a transient failure the engine retries.

use std::time::Duration;

use super::endpoint::{EndpointError, PushOutcome, SyncEndpoint};
use crate::event::OperationalEvent;

/// Request timeout for a single push.
const PUSH_TIMEOUT: Duration = Duration::from_secs(30);

/// Pushes events to a remote HTTPS endpoint.
pub struct HttpEndpoint {
    client: reqwest::blocking::Client,
    url: String,
    credential: String,
}

impl HttpEndpoint {
    /// Creates an endpoint pushing to `url` with a bearer credential.
    pub fn new(
        url: impl Into<String>,
        credential: impl Into<String>,
    ) -> Result<Self, EndpointError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(PUSH_TIMEOUT)
            .build()
            .map_err(|e| EndpointError::Configuration(e.to_string()))?;

        Ok(HttpEndpoint {
            client,
            url: url.into(),
            credential: credential.into(),
        })
    }
}

impl SyncEndpoint for HttpEndpoint {
    fn push_event(&self, event: &OperationalEvent) -> Result<PushOutcome, EndpointError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.credential)
            .json(event)
            .send()
            .map_err(|e| EndpointError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(PushOutcome::Accepted);
        }

        if status.is_client_error() {
            let body = response.text().unwrap_or_default();
            return Ok(PushOutcome::Rejected {
                reason: format!("{}: {}", status, body),
            });
        }

        Err(EndpointError::Unreachable(format!(
            "server returned {}",
            status
        )))
    }
}
