// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Remote Sync Endpoint Contract
//!
//! The engine pushes events one at a time and relies on the remote
//! authority deduplicating by event id: an event whose acknowledgment
//! was lost will be resent, so the delivery contract is at-least-once
//! with idempotent server-side apply.

use std::collections::HashSet;
use std::sync::Mutex;
use thiserror::Error;

use crate::event::OperationalEvent;

/// Endpoint error types.
#[derive(Error, Debug)]
pub enum EndpointError {
    /// Transient transport failure; the engine retries with backoff.
    #[error("endpoint unreachable: {0}")]
    Unreachable(String),

    /// The endpoint could not be constructed from its configuration.
    #[error("endpoint configuration error: {0}")]
    Configuration(String),
}

/// Per-event outcome reported by the remote authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// The event is durably applied remotely.
    Accepted,
    /// The event is malformed and will never be accepted (4xx-class).
    Rejected { reason: String },
}

/// A remote authority that receives operational events.
///
/// Implementations must be callable from the background sync worker.
pub trait SyncEndpoint: Send + Sync {
    /// Pushes a single event. `Err` means the attempt may be retried;
    /// `Rejected` means it must not be.
    fn push_event(&self, event: &OperationalEvent) -> Result<PushOutcome, EndpointError>;
}

/// In-memory endpoint double for tests and offline development.
///
/// Records every delivery (including duplicates) and applies events
/// idempotently by event id, mirroring the dedup contract the real
/// authority implements. Failure behavior is scriptable.
#[derive(Default)]
pub struct MockEndpoint {
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    /// Every push that reached the endpoint, in arrival order.
    received: Vec<String>,
    /// Ids applied exactly once (server-side dedup).
    applied: HashSet<String>,
    /// Ids to reject as malformed.
    rejected: HashSet<String>,
    /// Fail this many upcoming pushes before anything is recorded.
    fail_next: u32,
    /// Accept and apply this many upcoming pushes, but report the
    /// attempt as failed (simulates a lost acknowledgment).
    lose_acks: u32,
}

impl MockEndpoint {
    /// Creates an endpoint that accepts everything.
    pub fn new() -> Self {
        MockEndpoint::default()
    }

    /// Makes the next `n` pushes fail before reaching the authority.
    pub fn fail_next(&self, n: u32) {
        self.lock().fail_next = n;
    }

    /// Makes the next `n` pushes apply remotely but lose their ack.
    pub fn lose_acks(&self, n: u32) {
        self.lock().lose_acks = n;
    }

    /// Marks an event id as permanently malformed.
    pub fn reject_event(&self, event_id: &str) {
        self.lock().rejected.insert(event_id.to_string());
    }

    /// Ids of all deliveries that reached the endpoint, duplicates
    /// included, in arrival order.
    pub fn received_ids(&self) -> Vec<String> {
        self.lock().received.clone()
    }

    /// Number of events applied after dedup.
    pub fn applied_count(&self) -> usize {
        self.lock().applied.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock endpoint lock poisoned")
    }
}

impl SyncEndpoint for MockEndpoint {
    fn push_event(&self, event: &OperationalEvent) -> Result<PushOutcome, EndpointError> {
        let mut state = self.lock();

        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(EndpointError::Unreachable("simulated outage".into()));
        }

        state.received.push(event.event_id.clone());

        if state.rejected.contains(&event.event_id) {
            return Ok(PushOutcome::Rejected {
                reason: "malformed event".into(),
            });
        }

        state.applied.insert(event.event_id.clone());

        if state.lose_acks > 0 {
            state.lose_acks -= 1;
            return Err(EndpointError::Unreachable("simulated lost ack".into()));
        }

        Ok(PushOutcome::Accepted)
    }
}
