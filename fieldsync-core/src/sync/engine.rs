// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Sync Engine
//!
//! Drains the unsynced queue to the remote authority on a background
//! worker thread. Capture hands the worker a drain-request signal and
//! returns immediately; sync proceeds on its own schedule. At most one
//! drain runs at a time per session — triggers arriving while a drain
//! is active (or while backing off) are coalesced into the next pass.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use super::endpoint::{PushOutcome, SyncEndpoint};
use super::retry::RetryPolicy;
use crate::notify::{EngineEvent, EventDispatcher};
use crate::storage::Storage;

/// Signals understood by the sync worker.
enum SyncSignal {
    /// Please ensure another drain pass happens soon.
    Drain,
    /// Stop the worker.
    Shutdown,
}

/// Cloneable trigger for requesting a drain pass.
///
/// Sending never blocks and never fails the caller; if the worker is
/// gone the request is dropped with a warning.
#[derive(Clone)]
pub struct SyncHandle {
    tx: Sender<SyncSignal>,
}

impl SyncHandle {
    /// Requests a drain pass without awaiting it.
    pub fn trigger(&self) {
        if self.tx.send(SyncSignal::Drain).is_err() {
            warn!("sync worker is gone; drain request dropped");
        }
    }
}

/// The transient failure that stopped a drain pass.
#[derive(Debug, Clone)]
pub struct SyncFailure {
    pub event_id: String,
    /// Persisted retry count after this failure.
    pub retry_count: u32,
    pub error: String,
}

/// Outcome of a single drain pass.
#[derive(Debug, Default)]
pub struct DrainReport {
    /// Events acknowledged and marked synced.
    pub synced: usize,
    /// Events permanently rejected and dead-lettered.
    pub dead_lettered: usize,
    /// Records skipped because they would not decrypt.
    pub undecryptable: usize,
    /// Set when a transient failure stopped the pass early.
    pub failure: Option<SyncFailure>,
}

/// Runs one synchronous drain pass over the unsynced queue.
///
/// Pending envelopes are pushed in capture order. Each acknowledgment
/// is committed to the store immediately, so a later failure never
/// rolls back earlier successes. A transient endpoint failure stops
/// the pass (events within a trip must reach the authority in capture
/// order); a permanent rejection dead-letters the event and moves on.
pub fn drain_once(
    storage: &Mutex<Storage>,
    endpoint: &dyn SyncEndpoint,
    events: &EventDispatcher,
) -> DrainReport {
    let mut report = DrainReport::default();

    let pending = {
        let store = storage.lock().expect("storage lock poisoned");
        match store.list_pending() {
            Ok(pending) => pending,
            Err(e) => {
                warn!("listing pending events failed: {}", e);
                return report;
            }
        }
    };

    report.undecryptable = pending.failures.len();
    for failure in &pending.failures {
        warn!(
            "skipping undecryptable record {}: {}",
            failure.event_id, failure.error
        );
        events.dispatch(EngineEvent::UndecryptableRecord {
            event_id: failure.event_id.clone(),
            error: failure.error.clone(),
        });
    }

    for envelope in pending.envelopes {
        let event_id = envelope.event.event_id.clone();

        match endpoint.push_event(&envelope.event) {
            Ok(PushOutcome::Accepted) => {
                let store = storage.lock().expect("storage lock poisoned");
                if let Err(e) = store.mark_synced(&event_id) {
                    // The server has the event; the mark will be retried
                    // on the next pass and dedup absorbs the resend.
                    warn!("marking {} synced failed: {}", event_id, e);
                    continue;
                }
                debug!("event {} acknowledged", event_id);
                events.dispatch(EngineEvent::EventSynced {
                    event_id: event_id.clone(),
                });
                report.synced += 1;
            }
            Ok(PushOutcome::Rejected { reason }) => {
                warn!("event {} rejected by authority: {}", event_id, reason);
                {
                    let store = storage.lock().expect("storage lock poisoned");
                    if let Err(e) = store.mark_synced(&event_id) {
                        warn!("marking rejected {} synced failed: {}", event_id, e);
                    }
                    if let Err(e) = store.record_dead_letter(&event_id, &reason) {
                        warn!("recording dead letter {} failed: {}", event_id, e);
                    }
                }
                events.dispatch(EngineEvent::DeadLettered {
                    event_id: event_id.clone(),
                    reason,
                });
                report.dead_lettered += 1;
            }
            Err(e) => {
                let retry_count = envelope.retry_count + 1;
                {
                    let store = storage.lock().expect("storage lock poisoned");
                    if let Err(e) = store.increment_retry(&event_id) {
                        warn!("persisting retry count for {} failed: {}", event_id, e);
                    }
                }
                warn!(
                    "sync of {} failed (attempt {}): {}; stopping pass",
                    event_id, retry_count, e
                );
                events.dispatch(EngineEvent::SyncFailed {
                    event_id: event_id.clone(),
                    retry_count,
                    error: e.to_string(),
                });
                report.failure = Some(SyncFailure {
                    event_id,
                    retry_count,
                    error: e.to_string(),
                });
                break;
            }
        }
    }

    report
}

/// Background worker draining the queue.
///
/// Spawned once per engine; an initial drain is queued at spawn so a
/// queue left over from a previous process resumes without waiting for
/// the next capture.
pub struct SyncEngine {
    handle: SyncHandle,
    worker: Option<thread::JoinHandle<()>>,
}

impl SyncEngine {
    /// Spawns the worker thread.
    pub fn spawn(
        storage: Arc<Mutex<Storage>>,
        endpoint: Arc<dyn SyncEndpoint>,
        policy: RetryPolicy,
        events: Arc<EventDispatcher>,
    ) -> Self {
        let (tx, rx) = mpsc::channel();

        // Resume whatever the previous session left unsynced.
        let _ = tx.send(SyncSignal::Drain);

        let worker = thread::spawn(move || worker_loop(rx, storage, endpoint, policy, events));

        SyncEngine {
            handle: SyncHandle { tx },
            worker: Some(worker),
        }
    }

    /// Returns a cloneable drain trigger.
    pub fn handle(&self) -> SyncHandle {
        self.handle.clone()
    }

    /// Stops the worker and waits for it to finish.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.handle.tx.send(SyncSignal::Shutdown);
            if worker.join().is_err() {
                warn!("sync worker panicked during shutdown");
            }
        }
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(
    rx: Receiver<SyncSignal>,
    storage: Arc<Mutex<Storage>>,
    endpoint: Arc<dyn SyncEndpoint>,
    policy: RetryPolicy,
    events: Arc<EventDispatcher>,
) {
    // While a retry is scheduled, we sleep on the channel with a
    // timeout: a fresh trigger wakes us early, the timeout fires the
    // retry on its own.
    let mut backoff: Option<Duration> = None;

    loop {
        let signal = match backoff {
            Some(delay) => match rx.recv_timeout(delay) {
                Ok(signal) => Some(signal),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => return,
            },
            None => match rx.recv() {
                Ok(signal) => Some(signal),
                Err(_) => return,
            },
        };

        if matches!(signal, Some(SyncSignal::Shutdown)) {
            return;
        }

        // Coalesce triggers that piled up while we were busy.
        loop {
            match rx.try_recv() {
                Ok(SyncSignal::Drain) => {}
                Ok(SyncSignal::Shutdown) => return,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return,
            }
        }

        let report = drain_once(&storage, endpoint.as_ref(), &events);

        backoff = report.failure.as_ref().map(|failure| {
            let delay = policy.backoff_seconds(failure.retry_count.saturating_sub(1));
            debug!(
                "drain stopped at {}; retrying in {}s",
                failure.event_id, delay
            );
            Duration::from_secs(delay)
        });
    }
}
