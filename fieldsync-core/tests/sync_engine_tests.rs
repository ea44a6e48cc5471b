//! Tests for drain passes, retry accounting, and the background worker.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use fieldsync_core::crypto::{CipherSession, KdfParams};
use fieldsync_core::event::{DeviceContext, EventType, GeoPoint, LocalEnvelope, OperationalEvent};
use fieldsync_core::notify::{CallbackHandler, EngineEvent, EventDispatcher};
use fieldsync_core::storage::Storage;
use fieldsync_core::sync::{drain_once, MockEndpoint, RetryPolicy};
use fieldsync_core::{EngineConfig, FieldSync};
use serde_json::json;

fn test_session() -> Arc<CipherSession> {
    let session = Arc::new(CipherSession::new());
    session
        .initialize(
            b"secret",
            b"sync-test-salt-0",
            &KdfParams::Pbkdf2 { iterations: 1000 },
        )
        .unwrap();
    session
}

fn sample_event(id: &str, trip_id: &str) -> OperationalEvent {
    OperationalEvent {
        event_id: id.to_string(),
        event_type: EventType::DeliveryCompleted,
        actor_id: "driver-17".to_string(),
        device_id: "device-a1".to_string(),
        vehicle_id: "truck-9".to_string(),
        trip_id: trip_id.to_string(),
        dispatch_id: "dispatch-1".to_string(),
        timestamp_ms: 1_754_000_000_000,
        geo: GeoPoint::new(47.376887, 8.541694),
        metadata: json!({}),
    }
}

fn storage_with_events(ids: &[&str]) -> Mutex<Storage> {
    let storage = Storage::in_memory(test_session()).unwrap();
    for id in ids {
        storage
            .save_envelope(&LocalEnvelope::new(sample_event(id, "trip-1")))
            .unwrap();
    }
    Mutex::new(storage)
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}

// === Drain Pass ===

#[test]
fn test_drain_syncs_in_capture_order() {
    let storage = storage_with_events(&["evt-a", "evt-b", "evt-c"]);
    let endpoint = MockEndpoint::new();
    let events = EventDispatcher::new();

    let report = drain_once(&storage, &endpoint, &events);

    assert_eq!(report.synced, 3);
    assert!(report.failure.is_none());
    assert_eq!(endpoint.received_ids(), vec!["evt-a", "evt-b", "evt-c"]);
    assert_eq!(storage.lock().unwrap().count_pending().unwrap(), 0);
}

#[test]
fn test_transient_failure_stops_pass_and_counts_retry() {
    let storage = storage_with_events(&["evt-a", "evt-b"]);
    let endpoint = MockEndpoint::new();
    endpoint.fail_next(1);
    let events = EventDispatcher::new();

    let report = drain_once(&storage, &endpoint, &events);

    // Causal order: evt-b must not be attempted after evt-a failed.
    assert_eq!(report.synced, 0);
    let failure = report.failure.unwrap();
    assert_eq!(failure.event_id, "evt-a");
    assert_eq!(failure.retry_count, 1);
    assert!(endpoint.received_ids().is_empty());

    let store = storage.lock().unwrap();
    assert_eq!(store.count_pending().unwrap(), 2);
    assert_eq!(
        store.get_envelope("evt-a").unwrap().unwrap().retry_count,
        1
    );
    drop(store);

    // Next pass drains both, still in capture order.
    let report = drain_once(&storage, &endpoint, &events);
    assert_eq!(report.synced, 2);
    assert_eq!(endpoint.received_ids(), vec!["evt-a", "evt-b"]);
}

#[test]
fn test_earlier_successes_survive_later_failure() {
    let storage = storage_with_events(&["evt-a"]);
    let endpoint = MockEndpoint::new();
    let events = EventDispatcher::new();

    assert_eq!(drain_once(&storage, &endpoint, &events).synced, 1);

    {
        let store = storage.lock().unwrap();
        store
            .save_envelope(&LocalEnvelope::new(sample_event("evt-b", "trip-1")))
            .unwrap();
    }
    endpoint.fail_next(1);

    let report = drain_once(&storage, &endpoint, &events);
    assert!(report.failure.is_some());

    // evt-a's outcome was committed independently and never reverses.
    let store = storage.lock().unwrap();
    assert!(store.get_envelope("evt-a").unwrap().unwrap().synced);
    let pending = store.list_pending().unwrap();
    assert_eq!(pending.envelopes.len(), 1);
    assert_eq!(pending.envelopes[0].event.event_id, "evt-b");
}

#[test]
fn test_lost_ack_resends_and_server_dedupes() {
    let storage = storage_with_events(&["evt-a"]);
    let endpoint = MockEndpoint::new();
    // The authority applies the event but the acknowledgment is lost.
    endpoint.lose_acks(1);
    let events = EventDispatcher::new();

    let report = drain_once(&storage, &endpoint, &events);
    assert_eq!(report.synced, 0);
    assert_eq!(storage.lock().unwrap().count_pending().unwrap(), 1);

    // The resend is deduplicated by event id on the authority side.
    let report = drain_once(&storage, &endpoint, &events);
    assert_eq!(report.synced, 1);
    assert_eq!(endpoint.received_ids(), vec!["evt-a", "evt-a"]);
    assert_eq!(endpoint.applied_count(), 1);
    assert_eq!(storage.lock().unwrap().count_pending().unwrap(), 0);
}

#[test]
fn test_rejected_event_is_dead_lettered_not_blocking() {
    let storage = storage_with_events(&["evt-a", "evt-poison", "evt-c"]);
    let endpoint = MockEndpoint::new();
    endpoint.reject_event("evt-poison");
    let events = EventDispatcher::new();

    let report = drain_once(&storage, &endpoint, &events);

    assert_eq!(report.synced, 2);
    assert_eq!(report.dead_lettered, 1);
    assert!(report.failure.is_none());

    let store = storage.lock().unwrap();
    // The poison event no longer blocks the queue...
    assert_eq!(store.count_pending().unwrap(), 0);
    // ...but stays visible for operator inspection.
    let letters = store.list_dead_letters().unwrap();
    assert_eq!(letters.len(), 1);
    assert_eq!(letters[0].event_id, "evt-poison");
}

#[test]
fn test_undecryptable_record_reported_and_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fieldsync.db");

    let other_session = {
        let session = Arc::new(CipherSession::new());
        session
            .initialize(
                b"other-secret",
                b"sync-test-salt-0",
                &KdfParams::Pbkdf2 { iterations: 1000 },
            )
            .unwrap();
        session
    };

    {
        let storage = Storage::open(&path, other_session).unwrap();
        storage
            .save_envelope(&LocalEnvelope::new(sample_event("evt-foreign", "trip-0")))
            .unwrap();
    }

    let storage = Storage::open(&path, test_session()).unwrap();
    storage
        .save_envelope(&LocalEnvelope::new(sample_event("evt-mine", "trip-1")))
        .unwrap();
    let storage = Mutex::new(storage);

    let endpoint = MockEndpoint::new();
    let events = EventDispatcher::new();
    let report = drain_once(&storage, &endpoint, &events);

    assert_eq!(report.undecryptable, 1);
    assert_eq!(report.synced, 1);
    assert_eq!(endpoint.received_ids(), vec!["evt-mine"]);
    // The unreadable record is skipped, not deleted.
    assert_eq!(storage.lock().unwrap().count_pending().unwrap(), 1);
}

// === Retry Policy ===

#[test]
fn test_exponential_backoff_schedule() {
    // Backoff: 1s, 2s, 4s, 8s, ... capped at 3600s (1h).
    let policy = RetryPolicy::new();

    assert_eq!(policy.backoff_seconds(0), 1);
    assert_eq!(policy.backoff_seconds(1), 2);
    assert_eq!(policy.backoff_seconds(2), 4);
    assert_eq!(policy.backoff_seconds(10), 1024);
    assert_eq!(policy.backoff_seconds(12), 3600); // 4096 capped
    assert_eq!(policy.backoff_seconds(20), 3600); // always capped
}

#[test]
fn test_next_retry_time() {
    let policy = RetryPolicy::new();
    let base_time = 1000u64;

    assert_eq!(policy.next_retry_time(base_time, 0), 1001);
    assert_eq!(policy.next_retry_time(base_time, 1), 1002);
    assert_eq!(policy.next_retry_time(base_time, 2), 1004);
}

#[test]
fn test_custom_base_delay() {
    let policy = RetryPolicy {
        base_delay_secs: 30,
        max_delay_secs: 900,
    };

    assert_eq!(policy.backoff_seconds(0), 30);
    assert_eq!(policy.backoff_seconds(1), 60);
    assert_eq!(policy.backoff_seconds(5), 900); // 960 capped
}

// === Background Worker ===

fn test_engine(endpoint: Arc<MockEndpoint>) -> FieldSync {
    FieldSync::builder()
        .config(EngineConfig {
            kdf: KdfParams::Pbkdf2 { iterations: 1000 },
            ..Default::default()
        })
        .context(DeviceContext {
            actor_id: "driver-17".to_string(),
            device_id: "device-a1".to_string(),
            vehicle_id: "truck-9".to_string(),
        })
        .endpoint(endpoint)
        .build(b"1234")
        .unwrap()
}

#[test]
fn test_capture_triggers_background_sync() {
    let endpoint = Arc::new(MockEndpoint::new());
    let engine = test_engine(endpoint.clone());

    engine.capture_event(
        EventType::DeliveryCompleted,
        "trip-1",
        "dispatch-1",
        GeoPoint::new(47.0, 8.0),
        json!({"distance_meters": 4.0}),
    );

    assert!(wait_until(Duration::from_secs(5), || {
        endpoint.applied_count() == 1 && engine.pending_count().unwrap() == 0
    }));
    engine.shutdown();
}

#[test]
fn test_burst_of_captures_coalesces_and_drains_in_order() {
    let endpoint = Arc::new(MockEndpoint::new());
    let engine = test_engine(endpoint.clone());

    let mut ids = Vec::new();
    for i in 0..10 {
        let event = engine.capture_event(
            EventType::DeliveryCompleted,
            "trip-1",
            "dispatch-1",
            GeoPoint::new(47.0, 8.0),
            json!({"n": i}),
        );
        ids.push(event.event_id);
    }

    assert!(wait_until(Duration::from_secs(5), || {
        engine.pending_count().unwrap() == 0
    }));

    // Every event reached the authority in capture order (duplicates
    // cannot occur here: no failures were scripted).
    assert_eq!(endpoint.received_ids(), ids);
    engine.shutdown();
}

#[test]
fn test_force_sync_retries_after_outage() {
    let endpoint = Arc::new(MockEndpoint::new());
    // Large backoff so recovery within the test can only come from the
    // explicit trigger.
    let engine = FieldSync::builder()
        .config(EngineConfig {
            kdf: KdfParams::Pbkdf2 { iterations: 1000 },
            retry: RetryPolicy {
                base_delay_secs: 600,
                max_delay_secs: 3600,
            },
            ..Default::default()
        })
        .context(DeviceContext {
            actor_id: "driver-17".to_string(),
            device_id: "device-a1".to_string(),
            vehicle_id: "truck-9".to_string(),
        })
        .endpoint(endpoint.clone())
        .build(b"1234")
        .unwrap();

    endpoint.fail_next(u32::MAX);
    engine.capture_event(
        EventType::DeliveryCompleted,
        "trip-1",
        "dispatch-1",
        GeoPoint::new(47.0, 8.0),
        json!({}),
    );

    assert!(wait_until(Duration::from_secs(5), || {
        engine.pending_count().unwrap() == 1
    }));
    assert_eq!(endpoint.applied_count(), 0);

    // Connectivity returns; interactive "Sync Now" beats the backoff.
    endpoint.fail_next(0);
    engine.force_sync();
    assert!(wait_until(Duration::from_secs(5), || {
        engine.pending_count().unwrap() == 0
    }));
    assert_eq!(endpoint.applied_count(), 1);
    engine.shutdown();
}

#[test]
fn test_notifications_surface_background_outcomes() {
    let seen: Arc<Mutex<Vec<EngineEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();

    let endpoint = Arc::new(MockEndpoint::new());
    let engine = FieldSync::builder()
        .config(EngineConfig {
            kdf: KdfParams::Pbkdf2 { iterations: 1000 },
            ..Default::default()
        })
        .context(DeviceContext {
            actor_id: "driver-17".to_string(),
            device_id: "device-a1".to_string(),
            vehicle_id: "truck-9".to_string(),
        })
        .endpoint(endpoint.clone())
        .add_handler(Arc::new(CallbackHandler::new(move |event| {
            sink.lock().unwrap().push(event);
        })))
        .build(b"1234")
        .unwrap();

    let event = engine.capture_event(
        EventType::DeliveryCompleted,
        "trip-1",
        "dispatch-1",
        GeoPoint::new(47.0, 8.0),
        json!({}),
    );

    assert!(wait_until(Duration::from_secs(5), || {
        seen.lock()
            .unwrap()
            .iter()
            .any(|e| matches!(e, EngineEvent::EventSynced { event_id } if *event_id == event.event_id))
    }));

    let seen = seen.lock().unwrap();
    assert!(seen.iter().any(
        |e| matches!(e, EngineEvent::EventCaptured { event_id, .. } if *event_id == event.event_id)
    ));
    drop(seen);
    engine.shutdown();
}
