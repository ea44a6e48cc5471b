//! Tests for capture semantics: durability before return, prompt
//! capture under network outage, resume after restart, and degraded
//! storage behavior.

use std::sync::Arc;
use std::time::{Duration, Instant};

use fieldsync_core::crypto::{CipherSession, KdfParams};
use fieldsync_core::event::{DeviceContext, EventType, GeoPoint};
use fieldsync_core::storage::Storage;
use fieldsync_core::sync::MockEndpoint;
use fieldsync_core::{EngineConfig, EngineError, FieldSync, StorageError};
use serde_json::json;

fn test_context() -> DeviceContext {
    DeviceContext {
        actor_id: "driver-17".to_string(),
        device_id: "device-a1".to_string(),
        vehicle_id: "truck-9".to_string(),
    }
}

fn engine_at(path: &std::path::Path, endpoint: Arc<MockEndpoint>) -> FieldSync {
    FieldSync::builder()
        .config(EngineConfig {
            db_path: Some(path.to_path_buf()),
            kdf: KdfParams::Pbkdf2 { iterations: 1000 },
            ..Default::default()
        })
        .context(test_context())
        .endpoint(endpoint)
        .build(b"1234")
        .unwrap()
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

#[test]
fn test_capture_stamps_identity_and_timestamp() {
    let endpoint = Arc::new(MockEndpoint::new());
    endpoint.fail_next(u32::MAX);
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_at(&dir.path().join("fieldsync.db"), endpoint);

    let before_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64;

    let event = engine.capture_event(
        EventType::DeliveryCompleted,
        "trip-1",
        "dispatch-1",
        GeoPoint::new(47.0, 8.0),
        json!({"distance_meters": 3.0}),
    );

    assert_eq!(event.actor_id, "driver-17");
    assert_eq!(event.device_id, "device-a1");
    assert_eq!(event.vehicle_id, "truck-9");
    assert!(event.timestamp_ms >= before_ms);
    assert!(!event.event_id.is_empty());
    engine.shutdown();
}

#[test]
fn test_capture_is_durable_while_offline() {
    let endpoint = Arc::new(MockEndpoint::new());
    endpoint.fail_next(u32::MAX);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fieldsync.db");
    let engine = engine_at(&path, endpoint.clone());

    // Capture never blocks on the unreachable network.
    for i in 0..5 {
        engine.capture_event(
            EventType::DeliveryCompleted,
            "trip-1",
            "dispatch-1",
            GeoPoint::new(47.0, 8.0),
            json!({"n": i}),
        );
    }

    assert_eq!(engine.pending_count().unwrap(), 5);
    assert_eq!(endpoint.applied_count(), 0);
    engine.shutdown();
}

#[test]
fn test_events_resume_syncing_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fieldsync.db");

    let captured = {
        let endpoint = Arc::new(MockEndpoint::new());
        endpoint.fail_next(u32::MAX);
        let engine = engine_at(&path, endpoint);
        let event = engine.capture_event(
            EventType::DeliveryCompleted,
            "trip-1",
            "dispatch-1",
            GeoPoint::new(47.0, 8.0),
            json!({}),
        );
        assert_eq!(engine.pending_count().unwrap(), 1);
        engine.shutdown();
        event
    };

    // A fresh process with connectivity drains the queue without any
    // new capture: the spawn-time drain picks it up.
    let endpoint = Arc::new(MockEndpoint::new());
    let engine = engine_at(&path, endpoint.clone());

    assert!(wait_until(Duration::from_secs(5), || {
        endpoint.applied_count() == 1 && engine.pending_count().unwrap() == 0
    }));
    assert_eq!(endpoint.received_ids(), vec![captured.event_id]);
    engine.shutdown();
}

#[test]
fn test_crashed_session_leaves_readable_queue() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fieldsync.db");

    let event = {
        let endpoint = Arc::new(MockEndpoint::new());
        endpoint.fail_next(u32::MAX);
        let engine = engine_at(&path, endpoint);
        let event = engine.capture_event(
            EventType::DeliveryCompleted,
            "trip-1",
            "dispatch-1",
            GeoPoint::new(47.0, 8.0),
            json!({"proof": "photo-ref-1"}),
        );
        engine.shutdown();
        event
    };

    // Reading the store directly, the way the next session's engine
    // would: open, load the stored salt, derive the same key.
    let session = Arc::new(CipherSession::new());
    let storage = Storage::open(&path, session.clone()).unwrap();
    let salt = storage.load_or_create_kdf_salt().unwrap();
    session
        .initialize(b"1234", &salt, &KdfParams::Pbkdf2 { iterations: 1000 })
        .unwrap();

    let pending = storage.list_pending().unwrap();
    assert_eq!(pending.envelopes.len(), 1);
    assert_eq!(pending.envelopes[0].event, event);
}

#[test]
fn test_unavailable_storage_fails_build_not_panics() {
    let endpoint = Arc::new(MockEndpoint::new());
    let result = FieldSync::builder()
        .config(EngineConfig {
            db_path: Some("/nonexistent-dir/definitely/missing.db".into()),
            kdf: KdfParams::Pbkdf2 { iterations: 1000 },
            ..Default::default()
        })
        .context(test_context())
        .endpoint(endpoint)
        .build(b"1234");

    assert!(matches!(
        result,
        Err(EngineError::Storage(StorageError::Unavailable(_)))
    ));
}

#[test]
fn test_builder_requires_context_and_endpoint() {
    let missing_context = FieldSync::builder()
        .endpoint(Arc::new(MockEndpoint::new()))
        .build(b"1234");
    assert!(matches!(
        missing_context,
        Err(EngineError::Configuration(_))
    ));

    let missing_endpoint = FieldSync::builder().context(test_context()).build(b"1234");
    assert!(matches!(
        missing_endpoint,
        Err(EngineError::Configuration(_))
    ));
}
