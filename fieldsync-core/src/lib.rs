//! FieldSync Core Library
//!
//! Offline-first operational event capture and synchronization for
//! field agents on intermittently connected devices. Events are
//! timestamped at the source, written encrypted to durable local
//! storage before capture returns, and drained to the remote authority
//! in the background with at-least-once, idempotent delivery.

pub mod api;
pub mod crypto;
pub mod delivery;
pub mod event;
pub mod identity;
pub mod notify;
pub mod storage;
pub mod sync;

pub use api::{EngineConfig, EngineError, EngineResult, FieldSync, FieldSyncBuilder};
pub use crypto::{CipherError, CipherSession, KdfParams, SymmetricKey};
pub use delivery::{
    haversine_distance_m, DeliveryError, DeliveryFinalization, DeliveryFinalizer, DeliveryOutcome,
    ProofMethod, ProofOfDelivery, ReconciliationItem, DEFAULT_FACILITY_RADIUS_M,
};
pub use event::{
    DeviceContext, EventRecorder, EventType, GeoPoint, LocalEnvelope, OperationalEvent,
    SYSTEM_CORRELATION,
};
pub use identity::DeviceIdentityObserver;
pub use notify::{CallbackHandler, EngineEvent, EventDispatcher, EventHandler};
pub use storage::{DeadLetter, DecryptFailure, PendingEvents, Storage, StorageError};
#[cfg(feature = "http-endpoint")]
pub use sync::HttpEndpoint;
pub use sync::{
    drain_once, DrainReport, EndpointError, MockEndpoint, PushOutcome, RetryPolicy, SyncEndpoint,
    SyncEngine, SyncFailure, SyncHandle,
};
