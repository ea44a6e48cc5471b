// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! FieldSync Orchestrator
//!
//! Wires storage, cipher session, capture, finalization, identity
//! observation and the background sync engine into one engine object
//! owned by the host application.

use std::sync::{Arc, Mutex};

use super::config::EngineConfig;
use super::error::{EngineError, EngineResult};
use crate::crypto::CipherSession;
use crate::delivery::{DeliveryFinalization, DeliveryFinalizer, DeliveryOutcome};
use crate::event::{DeviceContext, EventRecorder, EventType, GeoPoint, OperationalEvent};
use crate::identity::DeviceIdentityObserver;
use crate::notify::{EventDispatcher, EventHandler};
use crate::storage::{DeadLetter, Storage};
use crate::sync::{SyncEndpoint, SyncEngine};

/// The assembled capture-and-sync engine for one device session.
pub struct FieldSync {
    storage: Arc<Mutex<Storage>>,
    recorder: EventRecorder,
    observer: DeviceIdentityObserver,
    sync: SyncEngine,
    config: EngineConfig,
}

impl FieldSync {
    /// Starts building an engine.
    pub fn builder() -> FieldSyncBuilder {
        FieldSyncBuilder::new()
    }

    /// Records a business fact. See [`EventRecorder::capture_event`].
    pub fn capture_event(
        &self,
        event_type: EventType,
        trip_id: &str,
        dispatch_id: &str,
        geo: GeoPoint,
        metadata: serde_json::Value,
    ) -> OperationalEvent {
        self.recorder
            .capture_event(event_type, trip_id, dispatch_id, geo, metadata)
    }

    /// Runs the delivery finalization workflow.
    pub fn finalize_delivery(
        &self,
        request: DeliveryFinalization,
    ) -> EngineResult<DeliveryOutcome> {
        let finalizer = DeliveryFinalizer::new(&self.recorder)
            .with_default_radius(self.config.facility_radius_m);
        Ok(finalizer.finalize(request)?)
    }

    /// Runs the new-device check for a login. Never blocks the login.
    pub fn observe_login(&self, actor_id: &str, geo: GeoPoint) -> Option<OperationalEvent> {
        self.observer.observe_login(actor_id, geo)
    }

    /// Explicit "sync now" trigger.
    pub fn force_sync(&self) {
        self.recorder.force_sync();
    }

    /// The capture service, for workflows that hold their own handle.
    pub fn recorder(&self) -> &EventRecorder {
        &self.recorder
    }

    /// Number of events awaiting acknowledgment.
    pub fn pending_count(&self) -> EngineResult<usize> {
        let store = self.storage.lock().expect("storage lock poisoned");
        Ok(store.count_pending()?)
    }

    /// Permanently rejected events awaiting operator review.
    pub fn dead_letters(&self) -> EngineResult<Vec<DeadLetter>> {
        let store = self.storage.lock().expect("storage lock poisoned");
        Ok(store.list_dead_letters()?)
    }

    /// Stops the background sync worker and waits for it.
    pub fn shutdown(self) {
        self.sync.shutdown();
    }
}

/// Builder assembling a [`FieldSync`] engine.
#[derive(Default)]
pub struct FieldSyncBuilder {
    config: EngineConfig,
    context: Option<DeviceContext>,
    endpoint: Option<Arc<dyn SyncEndpoint>>,
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl FieldSyncBuilder {
    pub fn new() -> Self {
        FieldSyncBuilder::default()
    }

    /// Sets the engine configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the identity context supplied by the session layer.
    pub fn context(mut self, context: DeviceContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Sets the remote authority the sync engine drains to.
    pub fn endpoint(mut self, endpoint: Arc<dyn SyncEndpoint>) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Registers a notification handler.
    pub fn add_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Opens storage, derives the session key from `secret`, and spawns
    /// the sync worker. The worker immediately resumes any queue left
    /// over from a previous process.
    pub fn build(self, secret: &[u8]) -> EngineResult<FieldSync> {
        let context = self
            .context
            .ok_or_else(|| EngineError::Configuration("device context is required".into()))?;
        let endpoint = self
            .endpoint
            .ok_or_else(|| EngineError::Configuration("sync endpoint is required".into()))?;

        let cipher = Arc::new(CipherSession::new());
        let storage = match &self.config.db_path {
            Some(path) => Storage::open(path, cipher.clone())?,
            None => Storage::in_memory(cipher.clone())?,
        };

        let salt = storage.load_or_create_kdf_salt()?;
        cipher.initialize(secret, &salt, &self.config.kdf)?;

        let mut dispatcher = EventDispatcher::new();
        for handler in self.handlers {
            dispatcher.add_handler(handler);
        }
        let events = Arc::new(dispatcher);

        let storage = Arc::new(Mutex::new(storage));
        let sync = SyncEngine::spawn(
            storage.clone(),
            endpoint,
            self.config.retry.clone(),
            events.clone(),
        );

        let recorder = EventRecorder::new(storage.clone(), context, sync.handle(), events);
        let observer = DeviceIdentityObserver::new(storage.clone(), recorder.clone());

        Ok(FieldSync {
            storage,
            recorder,
            observer,
            sync,
            config: self.config,
        })
    }
}
