// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Persistent Storage Module
//!
//! Encrypted local event log backed by SQLite. The store exclusively
//! owns the on-disk representation: the capture service and the sync
//! engine only ever go through `save_envelope`, `list_pending`,
//! `mark_synced` and `increment_retry`, never raw rows.

mod dead_letter;
mod device;
mod envelopes;
mod error;

pub mod migration;

pub use error::{DeadLetter, DecryptFailure, PendingEvents, StorageError};

use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;

use crate::crypto::CipherSession;

/// SQLite-based storage implementation.
///
/// Sync bookkeeping columns stay plaintext; every business field is
/// encrypted through the shared cipher session before it reaches disk.
pub struct Storage {
    conn: Connection,
    /// Session holding the key derived from the driver's secret.
    pub(crate) cipher: Arc<CipherSession>,
}

impl Storage {
    /// Opens or creates a storage database at the given path.
    ///
    /// Fails with [`StorageError::Unavailable`] when the database
    /// cannot be opened at all (missing directory, permissions, ...).
    pub fn open<P: AsRef<Path>>(
        path: P,
        cipher: Arc<CipherSession>,
    ) -> Result<Self, StorageError> {
        let conn = Connection::open(path)
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        let storage = Storage { conn, cipher };
        storage.run_migrations()?;
        Ok(storage)
    }

    /// Creates an in-memory storage (for testing).
    pub fn in_memory(cipher: Arc<CipherSession>) -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        let storage = Storage { conn, cipher };
        storage.run_migrations()?;
        Ok(storage)
    }

    /// Runs all pending schema migrations.
    fn run_migrations(&self) -> Result<(), StorageError> {
        let migrations = migration::all_migrations();
        migration::MigrationRunner::run(&self.conn, &migrations)
    }

    /// Returns the current schema version.
    pub fn schema_version(&self) -> Result<u32, StorageError> {
        migration::MigrationRunner::current_version(&self.conn)
    }
}
