// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Event envelope storage operations.

use rusqlite::params;

use super::error::{DecryptFailure, PendingEvents};
use super::{Storage, StorageError};
use crate::event::{LocalEnvelope, OperationalEvent};

impl Storage {
    // === Event Log Operations ===

    /// Durably writes an envelope, keyed by its event id.
    ///
    /// The event's business fields are encrypted before the single
    /// atomic insert; only sync bookkeeping stays plaintext. Event ids
    /// are globally unique, so a duplicate id is not a normal code
    /// path — if one occurs anyway the original record wins and the
    /// store is left untouched (facts are immutable).
    pub fn save_envelope(&self, envelope: &LocalEnvelope) -> Result<(), StorageError> {
        let (ciphertext, nonce) = self
            .cipher
            .encrypt_value(&envelope.event)
            .map_err(|e| StorageError::Encryption(e.to_string()))?;

        self.conn.execute(
            "INSERT OR IGNORE INTO event_log
             (event_id, synced, retry_count, captured_at, ciphertext, nonce)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                envelope.event.event_id,
                envelope.synced as i32,
                envelope.retry_count as i32,
                envelope.event.timestamp_ms as i64,
                ciphertext,
                nonce.as_slice(),
            ],
        )?;

        Ok(())
    }

    /// Returns all unsynced envelopes in capture order, decrypted.
    ///
    /// A record whose payload will not decrypt is reported in the
    /// result's `failures` and skipped; it never aborts the listing.
    pub fn list_pending(&self) -> Result<PendingEvents, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT event_id, retry_count, ciphertext, nonce
             FROM event_log WHERE synced = 0 ORDER BY seq",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i32>(1)? as u32,
                row.get::<_, Vec<u8>>(2)?,
                row.get::<_, Vec<u8>>(3)?,
            ))
        })?;

        let mut pending = PendingEvents::default();
        for row in rows {
            let (event_id, retry_count, ciphertext, nonce) = row?;
            match self
                .cipher
                .decrypt_value::<OperationalEvent>(&ciphertext, &nonce)
            {
                Ok(event) => pending.envelopes.push(LocalEnvelope {
                    event,
                    synced: false,
                    retry_count,
                }),
                Err(e) => pending.failures.push(DecryptFailure {
                    event_id,
                    error: e.to_string(),
                }),
            }
        }

        Ok(pending)
    }

    /// Gets a single envelope by event id.
    pub fn get_envelope(&self, event_id: &str) -> Result<Option<LocalEnvelope>, StorageError> {
        let result = self.conn.query_row(
            "SELECT synced, retry_count, ciphertext, nonce
             FROM event_log WHERE event_id = ?1",
            params![event_id],
            |row| {
                Ok((
                    row.get::<_, i32>(0)? != 0,
                    row.get::<_, i32>(1)? as u32,
                    row.get::<_, Vec<u8>>(2)?,
                    row.get::<_, Vec<u8>>(3)?,
                ))
            },
        );

        match result {
            Ok((synced, retry_count, ciphertext, nonce)) => {
                let event = self
                    .cipher
                    .decrypt_value::<OperationalEvent>(&ciphertext, &nonce)
                    .map_err(|e| StorageError::Encryption(e.to_string()))?;
                Ok(Some(LocalEnvelope {
                    event,
                    synced,
                    retry_count,
                }))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Database(e)),
        }
    }

    /// Marks an event as acknowledged by the remote authority.
    ///
    /// Idempotent: marking an already-synced or unknown id is a no-op,
    /// so a crash between "server ack received" and "local mark" is
    /// safely retryable. Returns whether a row actually flipped.
    pub fn mark_synced(&self, event_id: &str) -> Result<bool, StorageError> {
        let rows_affected = self.conn.execute(
            "UPDATE event_log SET synced = 1 WHERE event_id = ?1 AND synced = 0",
            params![event_id],
        )?;
        Ok(rows_affected > 0)
    }

    /// Increments the persisted retry count for an event.
    pub fn increment_retry(&self, event_id: &str) -> Result<bool, StorageError> {
        let rows_affected = self.conn.execute(
            "UPDATE event_log SET retry_count = retry_count + 1 WHERE event_id = ?1",
            params![event_id],
        )?;
        Ok(rows_affected > 0)
    }

    /// Counts unsynced events.
    pub fn count_pending(&self) -> Result<usize, StorageError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM event_log WHERE synced = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Counts all events ever captured on this device.
    pub fn count_events(&self) -> Result<usize, StorageError> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM event_log", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
