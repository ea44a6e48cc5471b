// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Dead-letter storage operations.
//!
//! Events the remote authority permanently rejects are marked synced so
//! they never block the queue, and recorded here for operator review.

use rusqlite::params;

use super::error::DeadLetter;
use super::{Storage, StorageError};

impl Storage {
    // === Dead Letter Operations ===

    /// Records a permanently rejected event.
    pub fn record_dead_letter(&self, event_id: &str, reason: &str) -> Result<(), StorageError> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system time before UNIX epoch")
            .as_secs();

        self.conn.execute(
            "INSERT OR REPLACE INTO dead_letters (event_id, reason, rejected_at)
             VALUES (?1, ?2, ?3)",
            params![event_id, reason, now as i64],
        )?;
        Ok(())
    }

    /// Lists all dead letters, oldest first.
    pub fn list_dead_letters(&self) -> Result<Vec<DeadLetter>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT event_id, reason, rejected_at FROM dead_letters ORDER BY rejected_at",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(DeadLetter {
                event_id: row.get(0)?,
                reason: row.get(1)?,
                rejected_at: row.get::<_, i64>(2)? as u64,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::Database)
    }

    /// Counts dead letters awaiting operator review.
    pub fn count_dead_letters(&self) -> Result<usize, StorageError> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM dead_letters", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
