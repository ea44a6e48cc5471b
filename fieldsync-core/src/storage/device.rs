// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Device-local state operations.
//!
//! Plaintext per-device bookkeeping: the last-known actor marker used
//! for new-device detection, and the KDF salt created on first open.

use rusqlite::params;

use super::{Storage, StorageError};

/// KDF salt length in bytes.
pub(crate) const KDF_SALT_SIZE: usize = 16;

impl Storage {
    // === Known Actor Operations ===

    /// Loads the last actor known to have used this device.
    pub fn load_known_actor(&self) -> Result<Option<String>, StorageError> {
        let result = self.conn.query_row(
            "SELECT actor_id FROM known_actor WHERE id = 1",
            [],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(actor_id) => Ok(Some(actor_id)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Database(e)),
        }
    }

    /// Updates the known-actor marker.
    pub fn save_known_actor(&self, actor_id: &str) -> Result<(), StorageError> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system time before UNIX epoch")
            .as_secs();

        self.conn.execute(
            "INSERT OR REPLACE INTO known_actor (id, actor_id, updated_at)
             VALUES (1, ?1, ?2)",
            params![actor_id, now as i64],
        )?;
        Ok(())
    }

    // === Cipher Bootstrap ===

    /// Returns this device's KDF salt, generating and persisting one on
    /// first use. The salt is not secret; it only has to be stable per
    /// device so the same driver secret always derives the same key.
    pub fn load_or_create_kdf_salt(&self) -> Result<Vec<u8>, StorageError> {
        let existing = self.conn.query_row(
            "SELECT kdf_salt FROM cipher_state WHERE id = 1",
            [],
            |row| row.get::<_, Vec<u8>>(0),
        );

        match existing {
            Ok(salt) => Ok(salt),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                use ring::rand::{SecureRandom, SystemRandom};
                let mut salt = vec![0u8; KDF_SALT_SIZE];
                SystemRandom::new()
                    .fill(&mut salt)
                    .map_err(|_| StorageError::Encryption("Salt generation failed".into()))?;

                let now = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .expect("system time before UNIX epoch")
                    .as_secs();

                self.conn.execute(
                    "INSERT INTO cipher_state (id, kdf_salt, created_at) VALUES (1, ?1, ?2)",
                    params![salt, now as i64],
                )?;
                Ok(salt)
            }
            Err(e) => Err(StorageError::Database(e)),
        }
    }
}
