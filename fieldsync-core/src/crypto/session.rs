// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Cipher Session
//!
//! Holds the derived at-rest key for the lifetime of a device session.
//! The session must be initialized exactly once (deriving the key from
//! the driver's secret and the stored salt) before any encrypt or
//! decrypt call; the key lives only in memory and is never persisted
//! or logged.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::OnceLock;
use thiserror::Error;

use super::encryption::{self, EncryptionError, SymmetricKey, NONCE_SIZE};
use super::password_kdf::{derive_key, KdfParams, PasswordKdfError};

/// Cipher session error types.
#[derive(Error, Debug)]
pub enum CipherError {
    #[error("Cipher session not initialized")]
    NotInitialized,

    #[error("Cipher session already initialized")]
    AlreadyInitialized,

    #[error("Key derivation error: {0}")]
    Kdf(#[from] PasswordKdfError),

    #[error("Encryption error: {0}")]
    Encryption(#[from] EncryptionError),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Session-scoped cipher state.
///
/// Created empty, initialized once with the user secret, then shared by
/// reference with the durable store. Sharing an explicit session object
/// (instead of module-level key state) keeps key lifecycle testable and
/// prevents key material from leaking across unrelated sessions.
#[derive(Default)]
pub struct CipherSession {
    key: OnceLock<SymmetricKey>,
}

impl CipherSession {
    /// Creates an uninitialized session.
    pub fn new() -> Self {
        CipherSession {
            key: OnceLock::new(),
        }
    }

    /// Derives the session key from `secret` and `salt`.
    ///
    /// Must be called exactly once; a second call fails with
    /// [`CipherError::AlreadyInitialized`].
    pub fn initialize(
        &self,
        secret: &[u8],
        salt: &[u8],
        params: &KdfParams,
    ) -> Result<(), CipherError> {
        let key = derive_key(secret, salt, params)?;
        self.key
            .set(key)
            .map_err(|_| CipherError::AlreadyInitialized)
    }

    /// Returns true once the session key has been derived.
    pub fn is_initialized(&self) -> bool {
        self.key.get().is_some()
    }

    /// Serializes and encrypts a value, returning ciphertext and nonce.
    pub fn encrypt_value<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<(Vec<u8>, [u8; NONCE_SIZE]), CipherError> {
        let key = self.key.get().ok_or(CipherError::NotInitialized)?;
        let plaintext =
            serde_json::to_vec(value).map_err(|e| CipherError::Serialization(e.to_string()))?;
        Ok(encryption::encrypt(key, &plaintext)?)
    }

    /// Decrypts and deserializes a value.
    pub fn decrypt_value<T: DeserializeOwned>(
        &self,
        ciphertext: &[u8],
        nonce: &[u8],
    ) -> Result<T, CipherError> {
        let key = self.key.get().ok_or(CipherError::NotInitialized)?;
        let plaintext = encryption::decrypt(key, ciphertext, nonce)?;
        serde_json::from_slice(&plaintext).map_err(|e| CipherError::Serialization(e.to_string()))
    }
}

impl std::fmt::Debug for CipherSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherSession")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
