// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Password-Based Key Derivation
//!
//! Derives the at-rest encryption key from the driver's unlock secret.
//! Argon2id is the default (m=64MB, t=3, p=4, OWASP recommended);
//! PBKDF2-HMAC-SHA256 is available for hosts constrained to it.

use ring::pbkdf2;
use std::num::NonZeroU32;
use zeroize::Zeroize;

use super::SymmetricKey;

/// Argon2id memory cost in KiB (64 MB).
const ARGON2_M_COST: u32 = 65536;
/// Argon2id time cost (iterations).
const ARGON2_T_COST: u32 = 3;
/// Argon2id parallelism.
const ARGON2_P_COST: u32 = 4;

/// PBKDF2 iterations (OWASP recommendation for HMAC-SHA256).
const PBKDF2_ITERATIONS: u32 = 310_000;

/// Which key derivation function to run at session initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KdfParams {
    /// Argon2id with the crate's fixed cost parameters.
    Argon2id,
    /// PBKDF2-HMAC-SHA256 with an explicit iteration count.
    Pbkdf2 { iterations: u32 },
}

impl Default for KdfParams {
    fn default() -> Self {
        KdfParams::Argon2id
    }
}

impl KdfParams {
    /// PBKDF2 with the default iteration count.
    pub fn pbkdf2_default() -> Self {
        KdfParams::Pbkdf2 {
            iterations: PBKDF2_ITERATIONS,
        }
    }
}

/// Derives a 32-byte symmetric key from a secret using the selected KDF.
pub fn derive_key(
    secret: &[u8],
    salt: &[u8],
    params: &KdfParams,
) -> Result<SymmetricKey, PasswordKdfError> {
    match params {
        KdfParams::Argon2id => derive_key_argon2id(secret, salt),
        KdfParams::Pbkdf2 { iterations } => derive_key_pbkdf2(secret, salt, *iterations),
    }
}

/// Derives a 32-byte symmetric key from a password using Argon2id.
///
/// Parameters: m=64MB, t=3, p=4 per OWASP recommendations.
pub fn derive_key_argon2id(password: &[u8], salt: &[u8]) -> Result<SymmetricKey, PasswordKdfError> {
    let params = argon2::Params::new(ARGON2_M_COST, ARGON2_T_COST, ARGON2_P_COST, Some(32))
        .map_err(|e| PasswordKdfError::DerivationFailed(e.to_string()))?;

    let argon2 = argon2::Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut key_bytes = [0u8; 32];
    argon2
        .hash_password_into(password, salt, &mut key_bytes)
        .map_err(|e| PasswordKdfError::DerivationFailed(e.to_string()))?;

    let key = SymmetricKey::from_bytes(key_bytes);
    key_bytes.zeroize();
    Ok(key)
}

/// Derives a 32-byte symmetric key from a password using PBKDF2-HMAC-SHA256.
pub fn derive_key_pbkdf2(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
) -> Result<SymmetricKey, PasswordKdfError> {
    let mut key_bytes = [0u8; 32];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        NonZeroU32::new(iterations).ok_or(PasswordKdfError::DerivationFailed(
            "iterations must be non-zero".into(),
        ))?,
        salt,
        password,
        &mut key_bytes,
    );

    let key = SymmetricKey::from_bytes(key_bytes);
    key_bytes.zeroize();
    Ok(key)
}

/// Password KDF error types.
#[derive(Debug, thiserror::Error)]
pub enum PasswordKdfError {
    #[error("Key derivation failed: {0}")]
    DerivationFailed(String),
}
