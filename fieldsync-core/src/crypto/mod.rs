// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod encryption;
pub mod password_kdf;
pub mod session;

pub use encryption::{decrypt, encrypt, EncryptionError, SymmetricKey, NONCE_SIZE};
pub use password_kdf::{
    derive_key, derive_key_argon2id, derive_key_pbkdf2, KdfParams, PasswordKdfError,
};
pub use session::{CipherError, CipherSession};
