// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! API Error Types
//!
//! Unified error type for the FieldSync API layer.

use thiserror::Error;

use crate::crypto::CipherError;
use crate::delivery::DeliveryError;
use crate::storage::StorageError;
use crate::sync::EndpointError;

/// Unified error type for FieldSync operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Cipher session operation failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CipherError),

    /// Delivery finalization was refused.
    #[error("delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    /// Endpoint construction failed.
    #[error("endpoint error: {0}")]
    Endpoint(#[from] EndpointError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type for FieldSync operations.
pub type EngineResult<T> = Result<T, EngineError>;
