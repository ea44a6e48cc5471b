//! Storage error and record types.

use thiserror::Error;

use crate::event::LocalEnvelope;

/// Storage error types.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Migration error: {0}")]
    Migration(String),

    /// The backing database cannot be opened at all. Callers degrade to
    /// best-effort capture instead of crashing the workflow.
    #[error("Durable storage unavailable: {0}")]
    Unavailable(String),
}

/// A stored record that could not be decrypted while listing.
#[derive(Debug, Clone)]
pub struct DecryptFailure {
    pub event_id: String,
    pub error: String,
}

/// Result of listing the unsynced queue.
///
/// Decryption failures are isolated per record and reported here next
/// to the readable envelopes; one bad record never aborts the listing.
#[derive(Debug, Default)]
pub struct PendingEvents {
    /// Unsynced envelopes in capture order.
    pub envelopes: Vec<LocalEnvelope>,
    /// Records skipped because their payload would not decrypt.
    pub failures: Vec<DecryptFailure>,
}

/// An event the remote authority permanently rejected, kept for
/// operator inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    pub event_id: String,
    pub reason: String,
    pub rejected_at: u64,
}
