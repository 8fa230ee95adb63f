//! Error types for spydify-sync
//!
//! Caller contract violations (oversized batches, unknown entity kinds,
//! malformed release dates) fail fast. Network trouble is not represented
//! here: it surfaces as a non-fatal [`crate::fetch::FetchFailure`].

use thiserror::Error;

/// Synchronization error type
#[derive(Debug, Error)]
pub enum SyncError {
    /// Batch request larger than the provider maximum, or a non-positive
    /// maximum for a non-empty work list
    #[error("Invalid batch size for {kind}: requested {requested}, maximum {max}")]
    InvalidBatchSize {
        kind: String,
        requested: usize,
        max: usize,
    },

    /// Entity kind or stage name outside the supported set
    #[error("Unknown entity kind: {0}")]
    UnknownEntityKind(String),

    /// Release date that is neither YYYY, YYYY-MM nor YYYY-MM-DD
    #[error("Invalid release date: {0}")]
    InvalidReleaseDate(String),

    /// Bearer token could not be obtained
    #[error("Credential error: {0}")]
    Credential(String),

    /// Configuration problem detected at start-up
    #[error("Configuration error: {0}")]
    Config(String),

    /// Store operation failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// spydify-common error
    #[error(transparent)]
    Common(#[from] spydify_common::Error),
}

/// Result type for synchronization operations
pub type SyncResult<T> = Result<T, SyncError>;
