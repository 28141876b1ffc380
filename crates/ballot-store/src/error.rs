use std::path::PathBuf;

use ballot_ledger::LedgerError;

/// Errors from snapshot store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored snapshot failed replay or validation.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// A ballot already exists where a new one was about to be created.
    #[error("ballot state already exists at {}", .0.display())]
    AlreadyExists(PathBuf),

    /// The stored journal gained receipts since the caller loaded it.
    #[error("stored ballot changed since it was loaded")]
    HeadMoved,

    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
