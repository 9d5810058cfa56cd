//! Error types for the store module.

use doctree_core::CoreError;
use thiserror::Error;

/// Errors that can occur inside a document provider.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A URI or document id broke the URI contract.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The caller holds no grant covering the document.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Document not found.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The document exists but is not a regular file.
    #[error("not a file: {0}")]
    NotAFile(String),

    /// Provider-side fault with no more specific cause.
    #[error("provider failure: {0}")]
    Provider(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A lock was poisoned by a panicking holder.
    #[error("lock poisoned: {0}")]
    Poisoned(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
