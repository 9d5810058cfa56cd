//! Error types for doctree core.

use thiserror::Error;

/// Errors raised while interpreting tree and document identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The URI does not follow the document URI contract.
    #[error("malformed uri: {0}")]
    MalformedUri(String),

    /// The document id cannot be mapped onto the provider's namespace.
    #[error("invalid document id: {0}")]
    InvalidDocumentId(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
