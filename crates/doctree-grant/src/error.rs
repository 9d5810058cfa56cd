//! Error types for the grant broker.

use thiserror::Error;

/// Errors that can occur during a grant flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrantError {
    /// Another grant flow is already waiting for the user.
    #[error("a picker is already active")]
    AlreadyPending,

    /// The environment refused to start the interactive request.
    #[error("failed to launch grant request: {0}")]
    Launch(String),

    /// The user picked a location but the grant could not be persisted.
    #[error("failed to persist grant: {0}")]
    Persist(String),

    /// The broker went away before the flow completed.
    #[error("grant flow abandoned")]
    Abandoned,

    /// The pending slot lock was poisoned.
    #[error("lock poisoned: {0}")]
    Poisoned(String),
}

/// Result type for grant operations.
pub type Result<T> = std::result::Result<T, GrantError>;
