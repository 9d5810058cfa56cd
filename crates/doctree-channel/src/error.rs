//! Error types for the method channel.

use thiserror::Error;

/// Errors that can occur while carrying a call over the channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// A required argument is missing or has the wrong type.
    #[error("missing or invalid argument '{field}': expected {expected}")]
    InvalidArgument {
        field: String,
        expected: &'static str,
    },

    /// The serve loop has shut down.
    #[error("channel closed")]
    Closed,

    /// The handler dropped the call without responding.
    #[error("call '{0}' was dropped without a response")]
    NoResponse(String),
}

impl ChannelError {
    /// Build an argument error for `field`.
    pub fn invalid_argument(field: impl Into<String>, expected: &'static str) -> Self {
        ChannelError::InvalidArgument {
            field: field.into(),
            expected,
        }
    }
}

/// Errors from the worker pool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerError {
    /// The unit of work panicked.
    #[error("worker panicked: {0}")]
    Panicked(String),

    /// The pool no longer accepts work.
    #[error("worker pool closed")]
    Closed,

    /// The runtime cancelled the unit before it finished.
    #[error("worker cancelled")]
    Cancelled,
}

/// Result type for channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;
