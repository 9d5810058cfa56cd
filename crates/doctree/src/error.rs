//! Error types for the bridge.

use doctree_channel::{ChannelError, ErrorCode, MethodResponse};
use doctree_grant::GrantError;
use thiserror::Error;

/// Errors that can occur during bridge operations.
///
/// Fault variants carry the underlying cause's message verbatim; that text is
/// what the caller sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// Missing or mistyped argument, rejected before any I/O.
    #[error(transparent)]
    Argument(#[from] ChannelError),

    /// A grant flow is already waiting for the user.
    #[error("a picker is already active")]
    AlreadyActive,

    /// The environment could not run or persist the grant flow.
    #[error("{0}")]
    Grant(String),

    /// Enumerating a tree failed.
    #[error("{0}")]
    List(String),

    /// Deleting a document failed unexpectedly.
    #[error("{0}")]
    Delete(String),

    /// The source document could not be opened.
    #[error("{0}")]
    Read(String),

    /// Writing the destination file failed.
    #[error("{0}")]
    Copy(String),
}

impl BridgeError {
    /// The wire code reported for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            BridgeError::Argument(_) => ErrorCode::InvalidArg,
            BridgeError::AlreadyActive => ErrorCode::AlreadyActive,
            BridgeError::Grant(_) => ErrorCode::GrantError,
            BridgeError::List(_) => ErrorCode::ListError,
            BridgeError::Delete(_) => ErrorCode::DeleteError,
            BridgeError::Read(_) => ErrorCode::ReadError,
            BridgeError::Copy(_) => ErrorCode::CopyError,
        }
    }
}

impl From<GrantError> for BridgeError {
    fn from(err: GrantError) -> Self {
        match err {
            GrantError::AlreadyPending => BridgeError::AlreadyActive,
            other => BridgeError::Grant(other.to_string()),
        }
    }
}

impl From<BridgeError> for MethodResponse {
    fn from(err: BridgeError) -> Self {
        MethodResponse::error(err.code(), err.to_string())
    }
}

/// Result type for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_errors_map_to_codes() {
        assert_eq!(BridgeError::from(GrantError::AlreadyPending).code(), ErrorCode::AlreadyActive);
        assert_eq!(
            BridgeError::from(GrantError::Launch("no ui".into())).code(),
            ErrorCode::GrantError
        );
    }

    #[test]
    fn test_response_carries_cause() {
        let response = MethodResponse::from(BridgeError::Read("permission denied".into()));
        assert_eq!(response, MethodResponse::error(ErrorCode::ReadError, "permission denied"));

        let response = MethodResponse::from(BridgeError::from(ChannelError::invalid_argument(
            "treeUri", "string",
        )));
        match response {
            MethodResponse::Error { code, message, .. } => {
                assert_eq!(code, ErrorCode::InvalidArg);
                assert!(message.unwrap().contains("treeUri"));
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }
}
