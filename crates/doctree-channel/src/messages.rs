//! Method call and response types.
//!
//! A call is a method name plus a JSON argument map. A response is exactly
//! one of success, typed error or "not implemented".

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ChannelError, Result};

/// Method names understood by the document bridge.
pub mod methods {
    pub const PICK_DIRECTORY: &str = "pickDirectory";
    pub const LIST_FILES: &str = "listFiles";
    pub const DELETE_DOCUMENT: &str = "deleteDocument";
    pub const COPY_TO_CACHE: &str = "copyToCache";

    /// All recognized methods.
    pub const ALL: [&str; 4] = [PICK_DIRECTORY, LIST_FILES, DELETE_DOCUMENT, COPY_TO_CACHE];
}

/// A named operation invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    /// Argument map; `Null` when the caller passed nothing.
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }

    /// A call without arguments.
    pub fn bare(method: impl Into<String>) -> Self {
        Self::new(method, Value::Null)
    }

    /// Raw argument value, `None` if absent or if arguments are not a map.
    pub fn argument(&self, field: &str) -> Option<&Value> {
        self.arguments.as_object().and_then(|args| args.get(field))
    }

    /// A required string argument.
    pub fn required_str(&self, field: &str) -> Result<&str> {
        self.argument(field)
            .and_then(Value::as_str)
            .ok_or_else(|| ChannelError::invalid_argument(field, "string"))
    }

    /// An optional boolean argument; absent and `null` are `None`.
    pub fn optional_bool(&self, field: &str) -> Result<Option<bool>> {
        match self.argument(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(ChannelError::invalid_argument(field, "bool")),
        }
    }
}

/// Stable error codes reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    AlreadyActive,
    InvalidArg,
    ListError,
    DeleteError,
    ReadError,
    CopyError,
    GrantError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AlreadyActive => "ALREADY_ACTIVE",
            ErrorCode::InvalidArg => "INVALID_ARG",
            ErrorCode::ListError => "LIST_ERROR",
            ErrorCode::DeleteError => "DELETE_ERROR",
            ErrorCode::ReadError => "READ_ERROR",
            ErrorCode::CopyError => "COPY_ERROR",
            ErrorCode::GrantError => "GRANT_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one method call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum MethodResponse {
    /// The call succeeded; `result` may be `null`.
    Success { result: Value },

    /// The call failed with a typed error.
    Error {
        code: ErrorCode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<Value>,
    },

    /// No handler recognizes the method.
    NotImplemented,
}

impl MethodResponse {
    pub fn success(result: Value) -> Self {
        MethodResponse::Success { result }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        MethodResponse::Error {
            code,
            message: Some(message.into()),
            details: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, MethodResponse::Success { .. })
    }

    /// The error code, if this is an error.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            MethodResponse::Error { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// The success value, if this is a success.
    pub fn into_result(self) -> Option<Value> {
        match self {
            MethodResponse::Success { result } => Some(result),
            _ => None,
        }
    }
}
