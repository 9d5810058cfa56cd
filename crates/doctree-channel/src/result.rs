//! Exactly-once responder for a method call.

use serde_json::Value;
use tokio::sync::oneshot;

use crate::messages::{ErrorCode, MethodResponse};

/// The handler's side of one call.
///
/// Every responding method consumes the responder, so a call cannot be
/// answered twice. Answering a caller that has gone away is a no-op.
#[derive(Debug)]
pub struct MethodResult {
    method: String,
    sender: oneshot::Sender<MethodResponse>,
}

impl MethodResult {
    /// Create a responder and the receiving end the caller waits on.
    pub fn channel(method: impl Into<String>) -> (Self, oneshot::Receiver<MethodResponse>) {
        let (sender, receiver) = oneshot::channel();
        (
            Self {
                method: method.into(),
                sender,
            },
            receiver,
        )
    }

    /// Name of the method being answered.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Whether the caller has stopped waiting.
    pub fn is_abandoned(&self) -> bool {
        self.sender.is_closed()
    }

    pub fn success(self, result: Value) {
        self.respond(MethodResponse::success(result));
    }

    pub fn error(self, code: ErrorCode, message: impl Into<String>, details: Option<Value>) {
        self.respond(MethodResponse::Error {
            code,
            message: Some(message.into()),
            details,
        });
    }

    pub fn not_implemented(self) {
        self.respond(MethodResponse::NotImplemented);
    }

    /// Deliver a prepared response.
    pub fn respond(self, response: MethodResponse) {
        if self.sender.send(response).is_err() {
            tracing::debug!(method = %self.method, "caller went away before the response");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_delivers_once() {
        let (result, rx) = MethodResult::channel("listFiles");
        assert_eq!(result.method(), "listFiles");
        result.success(json!([]));
        assert_eq!(rx.await.unwrap(), MethodResponse::success(json!([])));
    }

    #[tokio::test]
    async fn test_error_carries_details() {
        let (result, rx) = MethodResult::channel("copyToCache");
        result.error(ErrorCode::CopyError, "disk full", Some(json!({"written": 3})));

        match rx.await.unwrap() {
            MethodResponse::Error { code, message, details } => {
                assert_eq!(code, ErrorCode::CopyError);
                assert_eq!(message.as_deref(), Some("disk full"));
                assert_eq!(details, Some(json!({"written": 3})));
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_departed_caller_is_silent() {
        let (result, rx) = MethodResult::channel("deleteDocument");
        drop(rx);
        assert!(result.is_abandoned());
        result.success(json!(false));
    }
}
