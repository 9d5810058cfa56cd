//! The request dispatcher: routes named method calls onto the bridge.
//!
//! Arguments are validated on the control path, before any component is
//! touched. Blocking work is started on the bridge's pool (waiting for a free
//! worker if necessary) and answered from a detached task, so the control
//! path moves on to the next call as soon as the work has started.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::task::JoinHandle;

use doctree_channel::{methods, MethodCall, MethodCallHandler, MethodChannel, MethodResponse, MethodResult};
use doctree_core::{DocumentUri, TreeUri};
use doctree_grant::GrantCompletion;

use crate::bridge::{Bridge, Deferred};
use crate::error::{BridgeError, Result};

/// Argument names on the wire.
mod args {
    pub const START_WITH_DOWNLOADS: &str = "startWithDownloads";
    pub const TREE_URI: &str = "treeUri";
    pub const URI: &str = "uri";
    pub const DEST_PATH: &str = "destPath";
}

/// Method-call handler for the document bridge.
#[derive(Clone)]
pub struct Dispatcher {
    bridge: Arc<Bridge>,
}

impl Dispatcher {
    pub fn new(bridge: Arc<Bridge>) -> Self {
        Self { bridge }
    }

    pub fn bridge(&self) -> &Arc<Bridge> {
        &self.bridge
    }

    /// Serve this dispatcher on a new method channel named after the bridge
    /// configuration.
    pub fn serve(self) -> (MethodChannel, JoinHandle<()>) {
        let name = self.bridge.config().channel_name.clone();
        let capacity = self.bridge.config().channel_capacity;
        MethodChannel::spawn(name, capacity, Arc::new(self))
    }

    /// Handle one call and wait for its response.
    ///
    /// For `pickDirectory` this waits for the user.
    pub async fn handle(&self, call: MethodCall) -> MethodResponse {
        let method = call.method.clone();
        let (result, receiver) = MethodResult::channel(method.clone());
        self.on_method_call(call, result).await;
        receiver.await.unwrap_or_else(|_| abandoned(&method))
    }

    /// Deliver the environment's completion signal to the broker.
    pub fn on_grant_completed(&self, completion: &GrantCompletion) -> bool {
        self.bridge.on_grant_completed(completion)
    }

    fn pick_directory(&self, call: &MethodCall, result: MethodResult) {
        let ticket = match call
            .optional_bool(args::START_WITH_DOWNLOADS)
            .map_err(BridgeError::from)
            .and_then(|start| self.bridge.pick_directory(start.unwrap_or(false)))
        {
            Ok(ticket) => ticket,
            Err(e) => return result.respond(e.into()),
        };

        tokio::spawn(async move {
            let response = match ticket.wait().await {
                Ok(handle) => encode(handle, BridgeError::Grant),
                Err(e) => BridgeError::from(e).into(),
            };
            result.respond(response);
        });
    }

    async fn list_files(&self, call: &MethodCall, result: MethodResult) {
        let tree = match call.required_str(args::TREE_URI) {
            Ok(tree) => TreeUri::new(tree),
            Err(e) => return result.respond(BridgeError::from(e).into()),
        };
        let started = self.bridge.spawn_list_files(tree).await;
        respond_later(started, result, BridgeError::List);
    }

    async fn delete_document(&self, call: &MethodCall, result: MethodResult) {
        let document = match call.required_str(args::URI) {
            Ok(uri) => DocumentUri::new(uri),
            Err(e) => return result.respond(BridgeError::from(e).into()),
        };
        let started = self.bridge.spawn_delete_document(document).await;
        respond_later(started, result, BridgeError::Delete);
    }

    async fn copy_to_cache(&self, call: &MethodCall, result: MethodResult) {
        let parsed = call.required_str(args::URI).and_then(|uri| {
            let dest = call.required_str(args::DEST_PATH)?;
            Ok((DocumentUri::new(uri), PathBuf::from(dest)))
        });
        let (document, dest) = match parsed {
            Ok(parsed) => parsed,
            Err(e) => return result.respond(BridgeError::from(e).into()),
        };
        let started = self.bridge.spawn_copy_to_cache(document, dest).await;
        respond_later(started, result, BridgeError::Copy);
    }
}

#[async_trait]
impl MethodCallHandler for Dispatcher {
    async fn on_method_call(&self, call: MethodCall, result: MethodResult) {
        tracing::debug!(method = %call.method, "dispatch");
        match call.method.as_str() {
            methods::PICK_DIRECTORY => self.pick_directory(&call, result),
            methods::LIST_FILES => self.list_files(&call, result).await,
            methods::DELETE_DOCUMENT => self.delete_document(&call, result).await,
            methods::COPY_TO_CACHE => self.copy_to_cache(&call, result).await,
            _ => result.not_implemented(),
        }
    }
}

/// Response for a call whose responder was dropped before answering, reported
/// under the operation's own error code.
fn abandoned(method: &str) -> MethodResponse {
    tracing::warn!("{} was dropped without a response", method);
    let message = format!("{method} was dropped without a response");
    let err = match method {
        methods::PICK_DIRECTORY => BridgeError::Grant(message),
        methods::LIST_FILES => BridgeError::List(message),
        methods::DELETE_DOCUMENT => BridgeError::Delete(message),
        methods::COPY_TO_CACHE => BridgeError::Copy(message),
        _ => return MethodResponse::NotImplemented,
    };
    err.into()
}

/// Answer `result` once the started unit finishes.
fn respond_later<T>(
    started: Result<Deferred<T>>,
    result: MethodResult,
    encode_error: fn(String) -> BridgeError,
) where
    T: Serialize + Send + 'static,
{
    let deferred = match started {
        Ok(deferred) => deferred,
        Err(e) => return result.respond(e.into()),
    };
    tokio::spawn(async move {
        let response = match deferred.wait().await {
            Ok(value) => encode(value, encode_error),
            Err(e) => e.into(),
        };
        result.respond(response);
    });
}

fn encode<T: Serialize>(value: T, encode_error: fn(String) -> BridgeError) -> MethodResponse {
    match serde_json::to_value(value) {
        Ok(value) => MethodResponse::success(value),
        Err(e) => encode_error(e.to_string()).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use doctree_channel::ErrorCode;
    use doctree_grant::ChannelLauncher;
    use doctree_store::MemoryProvider;
    use serde_json::json;

    fn dispatcher() -> (Dispatcher, Arc<MemoryProvider>) {
        let provider = Arc::new(MemoryProvider::new());
        let (launcher, _requests) = ChannelLauncher::new(4);
        let bridge = Bridge::new(BridgeConfig::default(), provider.clone(), Arc::new(launcher));
        (Dispatcher::new(Arc::new(bridge)), provider)
    }

    #[tokio::test]
    async fn test_unknown_method_not_implemented() {
        let (dispatcher, _) = dispatcher();
        let response = dispatcher.handle(MethodCall::bare("renameDocument")).await;
        assert_eq!(response, MethodResponse::NotImplemented);
    }

    #[tokio::test]
    async fn test_missing_arguments_touch_nothing() {
        let (dispatcher, provider) = dispatcher();
        let calls = [
            MethodCall::bare(methods::LIST_FILES),
            MethodCall::new(methods::DELETE_DOCUMENT, json!({"uri": 42})),
            MethodCall::new(methods::COPY_TO_CACHE, json!({"uri": "content://a/document/b"})),
            MethodCall::new(methods::PICK_DIRECTORY, json!({"startWithDownloads": "yes"})),
        ];
        for call in calls {
            let response = dispatcher.handle(call).await;
            assert_eq!(response.error_code(), Some(ErrorCode::InvalidArg));
        }
        assert_eq!(provider.call_count(), 0);
        assert!(!dispatcher.bridge().broker().is_pending());
    }

    #[tokio::test]
    async fn test_copy_names_missing_field() {
        let (dispatcher, _) = dispatcher();
        let response = dispatcher
            .handle(MethodCall::new(methods::COPY_TO_CACHE, json!({"uri": "content://a/document/b"})))
            .await;
        match response {
            MethodResponse::Error { message, .. } => assert!(message.unwrap().contains("destPath")),
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_result_shape() {
        let (dispatcher, provider) = dispatcher();
        let root = provider.add_root("primary").unwrap();
        provider.add_file(&root, "notes.txt", b"hi".to_vec()).unwrap();
        let tree = provider.tree_uri(&root);

        let response = dispatcher
            .handle(MethodCall::new(methods::LIST_FILES, json!({"treeUri": tree.as_str()})))
            .await;
        let entries = response.into_result().unwrap();
        let entry = &entries.as_array().unwrap()[0];
        assert_eq!(entry["name"], json!("notes.txt"));
        assert_eq!(entry["sizeBytes"], json!(2));
        assert_eq!(entry["mimeType"], json!("text/plain"));
        assert!(entry["modified"].is_i64());
        assert!(entry["uri"].as_str().unwrap().starts_with(tree.as_str()));
    }

    #[test]
    fn test_dropped_responder_keeps_operation_code() {
        let cases = [
            (methods::PICK_DIRECTORY, ErrorCode::GrantError),
            (methods::LIST_FILES, ErrorCode::ListError),
            (methods::DELETE_DOCUMENT, ErrorCode::DeleteError),
            (methods::COPY_TO_CACHE, ErrorCode::CopyError),
        ];
        for (method, code) in cases {
            assert_eq!(abandoned(method).error_code(), Some(code), "{method}");
        }
        assert_eq!(abandoned("renameDocument"), MethodResponse::NotImplemented);
    }
}
