//! The method channel: a named, sequential control path in front of a handler.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{ChannelError, Result};
use crate::handler::MethodCallHandler;
use crate::messages::{MethodCall, MethodResponse};
use crate::result::MethodResult;

struct Envelope {
    call: MethodCall,
    result: MethodResult,
}

/// Client side of a running channel.
///
/// Cloning is cheap; the serve loop stops once every clone is dropped.
#[derive(Clone)]
pub struct MethodChannel {
    name: Arc<str>,
    sender: mpsc::Sender<Envelope>,
}

impl MethodChannel {
    /// Start the serve loop for `handler` on the current runtime.
    ///
    /// `capacity` bounds how many calls may wait for the control path.
    pub fn spawn<H>(name: impl Into<String>, capacity: usize, handler: Arc<H>) -> (Self, JoinHandle<()>)
    where
        H: MethodCallHandler + ?Sized + 'static,
    {
        let name: Arc<str> = Arc::from(name.into());
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let task = tokio::spawn(serve(name.clone(), receiver, handler));
        (Self { name, sender }, task)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Send a call and wait for its response.
    pub async fn invoke(&self, call: MethodCall) -> Result<MethodResponse> {
        let method = call.method.clone();
        let (result, receiver) = MethodResult::channel(method.clone());

        self.sender
            .send(Envelope { call, result })
            .await
            .map_err(|_| ChannelError::Closed)?;

        receiver.await.map_err(|_| ChannelError::NoResponse(method))
    }

    /// Shorthand for [`invoke`](Self::invoke) with a method name and arguments.
    pub async fn invoke_method(&self, method: &str, arguments: Value) -> Result<MethodResponse> {
        self.invoke(MethodCall::new(method, arguments)).await
    }
}

async fn serve<H>(name: Arc<str>, mut receiver: mpsc::Receiver<Envelope>, handler: Arc<H>)
where
    H: MethodCallHandler + ?Sized,
{
    tracing::debug!(channel = %name, "serve loop started");
    while let Some(Envelope { call, result }) = receiver.recv().await {
        tracing::debug!(channel = %name, method = %call.method, "dispatching call");
        handler.on_method_call(call, result).await;
    }
    tracing::debug!(channel = %name, "serve loop stopped");
}
