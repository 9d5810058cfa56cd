//! Routing out-of-band completion signals.
//!
//! The environment reports every finished interactive flow through one
//! callback. The router offers each signal to the broker first and then to any
//! other registered handler, stopping at the first that consumes it.

use std::sync::Arc;

use crate::broker::GrantBroker;
use crate::request::GrantCompletion;

/// Something that may consume a completion signal.
pub trait CompletionHandler: Send + Sync {
    /// Returns `true` if the signal was meant for this handler.
    fn on_completion(&self, completion: &GrantCompletion) -> bool;
}

impl CompletionHandler for GrantBroker {
    fn on_completion(&self, completion: &GrantCompletion) -> bool {
        self.on_grant_completed(completion)
    }
}

/// Dispatches completions between the broker and unrelated handlers.
pub struct CompletionRouter {
    broker: Arc<GrantBroker>,
    fallbacks: Vec<Arc<dyn CompletionHandler>>,
}

impl CompletionRouter {
    pub fn new(broker: Arc<GrantBroker>) -> Self {
        Self {
            broker,
            fallbacks: Vec::new(),
        }
    }

    /// Register a handler for signals the broker does not claim.
    pub fn with_handler(mut self, handler: Arc<dyn CompletionHandler>) -> Self {
        self.fallbacks.push(handler);
        self
    }

    /// Deliver a signal. Returns whether anyone consumed it.
    pub fn route(&self, completion: &GrantCompletion) -> bool {
        if self.broker.on_grant_completed(completion) {
            return true;
        }
        let consumed = self.fallbacks.iter().any(|h| h.on_completion(completion));
        if !consumed {
            tracing::debug!(
                request_code = completion.request_code,
                "completion not claimed by any handler"
            );
        }
        consumed
    }
}
