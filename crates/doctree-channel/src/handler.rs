//! The handler seam between the channel and the operations behind it.

use async_trait::async_trait;

use crate::messages::MethodCall;
use crate::result::MethodResult;

/// Receives calls from the channel's control path.
///
/// Calls are delivered one at a time. An implementation must not hold the
/// control path for slow work: it hands the work off and answers `result`
/// later, from wherever the work finishes.
#[async_trait]
pub trait MethodCallHandler: Send + Sync {
    async fn on_method_call(&self, call: MethodCall, result: MethodResult);
}
