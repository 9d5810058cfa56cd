//! # doctree channel
//!
//! The request/response channel between a client and the document bridge.
//!
//! ## Overview
//!
//! A client invokes named methods with a JSON argument map and receives
//! exactly one [`MethodResponse`] per call. The channel runs a single control
//! path that hands each call to a [`MethodCallHandler`] in arrival order.
//! Handlers push blocking work onto a bounded [`WorkerPool`] and answer
//! through the call's [`MethodResult`] once the work finishes.
//!
//! ## Key Types
//!
//! - [`MethodChannel`] - Serve loop plus client handle
//! - [`MethodCall`] / [`MethodResponse`] / [`ErrorCode`] - Wire types
//! - [`MethodResult`] - Exactly-once responder
//! - [`WorkerPool`] - Bounded blocking workers with backpressure
//!
//! ## Design Notes
//!
//! - **Backpressure**: submitting to a full pool waits on the control path
//! - **No cancellation**: a caller that stops waiting does not stop the work;
//!   the late response is discarded

pub mod channel;
pub mod error;
pub mod handler;
pub mod messages;
pub mod result;
pub mod worker;

pub use channel::MethodChannel;
pub use error::{ChannelError, Result, WorkerError};
pub use handler::MethodCallHandler;
pub use messages::{methods, ErrorCode, MethodCall, MethodResponse};
pub use result::MethodResult;
pub use worker::{WorkerHandle, WorkerPool};
