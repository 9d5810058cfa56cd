//! # doctree grant
//!
//! The authorization broker: asks the user for a subtree, exactly one request
//! at a time, and turns the answer into a durable grant.
//!
//! ## Overview
//!
//! A grant flow is interactive and can take arbitrarily long. The broker
//! starts it through a [`GrantLauncher`], parks the caller's responder in a
//! single pending slot, and completes it when the environment delivers a
//! [`GrantCompletion`] with the matching request code.
//!
//! ## Key Types
//!
//! - [`GrantBroker`] - Owns the pending slot
//! - [`GrantTicket`] - The caller's side of one flow
//! - [`GrantLauncher`] / [`ChannelLauncher`] - Starts the interactive flow
//! - [`CompletionRouter`] - Fans completion signals out to handlers
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use doctree_grant::{ChannelLauncher, GrantBroker, GrantCompletion, PICK_DIRECTORY_CODE};
//! use doctree_store::MemoryProvider;
//!
//! # async fn example() {
//! let (launcher, mut requests) = ChannelLauncher::new(4);
//! let broker = GrantBroker::new(PICK_DIRECTORY_CODE, Arc::new(MemoryProvider::new()), Arc::new(launcher));
//!
//! let ticket = broker.request_grant(None).unwrap();
//! let request = requests.recv().await.unwrap();
//! broker.on_grant_completed(&GrantCompletion::cancelled(request.request_code));
//! assert_eq!(ticket.wait().await, Ok(None));
//! # }
//! ```
//!
//! ## Design Notes
//!
//! - **One slot**: a second request while one is pending is rejected; the
//!   first is never disturbed
//! - **Exactly once**: the slot is emptied before the responder is used, so a
//!   duplicate completion finds nothing to resolve
//! - **No timeout**: a flow stays pending until the environment reports back

pub mod broker;
pub mod error;
pub mod launcher;
pub mod request;
pub mod router;

pub use broker::{GrantBroker, GrantResolution, GrantTicket};
pub use error::{GrantError, Result};
pub use launcher::{ChannelLauncher, GrantLauncher};
pub use request::{
    GrantCompletion, GrantConfig, GrantOutcome, GrantRequest, DEFAULT_DOWNLOADS_LOCATION,
    PICK_DIRECTORY_CODE, RESULT_CANCELED, RESULT_OK,
};
pub use router::{CompletionHandler, CompletionRouter};
