//! # doctree
//!
//! A document-tree access bridge: a client picks a directory subtree through
//! an interactive, user-mediated grant, then lists, deletes and copies the
//! documents inside it.
//!
//! ## Overview
//!
//! Four operations are exposed over a request/response [`MethodChannel`]:
//!
//! - **pickDirectory**: ask the user for a durable read/write grant on a subtree
//! - **listFiles**: the immediate files of a granted subtree, with metadata
//! - **deleteDocument**: delete one document
//! - **copyToCache**: stream one document into an ordinary local file
//!
//! Only one grant flow may be outstanding at a time. Its result arrives out of
//! band, through [`Bridge::on_grant_completed`], and is matched to the pending
//! request by its correlation code.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use doctree::{Bridge, BridgeConfig, Dispatcher};
//! use doctree::channel::methods;
//! use doctree::grant::ChannelLauncher;
//! use doctree::store::{LocalProvider, SqliteGrantRegistry};
//! use serde_json::json;
//!
//! async fn example() {
//!     let grants = SqliteGrantRegistry::open("grants.db").unwrap();
//!     let provider = LocalProvider::new(grants).with_volume("primary", "/srv/storage");
//!     let (launcher, _picker_requests) = ChannelLauncher::new(4);
//!
//!     let bridge = Arc::new(Bridge::new(BridgeConfig::default(), Arc::new(provider), Arc::new(launcher)));
//!     let (channel, _serve) = Dispatcher::new(bridge).serve();
//!
//!     let response = channel
//!         .invoke_method(methods::LIST_FILES, json!({"treeUri": "content://doctree.local/tree/primary%3ADownload"}))
//!         .await
//!         .unwrap();
//!     println!("{:?}", response);
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `doctree::core` - URI and entry types, the document URI contract
//! - `doctree::store` - Document providers and the grant registry
//! - `doctree::grant` - The authorization broker
//! - `doctree::channel` - Method channel and worker pool

pub mod bridge;
pub mod config;
pub mod copier;
pub mod dispatcher;
pub mod enumerator;
pub mod error;
pub mod mutator;

// Re-export component crates
pub use doctree_channel as channel;
pub use doctree_core as core;
pub use doctree_grant as grant;
pub use doctree_store as store;

pub use bridge::{Bridge, Deferred};
pub use config::{BridgeConfig, DEFAULT_CHANNEL_NAME};
pub use dispatcher::Dispatcher;
pub use error::{BridgeError, Result};

pub use doctree_channel::{ErrorCode, MethodCall, MethodChannel, MethodResponse};
pub use doctree_core::{DocumentUri, FileEntry, SubtreeHandle, TreeUri};
pub use doctree_grant::{GrantCompletion, GrantTicket};
