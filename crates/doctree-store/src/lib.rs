//! # doctree store
//!
//! The environment side of the document-tree access layer: everything that
//! actually touches documents and grants.
//!
//! ## Overview
//!
//! Document access is abstracted behind the [`DocumentProvider`] trait so the
//! bridge is backend-agnostic. [`LocalProvider`] serves documents from named
//! filesystem volumes and keeps grants in a [`SqliteGrantRegistry`];
//! [`MemoryProvider`] is an in-memory backend with fault injection for tests.
//!
//! ## Key Types
//!
//! - [`DocumentProvider`] - Blocking trait over the document facility
//! - [`LocalProvider`] - Filesystem volumes with durable grants
//! - [`MemoryProvider`] - In-memory documents for tests
//! - [`SqliteGrantRegistry`] - Persisted tree grants
//! - [`PersistedPermission`] - One durable grant
//!
//! ## Usage
//!
//! ```rust,no_run
//! use doctree_core::AccessMode;
//! use doctree_store::{DocumentProvider, LocalProvider, SqliteGrantRegistry};
//!
//! let grants = SqliteGrantRegistry::open("grants.db").unwrap();
//! let provider = LocalProvider::new(grants).with_volume("primary", "/srv/storage");
//!
//! let tree = provider.tree_uri("primary", "Download").unwrap();
//! provider.take_persistable_permission(&tree, AccessMode::READ_WRITE).unwrap();
//! ```
//!
//! ## Design Notes
//!
//! - **Blocking calls**: providers block on I/O; async callers run them on a
//!   worker thread
//! - **Scoped URIs**: a document URI issued under one tree is rejected if its
//!   id lies outside that tree

pub mod error;
pub mod local;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use local::{LocalProvider, LOCAL_AUTHORITY};
pub use memory::{MemoryDocument, MemoryProvider, MEMORY_AUTHORITY};
pub use sqlite::SqliteGrantRegistry;
pub use traits::{DocumentProvider, InputStream, PersistedPermission, ScopedDocument};

/// Current time in Unix milliseconds.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
