//! # doctree core
//!
//! Pure value types for the document-tree access layer: tree and document
//! URIs, subtree handles, file entries and the rows providers return.
//!
//! This crate does no I/O.
//!
//! ## Key Types
//!
//! - [`TreeUri`] - Opaque URI of a granted directory subtree
//! - [`DocumentUri`] - Opaque URI of one document inside a tree
//! - [`SubtreeHandle`] - Tree URI plus display name, returned by a grant
//! - [`FileEntry`] - Metadata snapshot of a listed document
//! - [`DocumentRow`] - Raw child-query row with nullable columns
//!
//! ## URI contract
//!
//! Providers build and parse URIs through the [`contract`] module. Callers
//! above the provider layer never parse them.

pub mod contract;
pub mod error;
pub mod types;

pub use error::{CoreError, Result};
pub use types::{
    AccessMode, DocumentId, DocumentRow, DocumentUri, FileEntry, SubtreeHandle, TreeUri,
    DIRECTORY_MIME_TYPE, OCTET_STREAM, UNKNOWN_TREE_NAME,
};
