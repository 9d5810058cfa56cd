//! # doctree testkit
//!
//! Testing utilities for doctree.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: ready-made granted trees over the memory and local providers,
//!   and a bridge harness that plays the user in grant flows
//! - **Generators**: Proptest strategies for tree shapes and payloads
//! - **Digests**: blake3 digests for byte-identity checks on copied files
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use doctree_testkit::{generators::TreeShape, MemoryTreeFixture};
//!
//! proptest! {
//!     #[test]
//!     fn lists_every_file(shape: TreeShape) {
//!         let fixture = MemoryTreeFixture::new();
//!         shape.apply(&fixture);
//!         let entries = doctree::enumerator::list_files(fixture.provider.as_ref(), &fixture.tree).unwrap();
//!         prop_assert_eq!(entries.len(), shape.files.len());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use doctree_testkit::MemoryTreeFixture;
//!
//! let fixture = MemoryTreeFixture::new();
//! let id = fixture.add_file("song.mp3", b"ID3".to_vec());
//! let uri = fixture.document_uri(&id);
//! assert!(uri.as_str().starts_with(fixture.tree.as_str()));
//! ```

pub mod digest;
pub mod fixtures;
pub mod generators;

pub use digest::{content_digest, file_digest, stream_digest};
pub use fixtures::{BridgeHarness, LocalTreeFixture, MemoryTreeFixture};
pub use generators::TreeShape;
