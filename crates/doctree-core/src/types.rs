//! Strong type definitions for doctree.
//!
//! Tree and document identifiers are opaque strings handed out by the
//! environment. They are newtypes so a tree URI can never be passed where a
//! document URI is expected. Nothing outside [`crate::contract`] looks inside
//! them.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! opaque_string {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw string without validating it.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the raw string.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume into the raw string.
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }
    };
}

opaque_string! {
    /// URI of a granted directory subtree.
    ///
    /// This is the durable half of a [`SubtreeHandle`]: the caller stores it
    /// and presents it back for later listings.
    TreeUri
}

opaque_string! {
    /// URI addressing one document inside a granted subtree.
    ///
    /// Only valid under the tree that produced it.
    DocumentUri
}

opaque_string! {
    /// Provider-internal document id (e.g. `primary:Download/photo.jpg`).
    DocumentId
}

/// Generic binary MIME type used when the provider reports none.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// MIME type providers report for directories.
pub const DIRECTORY_MIME_TYPE: &str = "vnd.android.document/directory";

/// Display name used when a granted tree's name cannot be resolved.
pub const UNKNOWN_TREE_NAME: &str = "Unknown";

/// A user-granted, persistent capability over a directory subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtreeHandle {
    /// The opaque tree URI.
    pub uri: TreeUri,
    /// Human-readable name of the subtree root.
    pub name: String,
}

impl SubtreeHandle {
    /// Create a handle from a tree URI and display name.
    pub fn new(uri: TreeUri, name: impl Into<String>) -> Self {
        Self {
            uri,
            name: name.into(),
        }
    }
}

/// Snapshot of one document's metadata at listing time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// Document reference, valid under the listed tree.
    pub uri: DocumentUri,
    /// Display name, empty when the provider has none.
    pub name: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Last modification time, Unix milliseconds.
    pub modified: i64,
    /// MIME type, [`OCTET_STREAM`] when unknown.
    pub mime_type: String,
}

/// One row of a child-documents query, as the provider returned it.
///
/// Every column except the id may be null.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentRow {
    pub document_id: DocumentId,
    pub display_name: Option<String>,
    pub size: Option<i64>,
    pub last_modified: Option<i64>,
    pub mime_type: Option<String>,
}

impl DocumentRow {
    /// Create a row with only the id set.
    pub fn new(document_id: DocumentId) -> Self {
        Self {
            document_id,
            ..Default::default()
        }
    }

    /// Whether the row describes a directory.
    pub fn is_directory(&self) -> bool {
        self.mime_type.as_deref() == Some(DIRECTORY_MIME_TYPE)
    }

    /// Build a [`FileEntry`] for this row, filling in defaults for null columns.
    ///
    /// Negative sizes are clamped to zero. The MIME type is passed through
    /// unvalidated.
    pub fn into_entry(self, uri: DocumentUri) -> FileEntry {
        FileEntry {
            uri,
            name: self.display_name.unwrap_or_default(),
            size_bytes: self.size.unwrap_or(0).max(0) as u64,
            modified: self.last_modified.unwrap_or(0),
            mime_type: self.mime_type.unwrap_or_else(|| OCTET_STREAM.to_string()),
        }
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self(String::new())
    }
}

/// Access requested for, or held on, a subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessMode {
    pub read: bool,
    pub write: bool,
}

impl AccessMode {
    pub const READ: Self = Self {
        read: true,
        write: false,
    };

    pub const READ_WRITE: Self = Self {
        read: true,
        write: true,
    };

    /// Whether `self` grants everything `other` asks for.
    pub fn covers(&self, other: AccessMode) -> bool {
        (self.read || !other.read) && (self.write || !other.write)
    }
}
