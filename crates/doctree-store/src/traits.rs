//! DocumentProvider trait: the environment's document-management facility.
//!
//! All methods block. Callers on an async runtime must run them on a blocking
//! worker (the bridge's worker pool does this).

use std::io::Read;
use std::sync::Arc;

use doctree_core::{contract, AccessMode, DocumentId, DocumentRow, DocumentUri, TreeUri};

use crate::error::{Result, StoreError};

/// Readable byte stream of one document.
pub type InputStream = Box<dyn Read + Send>;

/// A grant the environment keeps across restarts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedPermission {
    /// The granted tree.
    pub tree: TreeUri,
    /// What the grant allows.
    pub mode: AccessMode,
    /// When the grant was persisted (Unix ms).
    pub persisted_at: i64,
}

/// Access to documents living in user-granted trees.
///
/// # Design Notes
///
/// - **Nullable metadata**: `query_children` returns rows as the backend
///   reports them; defaulting is the caller's job.
/// - **Soft delete failures**: an absent document or a missing write grant is
///   `Ok(false)`, not an error.
/// - **Durable grants**: `take_persistable_permission` must survive a restart
///   of the process that called it.
pub trait DocumentProvider: Send + Sync {
    /// Display name of a document, `None` if the backend has no row for it.
    fn display_name(&self, document: &DocumentUri) -> Result<Option<String>>;

    /// Immediate children of `parent`, reached through `tree`.
    fn query_children(&self, tree: &TreeUri, parent: &DocumentId) -> Result<Vec<DocumentRow>>;

    /// Delete one document. Returns whether it was deleted.
    fn delete_document(&self, document: &DocumentUri) -> Result<bool>;

    /// Open a document for reading.
    ///
    /// `Ok(None)` means the backend could not produce a stream without
    /// reporting why.
    fn open_input(&self, document: &DocumentUri) -> Result<Option<InputStream>>;

    /// Persist a grant on `tree` so it survives restarts.
    fn take_persistable_permission(&self, tree: &TreeUri, mode: AccessMode) -> Result<()>;

    /// Drop a persisted grant. Returns whether one existed.
    fn release_persistable_permission(&self, tree: &TreeUri) -> Result<bool>;

    /// All grants currently persisted.
    fn persisted_permissions(&self) -> Result<Vec<PersistedPermission>>;
}

impl<P: DocumentProvider + ?Sized> DocumentProvider for Arc<P> {
    fn display_name(&self, document: &DocumentUri) -> Result<Option<String>> {
        (**self).display_name(document)
    }

    fn query_children(&self, tree: &TreeUri, parent: &DocumentId) -> Result<Vec<DocumentRow>> {
        (**self).query_children(tree, parent)
    }

    fn delete_document(&self, document: &DocumentUri) -> Result<bool> {
        (**self).delete_document(document)
    }

    fn open_input(&self, document: &DocumentUri) -> Result<Option<InputStream>> {
        (**self).open_input(document)
    }

    fn take_persistable_permission(&self, tree: &TreeUri, mode: AccessMode) -> Result<()> {
        (**self).take_persistable_permission(tree, mode)
    }

    fn release_persistable_permission(&self, tree: &TreeUri) -> Result<bool> {
        (**self).release_persistable_permission(tree)
    }

    fn persisted_permissions(&self) -> Result<Vec<PersistedPermission>> {
        (**self).persisted_permissions()
    }
}

/// A document URI resolved into its tree scope and document id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedDocument {
    /// Root id of the tree the URI was issued under, if any.
    pub tree_id: Option<DocumentId>,
    /// The addressed document.
    pub document_id: DocumentId,
}

impl ScopedDocument {
    /// Parse a document URI, rejecting documents outside their issuing tree.
    pub fn resolve(document: &DocumentUri) -> Result<Self> {
        let document_id = contract::document_id(document)?;
        let tree_id = contract::document_tree_id(document)?;

        if let Some(tree_id) = &tree_id {
            if !contract::is_descendant(tree_id, &document_id) {
                return Err(StoreError::PermissionDenied(format!(
                    "{} is outside tree {}",
                    document_id, tree_id
                )));
            }
        }

        Ok(Self {
            tree_id,
            document_id,
        })
    }
}
