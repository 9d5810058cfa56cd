//! Document deletion.

use doctree_core::DocumentUri;
use doctree_store::{DocumentProvider, StoreError};

use crate::error::{BridgeError, Result};

/// Delete one document, attempting exactly once.
///
/// `Ok(false)` when the document is absent or the environment refuses the
/// delete; any other fault is a [`BridgeError::Delete`]. Blocks on the
/// provider.
pub fn delete_document<P>(provider: &P, document: &DocumentUri) -> Result<bool>
where
    P: DocumentProvider + ?Sized,
{
    match provider.delete_document(document) {
        Ok(deleted) => {
            tracing::debug!(document = %document, deleted, "delete attempted");
            Ok(deleted)
        }
        Err(StoreError::NotFound(_)) | Err(StoreError::PermissionDenied(_)) => {
            tracing::debug!(document = %document, "delete refused");
            Ok(false)
        }
        Err(e) => {
            tracing::warn!("delete of {} failed: {}", document, e);
            Err(BridgeError::Delete(e.to_string()))
        }
    }
}
