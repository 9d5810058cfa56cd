//! Tree enumeration: the immediate file children of a granted subtree.

use doctree_core::{contract, FileEntry, TreeUri};
use doctree_store::DocumentProvider;

use crate::error::{BridgeError, Result};

/// List the files directly below the root of `tree`.
///
/// Directories are skipped and nothing is recursed into. Missing metadata is
/// defaulted (see [`DocumentRow::into_entry`](doctree_core::DocumentRow::into_entry)).
/// Blocks on the provider.
pub fn list_files<P>(provider: &P, tree: &TreeUri) -> Result<Vec<FileEntry>>
where
    P: DocumentProvider + ?Sized,
{
    let root = contract::tree_document_id(tree).map_err(list_error)?;
    let rows = provider.query_children(tree, &root).map_err(list_error)?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        if row.is_directory() {
            continue;
        }
        let uri = contract::build_document_uri_using_tree(tree, &row.document_id)
            .map_err(list_error)?;
        entries.push(row.into_entry(uri));
    }

    tracing::debug!(tree = %tree, files = entries.len(), "listed tree");
    Ok(entries)
}

fn list_error(err: impl std::fmt::Display) -> BridgeError {
    BridgeError::List(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use doctree_core::{DocumentId, OCTET_STREAM};
    use doctree_store::{MemoryDocument, MemoryProvider};

    fn provider() -> (MemoryProvider, TreeUri, DocumentId) {
        let provider = MemoryProvider::new();
        let root = provider.add_root("primary").unwrap();
        let dir = provider.add_directory(&root, "Download").unwrap();
        let tree = provider.tree_uri(&dir);
        (provider, tree, dir)
    }

    #[test]
    fn test_files_only() {
        let (provider, tree, dir) = provider();
        provider.add_file(&dir, "a.txt", b"hello".to_vec()).unwrap();
        provider.add_file(&dir, "b.pdf", vec![0u8; 10]).unwrap();
        let sub = provider.add_directory(&dir, "nested").unwrap();
        provider.add_file(&sub, "deep.txt", b"x".to_vec()).unwrap();

        let mut entries = list_files(&provider, &tree).unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a.txt");
        assert_eq!(entries[0].size_bytes, 5);
        assert_eq!(entries[0].mime_type, "text/plain");
        assert_eq!(entries[1].mime_type, "application/pdf");
        assert!(entries[0].uri.as_str().starts_with(tree.as_str()));
    }

    #[test]
    fn test_null_columns_defaulted() {
        let (provider, tree, dir) = provider();
        provider
            .insert(
                DocumentId::new("primary:Download/blob"),
                MemoryDocument {
                    parent: Some(dir),
                    size: Some(-3),
                    ..Default::default()
                },
            )
            .unwrap();

        let entries = list_files(&provider, &tree).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "");
        assert_eq!(entries[0].size_bytes, 0);
        assert_eq!(entries[0].modified, 0);
        assert_eq!(entries[0].mime_type, OCTET_STREAM);
    }

    #[test]
    fn test_empty_tree() {
        let (provider, tree, _) = provider();
        assert!(list_files(&provider, &tree).unwrap().is_empty());
    }

    #[test]
    fn test_query_failure_is_list_error() {
        let (provider, tree, _) = provider();
        provider.fail_queries("cursor exploded").unwrap();

        let err = list_files(&provider, &tree).unwrap_err();
        assert_eq!(err.code(), doctree_channel::ErrorCode::ListError);
        assert!(err.to_string().contains("cursor exploded"));
    }

    #[test]
    fn test_malformed_tree_is_list_error() {
        let (provider, _, _) = provider();
        let calls = provider.call_count();
        let err = list_files(&provider, &TreeUri::new("not a tree")).unwrap_err();
        assert!(matches!(err, BridgeError::List(_)));
        assert_eq!(provider.call_count(), calls);
    }
}
