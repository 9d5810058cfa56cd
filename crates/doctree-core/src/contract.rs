//! The document URI contract.
//!
//! Providers address documents with `content://` URIs whose path segments
//! carry percent-encoded document ids:
//!
//! ```text
//! content://{authority}/tree/{tree_id}
//! content://{authority}/tree/{tree_id}/document/{doc_id}
//! content://{authority}/document/{doc_id}
//! ```
//!
//! Only environment implementations should call the parsing functions here;
//! everything above the provider layer treats URIs as opaque.

use crate::error::{CoreError, Result};
use crate::types::{DocumentId, DocumentUri, TreeUri};

/// URI scheme prefix.
pub const SCHEME: &str = "content://";

const TREE: &str = "tree";
const DOCUMENT: &str = "document";

/// Build the URI of a tree rooted at `tree_id`.
pub fn build_tree_uri(authority: &str, tree_id: &DocumentId) -> TreeUri {
    TreeUri::new(format!(
        "{SCHEME}{authority}/{TREE}/{}",
        urlencoding::encode(tree_id.as_str())
    ))
}

/// Build the URI of a document reached through a granted tree.
pub fn build_document_uri_using_tree(tree: &TreeUri, document_id: &DocumentId) -> Result<DocumentUri> {
    let parsed = Parsed::parse(tree.as_str())?;
    let tree_id = parsed
        .tree
        .ok_or_else(|| CoreError::MalformedUri(tree.to_string()))?;
    Ok(DocumentUri::new(format!(
        "{SCHEME}{}/{TREE}/{}/{DOCUMENT}/{}",
        parsed.authority,
        urlencoding::encode(&tree_id),
        urlencoding::encode(document_id.as_str())
    )))
}

/// Build a tree-less document URI (used for location hints).
pub fn build_document_uri(authority: &str, document_id: &DocumentId) -> DocumentUri {
    DocumentUri::new(format!(
        "{SCHEME}{authority}/{DOCUMENT}/{}",
        urlencoding::encode(document_id.as_str())
    ))
}

/// Extract the root document id of a tree URI.
pub fn tree_document_id(tree: &TreeUri) -> Result<DocumentId> {
    let parsed = Parsed::parse(tree.as_str())?;
    match (parsed.tree, parsed.document) {
        (Some(tree_id), None) => Ok(DocumentId::new(tree_id)),
        _ => Err(CoreError::MalformedUri(tree.to_string())),
    }
}

/// Extract the document id of a document URI.
pub fn document_id(document: &DocumentUri) -> Result<DocumentId> {
    Parsed::parse(document.as_str())?
        .document
        .map(DocumentId::new)
        .ok_or_else(|| CoreError::MalformedUri(document.to_string()))
}

/// Extract the tree id a document URI was reached through, if any.
pub fn document_tree_id(document: &DocumentUri) -> Result<Option<DocumentId>> {
    let parsed = Parsed::parse(document.as_str())?;
    if parsed.document.is_none() {
        return Err(CoreError::MalformedUri(document.to_string()));
    }
    Ok(parsed.tree.map(DocumentId::new))
}

/// The authority of any contract URI.
pub fn authority(uri: &str) -> Result<String> {
    Parsed::parse(uri).map(|p| p.authority)
}

/// Whether `candidate` is `ancestor` or lives below it.
///
/// Ids use `{volume}:{path}` with `/` separated path segments.
pub fn is_descendant(ancestor: &DocumentId, candidate: &DocumentId) -> bool {
    let (a, c) = (ancestor.as_str(), candidate.as_str());
    if a == c {
        return true;
    }
    match c.strip_prefix(a) {
        Some(rest) => a.ends_with(':') || a.ends_with('/') || rest.starts_with('/'),
        None => false,
    }
}

struct Parsed {
    authority: String,
    tree: Option<String>,
    document: Option<String>,
}

impl Parsed {
    fn parse(uri: &str) -> Result<Self> {
        let malformed = || CoreError::MalformedUri(uri.to_string());
        let rest = uri.strip_prefix(SCHEME).ok_or_else(malformed)?;
        let segments: Vec<&str> = rest.split('/').collect();

        let decode = |s: &str| -> Result<String> {
            if s.is_empty() {
                return Err(malformed());
            }
            urlencoding::decode(s)
                .map(|d| d.into_owned())
                .map_err(|_| malformed())
        };

        let (authority, tree, document) = match segments.as_slice() {
            [auth, TREE, tree] => (*auth, Some(decode(tree)?), None),
            [auth, TREE, tree, DOCUMENT, doc] => (*auth, Some(decode(tree)?), Some(decode(doc)?)),
            [auth, DOCUMENT, doc] => (*auth, None, Some(decode(doc)?)),
            _ => return Err(malformed()),
        };

        if authority.is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            authority: authority.to_string(),
            tree,
            document,
        })
    }
}
