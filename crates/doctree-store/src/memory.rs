//! In-memory implementation of the DocumentProvider trait.
//!
//! This is primarily for testing. Documents live in a map keyed by document
//! id; faults can be injected per operation to exercise error paths.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::Bytes;

use doctree_core::{
    contract, AccessMode, DocumentId, DocumentRow, DocumentUri, TreeUri, DIRECTORY_MIME_TYPE,
};

use crate::error::{Result, StoreError};
use crate::traits::{DocumentProvider, InputStream, PersistedPermission, ScopedDocument};

/// Authority used by memory provider URIs.
pub const MEMORY_AUTHORITY: &str = "doctree.memory";

/// A stored document. Metadata columns mirror what a real backend may leave null.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    pub parent: Option<DocumentId>,
    pub display_name: Option<String>,
    pub mime_type: Option<String>,
    pub last_modified: Option<i64>,
    /// Reported size; defaults to the content length.
    pub size: Option<i64>,
    pub content: Bytes,
}

#[derive(Default)]
struct Faults {
    query: Option<String>,
    delete: Option<String>,
    unopenable: BTreeSet<DocumentId>,
    /// Documents whose stream fails after this many bytes.
    broken_streams: BTreeMap<DocumentId, usize>,
    revoked_trees: BTreeSet<DocumentId>,
}

#[derive(Default)]
struct MemoryProviderInner {
    documents: BTreeMap<DocumentId, MemoryDocument>,
    permissions: BTreeMap<TreeUri, PersistedPermission>,
    faults: Faults,
}

/// In-memory provider.
///
/// Thread-safe via RwLock. Every trait call bumps [`call_count`](Self::call_count).
pub struct MemoryProvider {
    authority: String,
    inner: RwLock<MemoryProviderInner>,
    calls: AtomicUsize,
}

impl MemoryProvider {
    /// Create an empty provider using [`MEMORY_AUTHORITY`].
    pub fn new() -> Self {
        Self::with_authority(MEMORY_AUTHORITY)
    }

    /// Create an empty provider with a custom authority.
    pub fn with_authority(authority: impl Into<String>) -> Self {
        Self {
            authority: authority.into(),
            inner: RwLock::new(MemoryProviderInner::default()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryProviderInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Poisoned(format!("memory provider: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryProviderInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Poisoned(format!("memory provider: {}", e)))
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of trait calls served so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Seeding
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a document under an explicit id.
    pub fn insert(&self, id: DocumentId, document: MemoryDocument) -> Result<()> {
        self.write()?.documents.insert(id, document);
        Ok(())
    }

    /// Add a volume root such as `primary:`.
    pub fn add_root(&self, volume: &str) -> Result<DocumentId> {
        let id = DocumentId::new(format!("{}:", volume));
        self.insert(
            id.clone(),
            MemoryDocument {
                display_name: Some(volume.to_string()),
                mime_type: Some(DIRECTORY_MIME_TYPE.to_string()),
                ..Default::default()
            },
        )?;
        Ok(id)
    }

    /// Add a directory below `parent`.
    pub fn add_directory(&self, parent: &DocumentId, name: &str) -> Result<DocumentId> {
        let id = child_id(parent, name);
        self.insert(
            id.clone(),
            MemoryDocument {
                parent: Some(parent.clone()),
                display_name: Some(name.to_string()),
                mime_type: Some(DIRECTORY_MIME_TYPE.to_string()),
                last_modified: Some(crate::now_millis()),
                ..Default::default()
            },
        )?;
        Ok(id)
    }

    /// Add a file below `parent`, guessing its MIME type from the name.
    pub fn add_file(
        &self,
        parent: &DocumentId,
        name: &str,
        content: impl Into<Bytes>,
    ) -> Result<DocumentId> {
        let id = child_id(parent, name);
        let mime = mime_guess::from_path(name).first_raw().map(str::to_string);
        self.insert(
            id.clone(),
            MemoryDocument {
                parent: Some(parent.clone()),
                display_name: Some(name.to_string()),
                mime_type: mime,
                last_modified: Some(crate::now_millis()),
                size: None,
                content: content.into(),
            },
        )?;
        Ok(id)
    }

    /// Tree URI for a document id.
    pub fn tree_uri(&self, id: &DocumentId) -> TreeUri {
        contract::build_tree_uri(&self.authority, id)
    }

    /// Document URI for `id` reached through `tree`.
    pub fn document_uri(&self, tree: &TreeUri, id: &DocumentId) -> Result<DocumentUri> {
        Ok(contract::build_document_uri_using_tree(tree, id)?)
    }

    /// Raw content of a stored document.
    pub fn contents(&self, id: &DocumentId) -> Option<Bytes> {
        self.read().ok()?.documents.get(id).map(|d| d.content.clone())
    }

    /// Whether a document with this id exists.
    pub fn contains(&self, id: &DocumentId) -> bool {
        self.read()
            .map(|inner| inner.documents.contains_key(id))
            .unwrap_or(false)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Fault injection
    // ─────────────────────────────────────────────────────────────────────────

    /// Make every child query fail with `message`.
    pub fn fail_queries(&self, message: impl Into<String>) -> Result<()> {
        self.write()?.faults.query = Some(message.into());
        Ok(())
    }

    /// Make every delete fail with `message`.
    pub fn fail_deletes(&self, message: impl Into<String>) -> Result<()> {
        self.write()?.faults.delete = Some(message.into());
        Ok(())
    }

    /// Make `open_input` return no stream for a document.
    pub fn make_unopenable(&self, id: &DocumentId) -> Result<()> {
        self.write()?.faults.unopenable.insert(id.clone());
        Ok(())
    }

    /// Make a document's stream fail after `after` bytes.
    pub fn break_stream(&self, id: &DocumentId, after: usize) -> Result<()> {
        self.write()?.faults.broken_streams.insert(id.clone(), after);
        Ok(())
    }

    /// Revoke all access through the tree rooted at `tree_id`.
    pub fn revoke_tree(&self, tree_id: &DocumentId) -> Result<()> {
        self.write()?.faults.revoked_trees.insert(tree_id.clone());
        Ok(())
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn child_id(parent: &DocumentId, name: &str) -> DocumentId {
    let parent = parent.as_str();
    if parent.ends_with(':') {
        DocumentId::new(format!("{}{}", parent, name))
    } else {
        DocumentId::new(format!("{}/{}", parent, name))
    }
}

impl MemoryProviderInner {
    fn check_tree(&self, tree_id: Option<&DocumentId>) -> Result<()> {
        match tree_id {
            Some(id) if self.faults.revoked_trees.contains(id) => Err(
                StoreError::PermissionDenied(format!("access to {} was revoked", id)),
            ),
            _ => Ok(()),
        }
    }

    fn remove_recursive(&mut self, id: &DocumentId) {
        let children: Vec<DocumentId> = self
            .documents
            .iter()
            .filter(|(_, d)| d.parent.as_ref() == Some(id))
            .map(|(child, _)| child.clone())
            .collect();
        for child in children {
            self.remove_recursive(&child);
        }
        self.documents.remove(id);
    }
}

impl DocumentProvider for MemoryProvider {
    fn display_name(&self, document: &DocumentUri) -> Result<Option<String>> {
        self.touch();
        let scoped = ScopedDocument::resolve(document)?;
        let inner = self.read()?;
        inner.check_tree(scoped.tree_id.as_ref())?;
        Ok(inner
            .documents
            .get(&scoped.document_id)
            .and_then(|d| d.display_name.clone()))
    }

    fn query_children(&self, tree: &TreeUri, parent: &DocumentId) -> Result<Vec<DocumentRow>> {
        self.touch();
        let tree_id = contract::tree_document_id(tree)?;
        let inner = self.read()?;

        if let Some(message) = &inner.faults.query {
            return Err(StoreError::Provider(message.clone()));
        }
        inner.check_tree(Some(&tree_id))?;
        if !inner.documents.contains_key(parent) {
            return Err(StoreError::NotFound(parent.to_string()));
        }

        Ok(inner
            .documents
            .iter()
            .filter(|(_, d)| d.parent.as_ref() == Some(parent))
            .map(|(id, d)| DocumentRow {
                document_id: id.clone(),
                display_name: d.display_name.clone(),
                size: d.size.or_else(|| {
                    (d.mime_type.as_deref() != Some(DIRECTORY_MIME_TYPE))
                        .then(|| d.content.len() as i64)
                }),
                last_modified: d.last_modified,
                mime_type: d.mime_type.clone(),
            })
            .collect())
    }

    fn delete_document(&self, document: &DocumentUri) -> Result<bool> {
        self.touch();
        let scoped = ScopedDocument::resolve(document)?;
        let mut inner = self.write()?;

        if let Some(message) = &inner.faults.delete {
            return Err(StoreError::Provider(message.clone()));
        }
        if inner.check_tree(scoped.tree_id.as_ref()).is_err() {
            return Ok(false);
        }
        if !inner.documents.contains_key(&scoped.document_id) {
            return Ok(false);
        }

        inner.remove_recursive(&scoped.document_id);
        Ok(true)
    }

    fn open_input(&self, document: &DocumentUri) -> Result<Option<InputStream>> {
        self.touch();
        let scoped = ScopedDocument::resolve(document)?;
        let inner = self.read()?;
        inner.check_tree(scoped.tree_id.as_ref())?;

        if inner.faults.unopenable.contains(&scoped.document_id) {
            return Ok(None);
        }

        let doc = inner
            .documents
            .get(&scoped.document_id)
            .ok_or_else(|| StoreError::NotFound(scoped.document_id.to_string()))?;
        if doc.mime_type.as_deref() == Some(DIRECTORY_MIME_TYPE) {
            return Err(StoreError::NotAFile(scoped.document_id.to_string()));
        }

        let cursor = Cursor::new(doc.content.clone());
        let stream: InputStream = match inner.faults.broken_streams.get(&scoped.document_id) {
            Some(&after) => Box::new(BrokenStream {
                inner: cursor,
                remaining: after,
            }),
            None => Box::new(cursor),
        };
        Ok(Some(stream))
    }

    fn take_persistable_permission(&self, tree: &TreeUri, mode: AccessMode) -> Result<()> {
        self.touch();
        let tree_id = contract::tree_document_id(tree)?;
        let mut inner = self.write()?;
        if !inner.documents.contains_key(&tree_id) {
            return Err(StoreError::NotFound(tree_id.to_string()));
        }

        let now = crate::now_millis();
        inner
            .permissions
            .entry(tree.clone())
            .and_modify(|p| {
                p.mode.read |= mode.read;
                p.mode.write |= mode.write;
            })
            .or_insert_with(|| PersistedPermission {
                tree: tree.clone(),
                mode,
                persisted_at: now,
            });
        Ok(())
    }

    fn release_persistable_permission(&self, tree: &TreeUri) -> Result<bool> {
        self.touch();
        Ok(self.write()?.permissions.remove(tree).is_some())
    }

    fn persisted_permissions(&self) -> Result<Vec<PersistedPermission>> {
        self.touch();
        Ok(self.read()?.permissions.values().cloned().collect())
    }
}

/// Stream that errors once `remaining` bytes have been read.
struct BrokenStream {
    inner: Cursor<Bytes>,
    remaining: usize,
}

impl Read for BrokenStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "document stream interrupted",
            ));
        }
        let limit = buf.len().min(self.remaining);
        let n = self.inner.read(&mut buf[..limit])?;
        self.remaining -= n;
        Ok(n)
    }
}
