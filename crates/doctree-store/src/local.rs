//! Local filesystem implementation of the DocumentProvider trait.
//!
//! Named volumes map onto directories on disk. A document id is
//! `{volume}:{relative/path}`, the volume root being `{volume}:`. Access to a
//! document requires a persisted grant on a tree containing it; grants live in
//! a [`SqliteGrantRegistry`] so they survive restarts.
//!
//! Paths are resolved through symbolic links before use and must stay below
//! the root of the granting tree; a link pointing elsewhere is treated as
//! absent from the tree.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use doctree_core::{
    contract, AccessMode, DocumentId, DocumentRow, DocumentUri, TreeUri, DIRECTORY_MIME_TYPE,
};

use crate::error::{Result, StoreError};
use crate::sqlite::SqliteGrantRegistry;
use crate::traits::{DocumentProvider, InputStream, PersistedPermission, ScopedDocument};

/// Authority used by local provider URIs.
pub const LOCAL_AUTHORITY: &str = "doctree.local";

/// Filesystem-backed provider.
pub struct LocalProvider {
    authority: String,
    volumes: BTreeMap<String, PathBuf>,
    grants: SqliteGrantRegistry,
}

impl LocalProvider {
    /// Create a provider with no volumes.
    pub fn new(grants: SqliteGrantRegistry) -> Self {
        Self {
            authority: LOCAL_AUTHORITY.to_string(),
            volumes: BTreeMap::new(),
            grants,
        }
    }

    /// Expose `root` as volume `name`.
    pub fn with_volume(mut self, name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        self.volumes.insert(name.into(), root.into());
        self
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// The grant registry backing this provider.
    pub fn grants(&self) -> &SqliteGrantRegistry {
        &self.grants
    }

    /// Tree URI for a directory inside a volume. `relative` may be empty.
    pub fn tree_uri(&self, volume: &str, relative: &str) -> Result<TreeUri> {
        let id = DocumentId::new(format!("{}:{}", volume, relative));
        self.resolve(&id)?;
        Ok(contract::build_tree_uri(&self.authority, &id))
    }

    /// Tree-less document URI, suitable as a picker starting location.
    pub fn location_uri(&self, volume: &str, relative: &str) -> Result<DocumentUri> {
        let id = DocumentId::new(format!("{}:{}", volume, relative));
        self.resolve(&id)?;
        Ok(contract::build_document_uri(&self.authority, &id))
    }

    /// Map a document id onto a path under its volume root.
    fn resolve(&self, id: &DocumentId) -> Result<PathBuf> {
        let invalid = || StoreError::Core(doctree_core::CoreError::InvalidDocumentId(id.to_string()));

        let (volume, relative) = id.as_str().split_once(':').ok_or_else(invalid)?;
        let root = self.volumes.get(volume).ok_or_else(invalid)?;

        let mut path = root.clone();
        if relative.is_empty() {
            return Ok(path);
        }
        for segment in relative.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
                return Err(invalid());
            }
            path.push(segment);
        }
        Ok(path)
    }

    /// Check that a grant of at least `mode` covers `document` and return the
    /// id of the granting tree's root.
    fn authorize(&self, scoped: &ScopedDocument, mode: AccessMode) -> Result<DocumentId> {
        let denied = || StoreError::PermissionDenied(scoped.document_id.to_string());

        match &scoped.tree_id {
            Some(tree_id) => {
                let tree = contract::build_tree_uri(&self.authority, tree_id);
                match self.grants.get(&tree)? {
                    Some(grant) if grant.mode.covers(mode) => Ok(tree_id.clone()),
                    _ => Err(denied()),
                }
            }
            None => {
                for grant in self.grants.list()? {
                    let Ok(tree_id) = contract::tree_document_id(&grant.tree) else {
                        continue;
                    };
                    if contract::authority(grant.tree.as_str()).ok().as_deref()
                        == Some(self.authority.as_str())
                        && contract::is_descendant(&tree_id, &scoped.document_id)
                        && grant.mode.covers(mode)
                    {
                        return Ok(tree_id);
                    }
                }
                Err(denied())
            }
        }
    }

    /// Resolve `id` to a real path below the root of `tree_id`.
    fn resolve_within(&self, tree_id: &DocumentId, id: &DocumentId) -> Result<PathBuf> {
        let root = self.resolve(tree_id)?;
        confine(&self.resolve(id)?, &root, id)
    }

    fn row_for(&self, id: DocumentId, name: String, path: &Path) -> io::Result<DocumentRow> {
        let metadata = fs::metadata(path)?;
        let last_modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64);

        let (size, mime_type) = if metadata.is_dir() {
            (None, DIRECTORY_MIME_TYPE.to_string())
        } else {
            (
                Some(metadata.len() as i64),
                mime_guess::from_path(&name).first_or_octet_stream().to_string(),
            )
        };

        Ok(DocumentRow {
            document_id: id,
            display_name: Some(name),
            size,
            last_modified,
            mime_type: Some(mime_type),
        })
    }
}

/// Follow every link in `path` and fail unless the target stays below `root`.
fn confine(path: &Path, root: &Path, id: &DocumentId) -> Result<PathBuf> {
    let real_root = fs::canonicalize(root)?;
    let real = fs::canonicalize(path)?;
    if real.starts_with(&real_root) {
        Ok(real)
    } else {
        tracing::warn!("{} resolves outside {}", id, root.display());
        Err(StoreError::PermissionDenied(id.to_string()))
    }
}

fn child_id(parent: &DocumentId, name: &str) -> DocumentId {
    if parent.as_str().ends_with(':') {
        DocumentId::new(format!("{}{}", parent, name))
    } else {
        DocumentId::new(format!("{}/{}", parent, name))
    }
}

impl DocumentProvider for LocalProvider {
    fn display_name(&self, document: &DocumentUri) -> Result<Option<String>> {
        let scoped = ScopedDocument::resolve(document)?;
        let tree_id = self.authorize(&scoped, AccessMode::READ)?;
        match self.resolve_within(&tree_id, &scoped.document_id) {
            Ok(_) => {}
            Err(StoreError::Io(e)) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        }

        let id = scoped.document_id.as_str();
        let name = match id.rsplit_once('/') {
            Some((_, last)) => last,
            None => match id.split_once(':') {
                Some((volume, "")) => volume,
                Some((_, relative)) => relative,
                None => id,
            },
        };
        Ok(Some(name.to_string()))
    }

    fn query_children(&self, tree: &TreeUri, parent: &DocumentId) -> Result<Vec<DocumentRow>> {
        let tree_id = contract::tree_document_id(tree)?;
        let scoped = ScopedDocument {
            tree_id: Some(tree_id.clone()),
            document_id: parent.clone(),
        };
        if !contract::is_descendant(&tree_id, parent) {
            return Err(StoreError::PermissionDenied(parent.to_string()));
        }
        self.authorize(&scoped, AccessMode::READ)?;

        let root = self.resolve(&tree_id)?;
        let dir = confine(&self.resolve(parent)?, &root, parent)?;
        let mut rows = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                tracing::warn!("skipping non UTF-8 entry in {}", dir.display());
                continue;
            };
            let id = child_id(parent, &name);
            // Removed between read_dir and stat, a dangling link, or a link
            // out of the tree.
            let path = match confine(&entry.path(), &root, &id) {
                Ok(path) => path,
                Err(e) => {
                    tracing::debug!("skipping {}: {}", entry.path().display(), e);
                    continue;
                }
            };
            match self.row_for(id, name, &path) {
                Ok(row) => rows.push(row),
                Err(e) => tracing::debug!("skipping {}: {}", entry.path().display(), e),
            }
        }

        rows.sort_by(|a, b| a.document_id.cmp(&b.document_id));
        Ok(rows)
    }

    fn delete_document(&self, document: &DocumentUri) -> Result<bool> {
        let scoped = ScopedDocument::resolve(document)?;
        let tree_id = match self.authorize(&scoped, AccessMode::READ_WRITE) {
            Err(StoreError::PermissionDenied(id)) => {
                tracing::debug!("delete refused without write grant: {}", id);
                return Ok(false);
            }
            other => other?,
        };

        let path = self.resolve(&scoped.document_id)?;
        if scoped.document_id.as_str().ends_with(':') {
            return Ok(false);
        }

        // The entry itself may be a link, which is removed in place; every
        // directory above it must stay inside the tree.
        let root = self.resolve(&tree_id)?;
        if let Some(parent) = path.parent() {
            match confine(parent, &root, &scoped.document_id) {
                Ok(_) => {}
                Err(StoreError::Io(e)) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
                Err(StoreError::PermissionDenied(_)) => return Ok(false),
                Err(e) => return Err(e),
            }
        }

        let metadata = match fs::symlink_metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        let removed = if metadata.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };

        match removed {
            Ok(()) => Ok(true),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
                ) =>
            {
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn open_input(&self, document: &DocumentUri) -> Result<Option<InputStream>> {
        let scoped = ScopedDocument::resolve(document)?;
        let tree_id = self.authorize(&scoped, AccessMode::READ)?;

        let path = self.resolve_within(&tree_id, &scoped.document_id)?;
        if fs::metadata(&path)?.is_dir() {
            return Err(StoreError::NotAFile(scoped.document_id.to_string()));
        }
        let file = File::open(&path)?;
        Ok(Some(Box::new(file)))
    }

    fn take_persistable_permission(&self, tree: &TreeUri, mode: AccessMode) -> Result<()> {
        if contract::authority(tree.as_str())? != self.authority {
            return Err(StoreError::PermissionDenied(tree.to_string()));
        }
        let tree_id = contract::tree_document_id(tree)?;
        let volume = DocumentId::new(match tree_id.as_str().split_once(':') {
            Some((volume, _)) => format!("{}:", volume),
            None => tree_id.to_string(),
        });
        let path = match self.resolve_within(&volume, &tree_id) {
            Ok(path) => path,
            Err(StoreError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(tree_id.to_string()))
            }
            Err(e) => return Err(e),
        };
        if !path.is_dir() {
            return Err(StoreError::NotFound(tree_id.to_string()));
        }
        self.grants.persist(tree, mode)
    }

    fn release_persistable_permission(&self, tree: &TreeUri) -> Result<bool> {
        self.grants.release(tree)
    }

    fn persisted_permissions(&self) -> Result<Vec<PersistedPermission>> {
        self.grants.list()
    }
}
