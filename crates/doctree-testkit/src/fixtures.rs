//! Test fixtures and helpers.
//!
//! Common setup code for unit, integration and benchmark code.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tempfile::TempDir;
use tokio::sync::mpsc;

use doctree::{Bridge, BridgeConfig, Dispatcher};
use doctree_core::{contract, AccessMode, DocumentId, DocumentUri, TreeUri};
use doctree_grant::{ChannelLauncher, GrantCompletion, GrantRequest};
use doctree_store::{DocumentProvider, LocalProvider, MemoryProvider, SqliteGrantRegistry};

/// A memory provider with one directory to use as the tree root.
pub struct MemoryTreeFixture {
    pub provider: Arc<MemoryProvider>,
    /// Id of the tree root directory.
    pub root: DocumentId,
    pub tree: TreeUri,
}

impl MemoryTreeFixture {
    /// Create `primary:Download` as the tree root.
    pub fn new() -> Self {
        Self::with_root("primary", "Download")
    }

    /// Create a volume with one directory below it as the tree root.
    pub fn with_root(volume: &str, directory: &str) -> Self {
        let provider = Arc::new(MemoryProvider::new());
        let volume_root = provider.add_root(volume).unwrap();
        let root = provider.add_directory(&volume_root, directory).unwrap();
        let tree = provider.tree_uri(&root);
        Self {
            provider,
            root,
            tree,
        }
    }

    /// Add a file directly below the tree root.
    pub fn add_file(&self, name: &str, content: impl Into<Bytes>) -> DocumentId {
        self.add_file_in(&self.root, name, content)
    }

    /// Add a file below any directory.
    pub fn add_file_in(&self, parent: &DocumentId, name: &str, content: impl Into<Bytes>) -> DocumentId {
        self.provider.add_file(parent, name, content).unwrap()
    }

    /// Add a directory directly below the tree root.
    pub fn add_directory(&self, name: &str) -> DocumentId {
        self.provider.add_directory(&self.root, name).unwrap()
    }

    /// Document URI for `id` under this fixture's tree.
    pub fn document_uri(&self, id: &DocumentId) -> DocumentUri {
        self.provider.document_uri(&self.tree, id).unwrap()
    }

    /// The provider as a trait object.
    pub fn dyn_provider(&self) -> Arc<dyn DocumentProvider> {
        self.provider.clone()
    }
}

impl Default for MemoryTreeFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A temporary directory served as volume `primary`, with a granted
/// `Download` tree and a SQLite grant registry on disk.
pub struct LocalTreeFixture {
    pub dir: TempDir,
    pub provider: Arc<LocalProvider>,
    pub tree: TreeUri,
}

impl LocalTreeFixture {
    pub const VOLUME: &'static str = "primary";
    pub const TREE_DIR: &'static str = "Download";

    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("volume").join(Self::TREE_DIR)).unwrap();

        let provider = Arc::new(Self::open_provider(dir.path()));
        let tree = provider.tree_uri(Self::VOLUME, Self::TREE_DIR).unwrap();
        provider
            .take_persistable_permission(&tree, AccessMode::READ_WRITE)
            .unwrap();

        Self {
            dir,
            provider,
            tree,
        }
    }

    fn open_provider(base: &Path) -> LocalProvider {
        let grants = SqliteGrantRegistry::open(base.join("grants.db")).unwrap();
        LocalProvider::new(grants).with_volume(Self::VOLUME, base.join("volume"))
    }

    /// A second provider over the same volume and grant database, as a
    /// restarted process would see it.
    pub fn reopen(&self) -> LocalProvider {
        Self::open_provider(self.dir.path())
    }

    /// Filesystem path of a location relative to the tree root.
    pub fn path(&self, relative: &str) -> PathBuf {
        let mut path = self.dir.path().join("volume").join(Self::TREE_DIR);
        for segment in relative.split('/') {
            path.push(segment);
        }
        path
    }

    /// A scratch directory outside the volume, for copy destinations.
    pub fn cache_dir(&self) -> PathBuf {
        self.dir.path().join("cache")
    }

    /// Write a file below the tree root and return its document URI.
    pub fn write_file(&self, relative: &str, content: &[u8]) -> DocumentUri {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        self.document_uri(relative)
    }

    /// Document URI for a location relative to the tree root.
    pub fn document_uri(&self, relative: &str) -> DocumentUri {
        let id = DocumentId::new(format!("{}:{}/{}", Self::VOLUME, Self::TREE_DIR, relative));
        contract::build_document_uri_using_tree(&self.tree, &id).unwrap()
    }

    pub fn dyn_provider(&self) -> Arc<dyn DocumentProvider> {
        self.provider.clone()
    }
}

impl Default for LocalTreeFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A bridge and dispatcher wired to a channel launcher whose requests the
/// test plays the user for.
pub struct BridgeHarness {
    pub bridge: Arc<Bridge>,
    pub dispatcher: Dispatcher,
    pub requests: mpsc::Receiver<GrantRequest>,
}

impl BridgeHarness {
    pub fn new(provider: Arc<dyn DocumentProvider>) -> Self {
        Self::with_config(provider, BridgeConfig::default())
    }

    pub fn with_config(provider: Arc<dyn DocumentProvider>, config: BridgeConfig) -> Self {
        let (launcher, requests) = ChannelLauncher::new(8);
        let bridge = Arc::new(Bridge::new(config, provider, Arc::new(launcher)));
        let dispatcher = Dispatcher::new(bridge.clone());
        Self {
            bridge,
            dispatcher,
            requests,
        }
    }

    /// The request code grant completions must carry.
    pub fn request_code(&self) -> i32 {
        self.bridge.broker().request_code()
    }

    /// Wait until the bridge has asked for a picker.
    pub async fn next_request(&mut self) -> GrantRequest {
        self.requests.recv().await.unwrap()
    }

    /// Play the user accepting `tree`.
    pub fn accept(&self, tree: &TreeUri) -> bool {
        self.bridge
            .on_grant_completed(&GrantCompletion::accepted(self.request_code(), tree.clone()))
    }

    /// Play the user backing out.
    pub fn cancel(&self) -> bool {
        self.bridge
            .on_grant_completed(&GrantCompletion::cancelled(self.request_code()))
    }
}
