//! The Bridge: typed API over the four document operations.
//!
//! The bridge owns the grant broker and the worker pool. Blocking operations
//! run in two phases: `spawn_*` waits for a free worker and starts the unit,
//! then [`Deferred::wait`] collects its result. The dispatcher uses the split
//! to keep its control path free while work runs; direct callers use the
//! one-shot async methods.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use doctree_channel::{WorkerError, WorkerHandle, WorkerPool};
use doctree_core::{DocumentUri, FileEntry, TreeUri};
use doctree_grant::{CompletionRouter, GrantBroker, GrantCompletion, GrantLauncher, GrantTicket};
use doctree_store::DocumentProvider;

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::{copier, enumerator, mutator};

/// Which operation a unit of work belongs to; decides the error reported
/// when the unit itself fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    List,
    Delete,
    Copy,
}

impl Operation {
    fn fault(self, err: WorkerError) -> BridgeError {
        let message = err.to_string();
        match self {
            Operation::List => BridgeError::List(message),
            Operation::Delete => BridgeError::Delete(message),
            Operation::Copy => BridgeError::Copy(message),
        }
    }
}

/// A started unit of work.
#[derive(Debug)]
pub struct Deferred<T> {
    operation: Operation,
    handle: WorkerHandle<Result<T>>,
}

impl<T> Deferred<T> {
    /// Wait for the unit to finish. A panic is reported with the operation's
    /// own error code.
    pub async fn wait(self) -> Result<T> {
        let operation = self.operation;
        match self.handle.join().await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("{:?} worker failed: {}", operation, e);
                Err(operation.fault(e))
            }
        }
    }
}

/// The document bridge.
pub struct Bridge {
    config: BridgeConfig,
    provider: Arc<dyn DocumentProvider>,
    broker: Arc<GrantBroker>,
    pool: WorkerPool,
}

impl Bridge {
    /// Create a bridge over `provider`, launching grant flows with `launcher`.
    pub fn new(
        config: BridgeConfig,
        provider: Arc<dyn DocumentProvider>,
        launcher: Arc<dyn GrantLauncher>,
    ) -> Self {
        let broker = Arc::new(GrantBroker::new(
            config.grant.request_code,
            provider.clone(),
            launcher,
        ));
        let pool = WorkerPool::new(config.max_workers);
        Self {
            config,
            provider,
            broker,
            pool,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn provider(&self) -> &Arc<dyn DocumentProvider> {
        &self.provider
    }

    pub fn broker(&self) -> &Arc<GrantBroker> {
        &self.broker
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// A completion router with the broker in first position.
    pub fn completion_router(&self) -> CompletionRouter {
        CompletionRouter::new(self.broker.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Grant
    // ─────────────────────────────────────────────────────────────────────────

    /// Start a grant flow; the ticket resolves when the user is done.
    ///
    /// With `start_with_downloads`, the picker is asked to open on the
    /// configured downloads location.
    pub fn pick_directory(&self, start_with_downloads: bool) -> Result<GrantTicket> {
        let hint = start_with_downloads.then(|| self.config.grant.downloads_location.clone());
        Ok(self.broker.request_grant(hint)?)
    }

    /// Deliver the environment's completion signal. Returns whether the
    /// broker consumed it.
    pub fn on_grant_completed(&self, completion: &GrantCompletion) -> bool {
        self.broker.on_grant_completed(completion)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Blocking operations
    // ─────────────────────────────────────────────────────────────────────────

    async fn spawn<T, F>(&self, operation: Operation, job: F) -> Result<Deferred<T>>
    where
        F: FnOnce(&dyn DocumentProvider) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let provider = self.provider.clone();
        let handle = self
            .pool
            .submit(move || job(provider.as_ref()))
            .await
            .map_err(|e| operation.fault(e))?;
        Ok(Deferred { operation, handle })
    }

    /// Start listing `tree` once a worker is free.
    pub async fn spawn_list_files(&self, tree: TreeUri) -> Result<Deferred<Vec<FileEntry>>> {
        self.spawn(Operation::List, move |provider| {
            enumerator::list_files(provider, &tree)
        })
        .await
    }

    /// Start deleting `document` once a worker is free.
    pub async fn spawn_delete_document(&self, document: DocumentUri) -> Result<Deferred<bool>> {
        self.spawn(Operation::Delete, move |provider| {
            mutator::delete_document(provider, &document)
        })
        .await
    }

    /// Start copying `document` to `dest` once a worker is free.
    pub async fn spawn_copy_to_cache(
        &self,
        document: DocumentUri,
        dest: PathBuf,
    ) -> Result<Deferred<PathBuf>> {
        let buffer_size = self.config.copy_buffer_size;
        self.spawn(Operation::Copy, move |provider| {
            copier::copy_to_cache(provider, &document, &dest, buffer_size)
        })
        .await
    }

    /// List the files directly below a granted tree.
    pub async fn list_files(&self, tree: &TreeUri) -> Result<Vec<FileEntry>> {
        self.spawn_list_files(tree.clone()).await?.wait().await
    }

    /// Delete one document; `false` when absent or refused.
    pub async fn delete_document(&self, document: &DocumentUri) -> Result<bool> {
        self.spawn_delete_document(document.clone()).await?.wait().await
    }

    /// Copy one document into a local file and return its path.
    pub async fn copy_to_cache(&self, document: &DocumentUri, dest: impl AsRef<Path>) -> Result<PathBuf> {
        self.spawn_copy_to_cache(document.clone(), dest.as_ref().to_path_buf())
            .await?
            .wait()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doctree_channel::ErrorCode;
    use doctree_core::{DocumentId, DocumentRow};
    use doctree_grant::{ChannelLauncher, GrantRequest, PICK_DIRECTORY_CODE};
    use doctree_store::{InputStream, MemoryProvider, PersistedPermission};
    use tokio::sync::mpsc;

    fn bridge() -> (Bridge, Arc<MemoryProvider>, mpsc::Receiver<GrantRequest>) {
        let provider = Arc::new(MemoryProvider::new());
        let (launcher, requests) = ChannelLauncher::new(4);
        let bridge = Bridge::new(BridgeConfig::default(), provider.clone(), Arc::new(launcher));
        (bridge, provider, requests)
    }

    #[tokio::test]
    async fn test_pick_with_downloads_hint() {
        let (bridge, _, mut requests) = bridge();
        let _ticket = bridge.pick_directory(true).unwrap();

        let request = requests.recv().await.unwrap();
        assert_eq!(request.request_code, PICK_DIRECTORY_CODE);
        assert_eq!(
            request.initial_location,
            Some(bridge.config().grant.downloads_location.clone())
        );
        assert_eq!(bridge.pick_directory(false).unwrap_err(), BridgeError::AlreadyActive);
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let (bridge, provider, _requests) = bridge();
        let root = provider.add_root("primary").unwrap();
        let file = provider.add_file(&root, "a.txt", b"abc".to_vec()).unwrap();
        let tree = provider.tree_uri(&root);

        let entries = bridge.list_files(&tree).await.unwrap();
        assert_eq!(entries.len(), 1);

        assert!(bridge.delete_document(&entries[0].uri).await.unwrap());
        assert!(!provider.contains(&file));
        assert!(bridge.list_files(&tree).await.unwrap().is_empty());
    }

    struct Panicking;

    impl DocumentProvider for Panicking {
        fn display_name(&self, _: &DocumentUri) -> doctree_store::Result<Option<String>> {
            Ok(None)
        }
        fn query_children(&self, _: &TreeUri, _: &DocumentId) -> doctree_store::Result<Vec<DocumentRow>> {
            panic!("query exploded")
        }
        fn delete_document(&self, _: &DocumentUri) -> doctree_store::Result<bool> {
            panic!("delete exploded")
        }
        fn open_input(&self, _: &DocumentUri) -> doctree_store::Result<Option<InputStream>> {
            panic!("open exploded")
        }
        fn take_persistable_permission(
            &self,
            _: &TreeUri,
            _: doctree_core::AccessMode,
        ) -> doctree_store::Result<()> {
            Ok(())
        }
        fn release_persistable_permission(&self, _: &TreeUri) -> doctree_store::Result<bool> {
            Ok(false)
        }
        fn persisted_permissions(&self) -> doctree_store::Result<Vec<PersistedPermission>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_worker_panic_uses_operation_code() {
        let (launcher, _requests) = ChannelLauncher::new(1);
        let bridge = Bridge::new(BridgeConfig::default(), Arc::new(Panicking), Arc::new(launcher));
        let tree = TreeUri::new("content://x/tree/primary%3A");
        let doc = DocumentUri::new("content://x/tree/primary%3A/document/primary%3Aa");

        assert_eq!(bridge.list_files(&tree).await.unwrap_err().code(), ErrorCode::ListError);
        assert_eq!(bridge.delete_document(&doc).await.unwrap_err().code(), ErrorCode::DeleteError);
        let err = bridge.copy_to_cache(&doc, "/nonexistent/out").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::CopyError);
        assert!(err.to_string().contains("open exploded"));
        assert_eq!(bridge.pool().available(), bridge.config().max_workers);
    }
}
