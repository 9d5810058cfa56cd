//! The grant broker: one interactive grant flow at a time.
//!
//! The broker owns the only shared mutable state of the bridge, a single slot
//! holding the pending request's responder. A request fills the slot; the
//! environment's completion signal empties it exactly once.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;

use doctree_core::{contract, AccessMode, DocumentUri, SubtreeHandle, TreeUri, UNKNOWN_TREE_NAME};
use doctree_store::DocumentProvider;

use crate::error::{GrantError, Result};
use crate::launcher::GrantLauncher;
use crate::request::{GrantCompletion, GrantOutcome, GrantRequest};

/// What a grant flow resolves to: a handle, `None` for "no selection", or an
/// error when the environment failed.
pub type GrantResolution = Result<Option<SubtreeHandle>>;

struct PendingGrant {
    generation: u64,
    responder: oneshot::Sender<GrantResolution>,
}

/// Authorization broker.
pub struct GrantBroker {
    request_code: i32,
    provider: Arc<dyn DocumentProvider>,
    launcher: Arc<dyn GrantLauncher>,
    pending: Mutex<Option<PendingGrant>>,
    generation: AtomicU64,
}

impl GrantBroker {
    /// Create a broker issuing `request_code` for every flow.
    pub fn new(
        request_code: i32,
        provider: Arc<dyn DocumentProvider>,
        launcher: Arc<dyn GrantLauncher>,
    ) -> Self {
        Self {
            request_code,
            provider,
            launcher,
            pending: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// The correlation code this broker answers to.
    pub fn request_code(&self) -> i32 {
        self.request_code
    }

    /// Whether a grant flow is waiting for the user.
    pub fn is_pending(&self) -> bool {
        self.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<PendingGrant>>> {
        self.pending
            .lock()
            .map_err(|e| GrantError::Poisoned(format!("pending grant: {}", e)))
    }

    /// Start a grant flow.
    ///
    /// Returns as soon as the environment has been asked; the outcome arrives
    /// through the returned ticket. Fails with [`GrantError::AlreadyPending`]
    /// while another flow is outstanding, leaving that flow untouched.
    pub fn request_grant(&self, start_location: Option<DocumentUri>) -> Result<GrantTicket> {
        let (responder, receiver) = oneshot::channel();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst);

        {
            let mut slot = self.lock()?;
            if slot.is_some() {
                return Err(GrantError::AlreadyPending);
            }
            *slot = Some(PendingGrant {
                generation,
                responder,
            });
        }

        let initial_location = start_location.filter(|_| self.launcher.supports_initial_location());
        let request = GrantRequest {
            request_code: self.request_code,
            access: AccessMode::READ_WRITE,
            persistable: true,
            initial_location,
        };

        if let Err(e) = self.launcher.launch(request) {
            let mut slot = self.lock()?;
            if slot.as_ref().map(|p| p.generation) == Some(generation) {
                slot.take();
            }
            tracing::warn!("grant request {} failed to launch: {}", self.request_code, e);
            return Err(e);
        }

        tracing::debug!(request_code = self.request_code, "grant flow started");
        Ok(GrantTicket {
            request_code: self.request_code,
            receiver,
        })
    }

    /// Deliver the environment's completion signal.
    ///
    /// Returns `false` when the signal carries another request code, so an
    /// outer router can offer it elsewhere. A matching signal is always
    /// consumed, even with nothing pending.
    ///
    /// Persisting the grant and resolving the display name call the provider
    /// on the caller's thread.
    pub fn on_grant_completed(&self, completion: &GrantCompletion) -> bool {
        if completion.request_code != self.request_code {
            return false;
        }

        let pending = match self.lock() {
            Ok(mut slot) => slot.take(),
            Err(e) => {
                tracing::warn!("dropping grant completion: {}", e);
                return true;
            }
        };

        let Some(pending) = pending else {
            tracing::debug!(
                request_code = completion.request_code,
                "grant completion with no pending request"
            );
            return true;
        };

        let resolution = self.resolve(completion);
        if pending.responder.send(resolution).is_err() {
            tracing::debug!("grant caller went away before completion");
        }
        true
    }

    fn resolve(&self, completion: &GrantCompletion) -> GrantResolution {
        let location = match (&completion.outcome, &completion.location) {
            (GrantOutcome::Accepted, Some(location)) => location.clone(),
            _ => return Ok(None),
        };

        self.provider
            .take_persistable_permission(&location, AccessMode::READ_WRITE)
            .map_err(|e| {
                tracing::warn!("could not persist grant on {}: {}", location, e);
                GrantError::Persist(e.to_string())
            })?;

        let name = self
            .display_name(&location)
            .unwrap_or_else(|| UNKNOWN_TREE_NAME.to_string());

        tracing::debug!(tree = %location, name = %name, "grant accepted");
        Ok(Some(SubtreeHandle::new(location, name)))
    }

    fn display_name(&self, tree: &TreeUri) -> Option<String> {
        let root = contract::tree_document_id(tree)
            .and_then(|id| contract::build_document_uri_using_tree(tree, &id))
            .ok()?;

        match self.provider.display_name(&root) {
            Ok(name) => name,
            Err(e) => {
                tracing::debug!("no display name for {}: {}", tree, e);
                None
            }
        }
    }
}

/// Pending outcome of one grant flow.
///
/// Dropping the ticket does not cancel the flow; the broker still clears its
/// slot when the completion arrives.
#[derive(Debug)]
pub struct GrantTicket {
    request_code: i32,
    receiver: oneshot::Receiver<GrantResolution>,
}

impl GrantTicket {
    /// The correlation code of this flow.
    pub fn request_code(&self) -> i32 {
        self.request_code
    }

    /// Wait for the user. There is no timeout.
    pub async fn wait(self) -> GrantResolution {
        self.receiver.await.unwrap_or(Err(GrantError::Abandoned))
    }

    /// Take the outcome if it has already arrived.
    pub fn try_resolution(&mut self) -> Option<GrantResolution> {
        match self.receiver.try_recv() {
            Ok(resolution) => Some(resolution),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(GrantError::Abandoned)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::PICK_DIRECTORY_CODE;
    use doctree_core::DocumentId;
    use doctree_store::{MemoryDocument, MemoryProvider};
    use proptest::prelude::*;

    #[derive(Default)]
    struct RecordingLauncher {
        requests: Mutex<Vec<GrantRequest>>,
        no_hints: bool,
        refuse: bool,
    }

    impl GrantLauncher for RecordingLauncher {
        fn supports_initial_location(&self) -> bool {
            !self.no_hints
        }

        fn launch(&self, request: GrantRequest) -> Result<()> {
            if self.refuse {
                return Err(GrantError::Launch("no picker".into()));
            }
            self.requests.lock().unwrap().push(request);
            Ok(())
        }
    }

    struct Setup {
        provider: Arc<MemoryProvider>,
        launcher: Arc<RecordingLauncher>,
        broker: GrantBroker,
        tree: TreeUri,
    }

    fn setup_with(launcher: RecordingLauncher) -> Setup {
        let provider = Arc::new(MemoryProvider::new());
        let root = provider.add_root("primary").unwrap();
        let dl = provider.add_directory(&root, "Download").unwrap();
        let tree = provider.tree_uri(&dl);
        let launcher = Arc::new(launcher);
        let broker = GrantBroker::new(PICK_DIRECTORY_CODE, provider.clone(), launcher.clone());
        Setup {
            provider,
            launcher,
            broker,
            tree,
        }
    }

    fn setup() -> Setup {
        setup_with(RecordingLauncher::default())
    }

    #[test]
    fn test_second_request_rejected() {
        let s = setup();
        let mut first = s.broker.request_grant(None).unwrap();

        assert_eq!(
            s.broker.request_grant(None).unwrap_err(),
            GrantError::AlreadyPending
        );
        assert!(s.broker.is_pending());
        assert!(first.try_resolution().is_none());
        assert_eq!(s.launcher.requests.lock().unwrap().len(), 1);

        let done = GrantCompletion::accepted(PICK_DIRECTORY_CODE, s.tree.clone());
        assert!(s.broker.on_grant_completed(&done));
        let handle = first.try_resolution().unwrap().unwrap().unwrap();
        assert_eq!(handle.uri, s.tree);
    }

    #[test]
    fn test_mismatched_code_is_ignored() {
        let s = setup();
        let mut ticket = s.broker.request_grant(None).unwrap();

        let foreign = GrantCompletion::accepted(PICK_DIRECTORY_CODE + 1, s.tree.clone());
        assert!(!s.broker.on_grant_completed(&foreign));
        assert!(s.broker.is_pending());
        assert!(ticket.try_resolution().is_none());
    }

    #[tokio::test]
    async fn test_accepted_resolves_handle_and_persists() {
        let s = setup();
        let ticket = s.broker.request_grant(None).unwrap();

        s.broker
            .on_grant_completed(&GrantCompletion::accepted(PICK_DIRECTORY_CODE, s.tree.clone()));

        let handle = ticket.wait().await.unwrap().unwrap();
        assert_eq!(handle.name, "Download");
        assert!(!s.broker.is_pending());

        let grants = s.provider.persisted_permissions().unwrap();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].tree, s.tree);
        assert_eq!(grants[0].mode, AccessMode::READ_WRITE);
    }

    #[tokio::test]
    async fn test_unnamed_tree_gets_placeholder() {
        let s = setup();
        let id = DocumentId::new("primary:Anon");
        s.provider
            .insert(
                id.clone(),
                MemoryDocument {
                    parent: Some(DocumentId::new("primary:")),
                    mime_type: Some(doctree_core::DIRECTORY_MIME_TYPE.into()),
                    ..Default::default()
                },
            )
            .unwrap();
        let tree = s.provider.tree_uri(&id);

        let ticket = s.broker.request_grant(None).unwrap();
        s.broker
            .on_grant_completed(&GrantCompletion::accepted(PICK_DIRECTORY_CODE, tree));

        let handle = ticket.wait().await.unwrap().unwrap();
        assert_eq!(handle.name, UNKNOWN_TREE_NAME);
    }

    #[tokio::test]
    async fn test_cancelled_resolves_none() {
        let s = setup();
        let ticket = s.broker.request_grant(None).unwrap();

        assert!(s
            .broker
            .on_grant_completed(&GrantCompletion::cancelled(PICK_DIRECTORY_CODE)));
        assert_eq!(ticket.wait().await, Ok(None));
        assert!(!s.broker.is_pending());
        assert!(s.provider.persisted_permissions().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_accepted_without_location_resolves_none() {
        let s = setup();
        let ticket = s.broker.request_grant(None).unwrap();

        let completion = GrantCompletion::from_raw(PICK_DIRECTORY_CODE, -1, None);
        assert!(s.broker.on_grant_completed(&completion));
        assert_eq!(ticket.wait().await, Ok(None));
    }

    #[tokio::test]
    async fn test_persist_failure_surfaces() {
        let s = setup();
        let ticket = s.broker.request_grant(None).unwrap();
        let missing = s.provider.tree_uri(&DocumentId::new("primary:Gone"));

        s.broker
            .on_grant_completed(&GrantCompletion::accepted(PICK_DIRECTORY_CODE, missing));
        assert!(matches!(ticket.wait().await, Err(GrantError::Persist(_))));
        assert!(!s.broker.is_pending());
    }

    #[test]
    fn test_completion_without_pending_is_consumed() {
        let s = setup();
        assert!(s
            .broker
            .on_grant_completed(&GrantCompletion::cancelled(PICK_DIRECTORY_CODE)));
    }

    #[test]
    fn test_dropped_ticket_still_clears_slot() {
        let s = setup();
        drop(s.broker.request_grant(None).unwrap());
        assert!(s.broker.is_pending());

        s.broker
            .on_grant_completed(&GrantCompletion::accepted(PICK_DIRECTORY_CODE, s.tree.clone()));
        assert!(!s.broker.is_pending());
        assert!(s.broker.request_grant(None).is_ok());
    }

    #[test]
    fn test_hint_passed_when_supported() {
        let s = setup();
        let hint = DocumentUri::new("content://doctree.memory/document/primary%3ADownload");
        s.broker.request_grant(Some(hint.clone())).unwrap();

        let requests = s.launcher.requests.lock().unwrap();
        assert_eq!(requests[0].initial_location, Some(hint));
        assert!(requests[0].persistable);
        assert_eq!(requests[0].access, AccessMode::READ_WRITE);
    }

    #[test]
    fn test_hint_dropped_when_unsupported() {
        let s = setup_with(RecordingLauncher {
            no_hints: true,
            ..Default::default()
        });
        s.broker
            .request_grant(Some(DocumentUri::new("content://x/document/y")))
            .unwrap();
        assert_eq!(s.launcher.requests.lock().unwrap()[0].initial_location, None);
    }

    #[test]
    fn test_launch_failure_clears_slot() {
        let s = setup_with(RecordingLauncher {
            refuse: true,
            ..Default::default()
        });
        assert!(matches!(
            s.broker.request_grant(None),
            Err(GrantError::Launch(_))
        ));
        assert!(!s.broker.is_pending());
    }

    #[derive(Debug, Clone)]
    enum Step {
        Request,
        Accept,
        Cancel,
        Foreign,
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            Just(Step::Request),
            Just(Step::Accept),
            Just(Step::Cancel),
            Just(Step::Foreign),
        ]
    }

    proptest! {
        #[test]
        fn pending_slot_follows_model(steps in prop::collection::vec(step(), 1..40)) {
            let s = setup();
            let mut pending = false;
            let mut tickets = Vec::new();

            for step in steps {
                match step {
                    Step::Request => {
                        let result = s.broker.request_grant(None);
                        if pending {
                            prop_assert_eq!(result.unwrap_err(), GrantError::AlreadyPending);
                        } else {
                            tickets.push(result.unwrap());
                            pending = true;
                        }
                    }
                    Step::Accept => {
                        let done = GrantCompletion::accepted(PICK_DIRECTORY_CODE, s.tree.clone());
                        prop_assert!(s.broker.on_grant_completed(&done));
                        if pending {
                            let ticket = tickets.last_mut().unwrap();
                            prop_assert!(ticket.try_resolution().unwrap().unwrap().is_some());
                        }
                        pending = false;
                    }
                    Step::Cancel => {
                        let done = GrantCompletion::cancelled(PICK_DIRECTORY_CODE);
                        prop_assert!(s.broker.on_grant_completed(&done));
                        if pending {
                            let ticket = tickets.last_mut().unwrap();
                            prop_assert_eq!(ticket.try_resolution().unwrap(), Ok(None));
                        }
                        pending = false;
                    }
                    Step::Foreign => {
                        let done = GrantCompletion::cancelled(PICK_DIRECTORY_CODE - 1);
                        prop_assert!(!s.broker.on_grant_completed(&done));
                    }
                }
                prop_assert_eq!(s.broker.is_pending(), pending);
            }

            let launched = s.launcher.requests.lock().unwrap().len();
            prop_assert_eq!(launched, tickets.len());
        }
    }
}
