//! Launching the interactive grant flow.
//!
//! The broker never talks to a user. It hands a [`GrantRequest`] to a
//! [`GrantLauncher`] and waits for the environment to report back through
//! [`GrantBroker::on_grant_completed`](crate::GrantBroker::on_grant_completed).

use tokio::sync::mpsc;

use crate::error::{GrantError, Result};
use crate::request::GrantRequest;

/// Starts interactive grant flows in the environment.
pub trait GrantLauncher: Send + Sync {
    /// Whether the environment honours [`GrantRequest::initial_location`].
    fn supports_initial_location(&self) -> bool {
        true
    }

    /// Start the flow. Must not block waiting for the user.
    fn launch(&self, request: GrantRequest) -> Result<()>;
}

/// Launcher that forwards requests to a host UI over a channel.
///
/// The host shows its picker and reports the result to the broker.
pub struct ChannelLauncher {
    sender: mpsc::Sender<GrantRequest>,
    initial_location: bool,
}

impl ChannelLauncher {
    /// Create a launcher and the receiving end the host UI listens on.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<GrantRequest>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                sender,
                initial_location: true,
            },
            receiver,
        )
    }

    /// Declare that the host cannot honour starting-location hints.
    pub fn without_initial_location(mut self) -> Self {
        self.initial_location = false;
        self
    }
}

impl GrantLauncher for ChannelLauncher {
    fn supports_initial_location(&self) -> bool {
        self.initial_location
    }

    fn launch(&self, request: GrantRequest) -> Result<()> {
        self.sender.try_send(request).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => GrantError::Launch("picker queue is full".into()),
            mpsc::error::TrySendError::Closed(_) => GrantError::Launch("no picker is listening".into()),
        })
    }
}
