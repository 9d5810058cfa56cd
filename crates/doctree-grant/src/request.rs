//! Grant requests, completions and broker configuration.

use serde::Deserialize;

use doctree_core::{AccessMode, DocumentUri, TreeUri};

/// Default correlation code for directory grant requests.
pub const PICK_DIRECTORY_CODE: i32 = 9001;

/// Outcome code the environment reports when the user accepted.
pub const RESULT_OK: i32 = -1;

/// Outcome code the environment reports when the user backed out.
pub const RESULT_CANCELED: i32 = 0;

/// Well-known downloads folder, offered as a starting location on request.
pub const DEFAULT_DOWNLOADS_LOCATION: &str =
    "content://com.android.externalstorage.documents/document/primary%3ADownload";

/// An interactive grant request handed to the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantRequest {
    /// Correlation code the completion must carry.
    pub request_code: i32,
    /// Access asked for on the chosen subtree.
    pub access: AccessMode,
    /// Whether the grant should outlive the process.
    pub persistable: bool,
    /// Where the picker should start, if the environment supports hints.
    pub initial_location: Option<DocumentUri>,
}

/// How the user left the interactive flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    Accepted,
    Cancelled,
    /// Any other environment-specific result code.
    Other(i32),
}

impl GrantOutcome {
    /// Interpret an environment result code.
    pub fn from_result_code(code: i32) -> Self {
        match code {
            RESULT_OK => GrantOutcome::Accepted,
            RESULT_CANCELED => GrantOutcome::Cancelled,
            other => GrantOutcome::Other(other),
        }
    }

    /// The environment result code for this outcome.
    pub fn result_code(&self) -> i32 {
        match self {
            GrantOutcome::Accepted => RESULT_OK,
            GrantOutcome::Cancelled => RESULT_CANCELED,
            GrantOutcome::Other(code) => *code,
        }
    }
}

/// Completion signal delivered by the environment, out of band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantCompletion {
    pub request_code: i32,
    pub outcome: GrantOutcome,
    /// The chosen subtree, if any.
    pub location: Option<TreeUri>,
}

impl GrantCompletion {
    /// The user accepted and picked `location`.
    pub fn accepted(request_code: i32, location: TreeUri) -> Self {
        Self {
            request_code,
            outcome: GrantOutcome::Accepted,
            location: Some(location),
        }
    }

    /// The user backed out.
    pub fn cancelled(request_code: i32) -> Self {
        Self {
            request_code,
            outcome: GrantOutcome::Cancelled,
            location: None,
        }
    }

    /// Build from raw environment values.
    pub fn from_raw(request_code: i32, result_code: i32, location: Option<TreeUri>) -> Self {
        Self {
            request_code,
            outcome: GrantOutcome::from_result_code(result_code),
            location,
        }
    }
}

/// Configuration for the grant broker.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GrantConfig {
    /// Correlation code used for every grant request.
    pub request_code: i32,
    /// Starting location offered when the caller asks for downloads.
    pub downloads_location: DocumentUri,
}

impl Default for GrantConfig {
    fn default() -> Self {
        Self {
            request_code: PICK_DIRECTORY_CODE,
            downloads_location: DocumentUri::new(DEFAULT_DOWNLOADS_LOCATION),
        }
    }
}
