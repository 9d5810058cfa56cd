//! Bridge configuration.

use serde::Deserialize;

use doctree_grant::GrantConfig;

/// Default channel name.
pub const DEFAULT_CHANNEL_NAME: &str = "doctree/documents";

/// Configuration for the bridge.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Name the method channel is registered under.
    pub channel_name: String,
    /// Maximum blocking operations running at once.
    pub max_workers: usize,
    /// Calls that may queue in front of the control path.
    pub channel_capacity: usize,
    /// Write buffer used when copying a document.
    pub copy_buffer_size: usize,
    /// Grant broker configuration.
    pub grant: GrantConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            channel_name: DEFAULT_CHANNEL_NAME.to_string(),
            max_workers: 4,
            channel_capacity: 64,
            copy_buffer_size: 64 * 1024,
            grant: GrantConfig::default(),
        }
    }
}
