//! Validation engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-job budgets and fetch-path switches.
///
/// Deserializes with per-field defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Maximum transactions a single job may download.
    pub download_limit: usize,
    /// Maximum ancestor depth a single job may walk.
    pub depth_limit: u32,
    /// Ask the proxy oracle for opinions alongside fetching.
    pub proxy_enabled: bool,
    /// Bulk-download ancestors through the graph indexer before falling
    /// back to per-transaction fetch.
    pub graph_search_enabled: bool,
    /// How long a finishing job waits for outstanding proxy opinions, in
    /// seconds.
    pub proxy_timeout_secs: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            download_limit: 500,
            depth_limit: 1000,
            proxy_enabled: false,
            graph_search_enabled: false,
            proxy_timeout_secs: 5,
        }
    }
}

impl ValidationConfig {
    /// Proxy wait timeout.
    pub fn proxy_timeout(&self) -> Duration {
        Duration::from_secs(self.proxy_timeout_secs)
    }
}
