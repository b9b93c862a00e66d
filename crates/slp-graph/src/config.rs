//! Configuration for the cache and the remote clients.
//!
//! Every struct deserializes with per-field defaults, so a partial config
//! file only needs to name what it overrides.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Transactions per depth-map bucket requested from the indexer.
pub const DEFAULT_BUCKET_SIZE: u64 = 1000;

/// Settings for the [`ExpiringTxCache`](crate::ExpiringTxCache).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached transactions.
    pub max_entries: usize,
    /// Maximum total raw bytes held.
    pub max_bytes: usize,
    /// Entries older than this many seconds read as absent.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_entries: 1000, max_bytes: 100 * 1024 * 1024, ttl_secs: 60 * 60 }
    }
}

impl CacheConfig {
    /// Entry time-to-live.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Settings for the [`GraphSearchClient`](crate::GraphSearchClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSearchConfig {
    /// Indexer base URL. `None` means graph search is unavailable.
    pub base_url: Option<String>,
    /// Depth-map bucket size, in transactions.
    pub bucket_size: u64,
    /// Timeout for the metadata (depth map) query, in seconds.
    pub metadata_timeout_secs: u64,
    /// Timeout for each bounded search query, in seconds.
    pub search_timeout_secs: u64,
}

impl Default for GraphSearchConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            bucket_size: DEFAULT_BUCKET_SIZE,
            metadata_timeout_secs: 10,
            search_timeout_secs: 60,
        }
    }
}

impl GraphSearchConfig {
    /// Metadata query timeout.
    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }

    /// Search query timeout.
    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }
}

/// Settings for the [`RestTxFetcher`](crate::RestTxFetcher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TxFetcherConfig {
    /// Base URL of the raw-transaction API.
    pub server_url: String,
    /// Optional authentication token sent via `token` header.
    pub token: Option<String>,
    /// API version prefix (e.g. `v1`).
    pub api_version: String,
    /// Per-request timeout, in seconds.
    pub timeout_secs: u64,
}

impl Default for TxFetcherConfig {
    fn default() -> Self {
        Self {
            server_url: "https://junglebus.gorillapool.io".to_string(),
            token: None,
            api_version: "v1".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Settings for the [`ProxyClient`](crate::ProxyClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Base URL of the validity oracle.
    pub base_url: Option<String>,
    /// Maximum txids sent per request.
    pub batch_size: usize,
    /// Per-request timeout, in seconds.
    pub timeout_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self { base_url: None, batch_size: 100, timeout_secs: 10 }
    }
}
