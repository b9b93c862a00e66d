#![deny(missing_docs)]

//! # slp-graph
//!
//! The network-fetch amortization layer of the SLP validator:
//!
//! - [`ExpiringTxCache`]: bounded, expiring, process-wide store of raw
//!   ancestor transactions.
//! - [`GraphSearchClient`]: batched, depth-bounded ancestor download from a
//!   graph indexer, feeding the cache.
//! - [`TxFetcher`]: one-transaction-at-a-time fallback, with
//!   [`RestTxFetcher`] as the HTTP implementation.
//! - [`ValidityOracle`]: optional proxy opinions, with [`ProxyClient`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use slp_graph::{CacheConfig, ExpiringTxCache, GraphSearchClient, GraphSearchConfig};
//!
//! let cache = Arc::new(ExpiringTxCache::new(&CacheConfig::default()));
//! let search = GraphSearchClient::new(
//!     GraphSearchConfig {
//!         base_url: Some("https://slpdb.example.com".to_string()),
//!         ..Default::default()
//!     },
//!     cache.clone(),
//! );
//! assert!(search.is_configured());
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod graph_search;
pub mod proxy;
pub mod types;

#[cfg(test)]
mod tests;

pub use cache::ExpiringTxCache;
pub use config::{CacheConfig, GraphSearchConfig, ProxyConfig, TxFetcherConfig};
pub use error::GraphError;
pub use fetcher::{verify_raw_tx, RestTxFetcher, TxFetcher};
pub use graph_search::{
    GraphMetadata, GraphSearchClient, GraphSearchJob, GraphSearchStatus, SearchBudget,
};
pub use proxy::{ProxyClient, ValidityOracle};
