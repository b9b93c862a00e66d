//! Per-transaction raw fetch.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use slp_primitives::hash::sha256d;
use slp_primitives::Hash;

use crate::config::TxFetcherConfig;
use crate::error::GraphError;
use crate::types::RawTransactionRecord;

/// Source of raw transactions by txid.
///
/// Implementors provide access to a transaction source, whether a node RPC,
/// a REST API or an in-memory map. Callers check that the returned bytes hash
/// to the requested id; [`verify_raw_tx`] does that.
#[async_trait]
pub trait TxFetcher: Send + Sync {
    /// Fetch the raw serialized bytes of the transaction with the given txid.
    ///
    /// # Errors
    /// Returns [`GraphError`] if the transaction cannot be found or fetched.
    async fn fetch_raw_tx(&self, txid: &Hash) -> Result<Vec<u8>, GraphError>;
}

/// Check that `raw` is the transaction `requested`.
pub fn verify_raw_tx(requested: &Hash, raw: &[u8]) -> Result<(), GraphError> {
    let actual = Hash::new(sha256d(raw));
    if actual != *requested {
        return Err(GraphError::HashMismatch { requested: *requested, actual });
    }
    Ok(())
}

/// [`TxFetcher`] over a JungleBus-style REST API
/// (`GET <server>/<version>/transaction/get/<txid>`).
#[derive(Debug, Clone)]
pub struct RestTxFetcher {
    config: TxFetcherConfig,
    client: reqwest::Client,
}

impl RestTxFetcher {
    /// Create a fetcher with the given configuration.
    pub fn new(config: TxFetcherConfig) -> Self {
        Self { config, client: reqwest::Client::new() }
    }

    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Some(ref token) = self.config.token {
            if let Ok(val) = HeaderValue::from_str(token) {
                headers.insert("token", val);
            }
        }

        headers
    }
}

#[async_trait]
impl TxFetcher for RestTxFetcher {
    async fn fetch_raw_tx(&self, txid: &Hash) -> Result<Vec<u8>, GraphError> {
        let url = format!(
            "{}/{}/transaction/get/{}",
            self.config.server_url.trim_end_matches('/'),
            self.config.api_version,
            txid
        );

        let resp = self
            .client
            .get(&url)
            .headers(self.build_headers())
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() == 404 {
            return Err(GraphError::NotFound);
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(GraphError::ServerError { status_code: status.as_u16(), message });
        }

        let record: RawTransactionRecord = serde_json::from_str(&resp.text().await?)?;
        let raw_hex = record.transaction.ok_or(GraphError::NotFound)?;
        let raw = hex::decode(raw_hex)
            .map_err(|e| GraphError::Decode(format!("transaction hex: {e}")))?;
        verify_raw_tx(txid, &raw)?;
        Ok(raw)
    }
}
