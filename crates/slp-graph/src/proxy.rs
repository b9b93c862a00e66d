//! Validity oracle ("proxy") client.
//!
//! A proxy is a less-trusted service that answers "is this txid a valid
//! token transaction?" for a batch of ids. Its opinions speed up feedback
//! but never decide validity on their own.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use slp_primitives::Hash;
use tracing::debug;

use crate::config::ProxyConfig;
use crate::error::GraphError;
use crate::types::ProxyOpinion;

/// A source of quick validity opinions.
#[async_trait]
pub trait ValidityOracle: Send + Sync {
    /// Opinions for as many of `txids` as the oracle knows.
    async fn opinions(&self, txids: &[Hash]) -> Result<HashMap<Hash, bool>, GraphError>;
}

/// HTTP [`ValidityOracle`]: `POST <base_url>/validate` with
/// `{"txids": [...]}`, answered by `[{"txid": .., "valid": ..}, ..]`.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    config: ProxyConfig,
    client: reqwest::Client,
}

impl ProxyClient {
    /// Create a proxy client.
    pub fn new(config: ProxyConfig) -> Self {
        Self { config, client: reqwest::Client::new() }
    }

    async fn post_batch(&self, base: &str, batch: &[Hash]) -> Result<Vec<ProxyOpinion>, GraphError> {
        let body = json!({ "txids": batch.iter().map(Hash::to_hex).collect::<Vec<_>>() });
        let resp = self
            .client
            .post(format!("{}/validate", base.trim_end_matches('/')))
            .json(&body)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(GraphError::ServerError { status_code: status.as_u16(), message });
        }
        Ok(serde_json::from_str(&resp.text().await?)?)
    }
}

#[async_trait]
impl ValidityOracle for ProxyClient {
    async fn opinions(&self, txids: &[Hash]) -> Result<HashMap<Hash, bool>, GraphError> {
        let base = self
            .config
            .base_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| GraphError::BackendUnavailable("proxy host is not set".to_string()))?;

        let mut out = HashMap::new();
        for batch in txids.chunks(self.config.batch_size.max(1)) {
            for opinion in self.post_batch(base, batch).await? {
                match Hash::from_hex(&opinion.txid) {
                    Ok(txid) => {
                        out.insert(txid, opinion.valid);
                    }
                    Err(e) => debug!(txid = %opinion.txid, error = %e, "ignoring proxy opinion"),
                }
            }
        }
        Ok(out)
    }
}
