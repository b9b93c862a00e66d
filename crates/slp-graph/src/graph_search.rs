//! Batched ancestor download through an SLPDB-style graph indexer.
//!
//! Fetching a deep ancestry one transaction at a time is far too slow, so a
//! search runs in two phases:
//!
//! 1. A metadata query asks the indexer for each root's total ancestor depth
//!    and a depth map: for every bucket of `bucket_size` ancestors, the depth
//!    at which that bucket fills.
//! 2. Successive bounded-depth search queries walk the buckets, each one
//!    excluding the ids already downloaded, until the full depth is reached
//!    or the caller's depth/download budget runs out.
//!
//! Queries are JSON documents, base64-encoded (URL-safe alphabet) into the
//! path: `<base_url>/q/<base64>`. Every downloaded transaction goes into the
//! shared [`ExpiringTxCache`]; the search itself keeps nothing but counters.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use slp_primitives::hash::sha256d;
use slp_primitives::Hash;
use tracing::{debug, info, warn};

use crate::cache::ExpiringTxCache;
use crate::config::GraphSearchConfig;
use crate::error::GraphError;
use crate::types::{DepthBucket, GraphResponse, MetadataRecord, SearchRecord};

/// Indexer metadata for one root transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphMetadata {
    /// Cumulative ancestor count -> `(depth, count)` bucket.
    pub depth_map: BTreeMap<u64, DepthBucket>,
    /// Depth of the deepest ancestor.
    pub total_depth: u32,
    /// Total number of ancestors.
    pub total_count: u64,
}

impl GraphMetadata {
    /// Depths to search to, in order, never exceeding `depth_limit`.
    ///
    /// One entry per bucket below the limit, then the final depth. An empty
    /// depth map yields a single query to the full (capped) depth.
    pub fn depth_targets(&self, depth_limit: u32) -> Vec<u32> {
        let max_depth = self.total_depth.min(depth_limit);
        let mut targets: Vec<u32> = self
            .depth_map
            .values()
            .map(|b| b.depth())
            .filter(|d| *d > 0 && *d < max_depth)
            .collect();
        targets.sort_unstable();
        targets.dedup();
        targets.push(max_depth);
        targets
    }
}

/// Lifecycle of a [`GraphSearchJob`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphSearchStatus {
    /// Not run yet.
    Pending,
    /// All requested depth was downloaded.
    Complete,
    /// Stopped early because the download budget ran out.
    BudgetExhausted,
    /// A query failed.
    Failed(String),
}

/// Progress record of one ancestor search.
///
/// Results are side effects in the shared cache; this record only carries
/// what a caller needs for budgeting and diagnostics.
#[derive(Debug, Clone)]
pub struct GraphSearchJob {
    /// Transactions whose ancestors are searched.
    pub root_txids: Vec<Hash>,
    /// Metadata per root, filled by the first phase.
    pub metadata: HashMap<Hash, GraphMetadata>,
    /// Number of distinct transactions downloaded.
    pub downloaded: usize,
    /// Number of search queries issued (metadata query excluded).
    pub queries: usize,
    /// Deepest depth searched so far.
    pub searched_depth: u32,
    /// The most recent query URL.
    pub last_url: Option<String>,
    /// Current status.
    pub status: GraphSearchStatus,
}

impl GraphSearchJob {
    /// A pending search rooted at `root_txids`.
    pub fn new(root_txids: Vec<Hash>) -> Self {
        Self {
            root_txids,
            metadata: HashMap::new(),
            downloaded: 0,
            queries: 0,
            searched_depth: 0,
            last_url: None,
            status: GraphSearchStatus::Pending,
        }
    }
}

/// Budget a search must stay within.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchBudget {
    /// Maximum ancestor depth to search.
    pub depth_limit: u32,
    /// Maximum number of transactions to download.
    pub download_limit: usize,
}

/// HTTP client for the graph indexer.
#[derive(Debug, Clone)]
pub struct GraphSearchClient {
    config: GraphSearchConfig,
    client: reqwest::Client,
    cache: Arc<ExpiringTxCache>,
}

impl GraphSearchClient {
    /// Create a client that stores downloads into `cache`.
    pub fn new(config: GraphSearchConfig, cache: Arc<ExpiringTxCache>) -> Self {
        Self { config, client: reqwest::Client::new(), cache }
    }

    /// True when an indexer URL is configured.
    pub fn is_configured(&self) -> bool {
        self.config.base_url.as_deref().is_some_and(|u| !u.is_empty())
    }

    fn base_url(&self) -> Result<&str, GraphError> {
        match self.config.base_url.as_deref() {
            Some(url) if !url.is_empty() => Ok(url.trim_end_matches('/')),
            _ => Err(GraphError::BackendUnavailable("graph search host is not set".to_string())),
        }
    }

    fn query_url(&self, query: &Value) -> Result<String, GraphError> {
        let encoded = URL_SAFE.encode(serde_json::to_vec(query)?);
        Ok(format!("{}/q/{}", self.base_url()?, encoded))
    }

    /// URL of the metadata query for `txids`.
    pub fn metadata_url(&self, txids: &[Hash]) -> Result<String, GraphError> {
        if txids.is_empty() {
            return Err(GraphError::NoTxids);
        }
        let bucket = self.config.bucket_size.to_string();
        let depth_map_path = format!("$graphTxn.stats.depthMap.{bucket}");
        let query = json!({
            "v": 3,
            "q": {
                "db": ["g"],
                "aggregate": [
                    { "$match": { "$or": match_txids(txids) } },
                    { "$project": {
                        "_id": 0,
                        "txid": "$graphTxn.txid",
                        "depthMap": { bucket: depth_map_path },
                        "totalDepth": "$graphTxn.stats.depth",
                        "txcount": "$graphTxn.stats.txcount",
                    }}
                ],
                "limit": txids.len(),
            }
        });
        self.query_url(&query)
    }

    /// URL of a search to `max_depth` below `txids`, skipping any
    /// ancestor only reachable through an id in `exclude`.
    pub fn search_url(
        &self,
        txids: &[Hash],
        max_depth: u32,
        exclude: &[Hash],
    ) -> Result<String, GraphError> {
        if txids.is_empty() {
            return Err(GraphError::NoTxids);
        }
        let exclude: Vec<String> = exclude.iter().map(Hash::to_hex).collect();
        let query = json!({
            "v": 3,
            "q": {
                "db": ["g"],
                "aggregate": [
                    { "$match": { "$or": match_txids(txids) } },
                    { "$graphLookup": {
                        "from": "graphs",
                        "startWith": "$graphTxn.txid",
                        "connectFromField": "graphTxn.txid",
                        "connectToField": "graphTxn.outputs.spendTxid",
                        "as": "dependsOn",
                        "maxDepth": max_depth,
                        "depthField": "depth",
                        "restrictSearchWithMatch": {
                            "graphTxn.txid": { "$nin": exclude }
                        }
                    }},
                    { "$project": {
                        "_id": 0,
                        "tokenId": "$tokenDetails.tokenIdHex",
                        "txid": "$graphTxn.txid",
                        "dependsOn": "$dependsOn.graphTxn.txid",
                        "depths": "$dependsOn.depth",
                    }},
                    { "$unwind": { "path": "$dependsOn", "includeArrayIndex": "depends_index" } },
                    { "$unwind": { "path": "$depths", "includeArrayIndex": "depth_index" } },
                    { "$project": {
                        "tokenId": 1, "txid": 1, "dependsOn": 1, "depths": 1,
                        "compare": { "$cmp": ["$depends_index", "$depth_index"] },
                    }},
                    { "$match": { "compare": 0 } },
                    { "$lookup": {
                        "from": "confirmed",
                        "localField": "dependsOn",
                        "foreignField": "tx.h",
                        "as": "tx",
                    }},
                    { "$unwind": "$tx" },
                    { "$group": {
                        "_id": "$txid",
                        "tokenId": { "$first": "$tokenId" },
                        "dependsOn": { "$push": "$tx.tx.raw" },
                        "depths": { "$push": "$depths" },
                    }},
                    { "$project": {
                        "_id": 0, "txid": "$_id", "tokenId": 1, "dependsOn": 1, "depths": 1,
                    }}
                ],
                "limit": 1_000_000,
            }
        });
        self.query_url(&query)
    }

    /// Ask the indexer for each root's depth map and totals.
    ///
    /// Roots the indexer does not know are absent from the result.
    pub async fn metadata_query(
        &self,
        txids: &[Hash],
    ) -> Result<HashMap<Hash, GraphMetadata>, GraphError> {
        let url = self.metadata_url(txids)?;
        debug!(url = %url, "graph search metadata query");
        let resp: GraphResponse<MetadataRecord> =
            self.do_request(&url, self.config.metadata_timeout()).await?;

        let mut out = HashMap::with_capacity(resp.g.len());
        for record in resp.g {
            let txid = Hash::from_hex(&record.txid)
                .map_err(|e| GraphError::Decode(format!("metadata txid: {e}")))?;
            let mut depth_map = BTreeMap::new();
            for (key, bucket) in record.depth_map {
                let key = key
                    .parse::<u64>()
                    .map_err(|e| GraphError::Decode(format!("depth map key {key}: {e}")))?;
                depth_map.insert(key, bucket);
            }
            out.insert(
                txid,
                GraphMetadata {
                    depth_map,
                    total_depth: record.total_depth,
                    total_count: record.total_count,
                },
            );
        }
        Ok(out)
    }

    /// Download the ancestors of `txids` down to `max_depth`.
    ///
    /// Every returned transaction is inserted into the cache.
    ///
    /// # Returns
    /// `(depth, txid)` pairs sorted by depth, shallowest first.
    pub async fn search_query(
        &self,
        txids: &[Hash],
        max_depth: u32,
        exclude: &[Hash],
    ) -> Result<Vec<(u32, Hash)>, GraphError> {
        let url = self.search_url(txids, max_depth, exclude)?;
        debug!(url = %url, max_depth, "graph search query");
        let resp: GraphResponse<SearchRecord> =
            self.do_request(&url, self.config.search_timeout()).await?;

        let mut found = Vec::new();
        for record in resp.g {
            if record.depends_on.len() != record.depths.len() {
                warn!(
                    txid = %record.txid,
                    raw = record.depends_on.len(),
                    depths = record.depths.len(),
                    "graph search record with mismatched depth list"
                );
            }
            for (raw_b64, depth) in record.depends_on.iter().zip(record.depths.iter()) {
                let raw = STANDARD
                    .decode(raw_b64)
                    .map_err(|e| GraphError::Decode(format!("dependsOn entry: {e}")))?;
                let txid = Hash::new(sha256d(&raw));
                self.cache.put_with_txid(txid, &raw);
                found.push((*depth, txid));
            }
        }
        found.sort();
        Ok(found)
    }

    /// Run a search job to completion or budget exhaustion.
    ///
    /// Ids in `known` (already in the graph or cache) are excluded from
    /// every query and are not counted as downloads.
    ///
    /// # Returns
    /// The ids downloaded by this run. The job's status records how it ended;
    /// on error the status is [`GraphSearchStatus::Failed`] and the error is
    /// also returned.
    pub async fn run(
        &self,
        job: &mut GraphSearchJob,
        budget: SearchBudget,
        known: &HashSet<Hash>,
    ) -> Result<Vec<Hash>, GraphError> {
        match self.run_inner(job, budget, known).await {
            Ok(ids) => Ok(ids),
            Err(e) => {
                warn!(error = %e, last_url = ?job.last_url, "graph search failed");
                job.status = GraphSearchStatus::Failed(e.to_string());
                Err(e)
            }
        }
    }

    async fn run_inner(
        &self,
        job: &mut GraphSearchJob,
        budget: SearchBudget,
        known: &HashSet<Hash>,
    ) -> Result<Vec<Hash>, GraphError> {
        job.last_url = Some(self.metadata_url(&job.root_txids)?);
        job.metadata = self.metadata_query(&job.root_txids).await?;

        let mut exclude: HashSet<Hash> = known.clone();
        let mut downloaded = Vec::new();

        for root in job.root_txids.clone() {
            let Some(meta) = job.metadata.get(&root).cloned() else {
                debug!(txid = %root, "indexer has no graph for root");
                continue;
            };
            if meta.total_depth == 0 {
                continue;
            }
            for target in meta.depth_targets(budget.depth_limit) {
                if job.downloaded >= budget.download_limit {
                    info!(
                        downloaded = job.downloaded,
                        limit = budget.download_limit,
                        "graph search download budget exhausted"
                    );
                    job.status = GraphSearchStatus::BudgetExhausted;
                    return Ok(downloaded);
                }

                let excluded: Vec<Hash> = exclude.iter().copied().collect();
                job.last_url = Some(self.search_url(&[root], target, &excluded)?);
                let found = self.search_query(&[root], target, &excluded).await?;
                job.queries += 1;
                job.searched_depth = job.searched_depth.max(target);

                for (_, txid) in found {
                    if exclude.insert(txid) {
                        job.downloaded += 1;
                        downloaded.push(txid);
                    }
                }
            }
        }

        info!(
            roots = job.root_txids.len(),
            downloaded = job.downloaded,
            queries = job.queries,
            "graph search complete"
        );
        job.status = GraphSearchStatus::Complete;
        Ok(downloaded)
    }

    async fn do_request<T: DeserializeOwned>(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<T, GraphError> {
        let resp = self.client.get(url).timeout(timeout).send().await?;
        let status = resp.status();

        if status.as_u16() == 404 {
            return Err(GraphError::NotFound);
        }

        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(GraphError::ServerError { status_code: status.as_u16(), message });
        }

        let text = resp.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

fn match_txids(txids: &[Hash]) -> Vec<Value> {
    txids.iter().map(|t| json!({ "graphTxn.txid": t.to_hex() })).collect()
}
