//! Indexer and API response models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Envelope of every indexer query response: `{"g": [...]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphResponse<T> {
    /// Records from the graph collection.
    #[serde(default = "Vec::new")]
    pub g: Vec<T>,
}

/// One `(depth, count)` entry of an indexer depth map.
///
/// Serialized as a two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthBucket(pub u32, pub u64);

impl DepthBucket {
    /// Ancestor depth reached when this bucket fills.
    pub fn depth(&self) -> u32 {
        self.0
    }

    /// Cumulative ancestor count at that depth.
    pub fn count(&self) -> u64 {
        self.1
    }
}

/// Metadata record for one root txid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Root txid (display hex).
    pub txid: String,
    /// Cumulative-count bucket key -> `(depth, count)`.
    #[serde(rename = "depthMap", default)]
    pub depth_map: BTreeMap<String, DepthBucket>,
    /// Depth of the deepest ancestor.
    #[serde(rename = "totalDepth", default)]
    pub total_depth: u32,
    /// Total number of ancestors.
    #[serde(rename = "txcount", default)]
    pub total_count: u64,
}

/// Search record for one root txid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRecord {
    /// Root txid (display hex).
    pub txid: String,
    /// Token id the indexer associates with the root, if any.
    #[serde(rename = "tokenId", default)]
    pub token_id: Option<String>,
    /// Base64-encoded raw ancestor transactions.
    #[serde(rename = "dependsOn", default)]
    pub depends_on: Vec<String>,
    /// Depth of each entry in `depends_on`, index-aligned.
    #[serde(default)]
    pub depths: Vec<u32>,
}

/// A raw transaction record returned by the REST fetch API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTransactionRecord {
    /// Transaction ID.
    #[serde(default)]
    pub id: String,
    /// Raw transaction data (hex-encoded).
    #[serde(default)]
    pub transaction: Option<String>,
}

/// One validity opinion returned by a proxy oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyOpinion {
    /// Transaction id (display hex).
    pub txid: String,
    /// The oracle's opinion of the transaction's token validity.
    pub valid: bool,
}
