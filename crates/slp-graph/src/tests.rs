//! Tests for the indexer, fetch and proxy clients.

use std::collections::HashSet;
use std::sync::Arc;

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use serde_json::Value;
use slp_primitives::Hash;
use slp_script::Script;
use slp_transaction::{OutPoint, Transaction, TransactionInput, TransactionOutput};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

use crate::{
    CacheConfig, ExpiringTxCache, GraphError, GraphSearchClient, GraphSearchConfig,
    GraphSearchJob, GraphSearchStatus, ProxyClient, ProxyConfig, RestTxFetcher, SearchBudget,
    TxFetcher, TxFetcherConfig, ValidityOracle,
};

/// Matches `/q/<base64 json>` requests by whether the decoded query is a
/// graph lookup (search) or not (metadata).
struct IndexerQuery {
    search: bool,
}

impl Match for IndexerQuery {
    fn matches(&self, request: &Request) -> bool {
        let Some(encoded) = request.url.path().strip_prefix("/q/") else {
            return false;
        };
        let Ok(bytes) = URL_SAFE.decode(encoded) else {
            return false;
        };
        let Ok(query) = serde_json::from_slice::<Value>(&bytes) else {
            return false;
        };
        let is_search = query["q"]["aggregate"]
            .as_array()
            .is_some_and(|stages| stages.iter().any(|s| s.get("$graphLookup").is_some()));
        is_search == self.search
    }
}

fn tx_spending(prev: Hash, sats: u64) -> Transaction {
    let mut tx = Transaction::new();
    tx.add_input(TransactionInput::new(OutPoint::new(prev, 0)));
    tx.add_output(TransactionOutput::new(sats, Script::new_p2pkh(&[4; 20])));
    tx
}

fn new_cache() -> Arc<ExpiringTxCache> {
    Arc::new(ExpiringTxCache::new(&CacheConfig::default()))
}

fn search_client(server: &MockServer, cache: Arc<ExpiringTxCache>) -> GraphSearchClient {
    GraphSearchClient::new(
        GraphSearchConfig { base_url: Some(server.uri()), ..Default::default() },
        cache,
    )
}

#[tokio::test]
async fn test_search_job_fills_cache() {
    let server = MockServer::start().await;
    let grandparent = tx_spending(Hash::new([1; 32]), 2000);
    let parent = tx_spending(grandparent.tx_id(), 1500);
    let root = tx_spending(parent.tx_id(), 1000);
    let root_id = root.tx_id();

    Mock::given(method("GET"))
        .and(IndexerQuery { search: false })
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "g": [{ "txid": root_id.to_hex(), "depthMap": {}, "totalDepth": 2, "txcount": 2 }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(IndexerQuery { search: true })
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "g": [{
                "txid": root_id.to_hex(),
                "dependsOn": [
                    STANDARD.encode(grandparent.to_bytes()),
                    STANDARD.encode(parent.to_bytes()),
                ],
                "depths": [2, 1]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let cache = new_cache();
    let client = search_client(&server, cache.clone());
    let mut job = GraphSearchJob::new(vec![root_id]);
    let budget = SearchBudget { depth_limit: 100, download_limit: 100 };
    let ids = client.run(&mut job, budget, &HashSet::new()).await.unwrap();

    assert_eq!(job.status, GraphSearchStatus::Complete);
    assert_eq!(job.queries, 1);
    assert_eq!(job.downloaded, 2);
    assert_eq!(job.searched_depth, 2);
    assert!(job.last_url.as_deref().unwrap().contains("/q/"));
    assert_eq!(ids.len(), 2);
    assert_eq!(cache.get_tx(&parent.tx_id()).unwrap(), parent);
    assert_eq!(cache.get_tx(&grandparent.tx_id()).unwrap(), grandparent);
}

#[tokio::test]
async fn test_search_walks_buckets_until_budget() {
    let server = MockServer::start().await;
    let a = tx_spending(Hash::new([2; 32]), 10);
    let root_id = Hash::new([3; 32]);

    Mock::given(method("GET"))
        .and(IndexerQuery { search: false })
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "g": [{
                "txid": root_id.to_hex(),
                "depthMap": { "1000": [5, 1000], "2000": [9, 2000] },
                "totalDepth": 20,
                "txcount": 2400
            }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(IndexerQuery { search: true })
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "g": [{ "txid": root_id.to_hex(), "dependsOn": [STANDARD.encode(a.to_bytes())], "depths": [1] }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = search_client(&server, new_cache());
    let mut job = GraphSearchJob::new(vec![root_id]);
    let budget = SearchBudget { depth_limit: 100, download_limit: 1 };
    client.run(&mut job, budget, &HashSet::new()).await.unwrap();

    assert_eq!(job.status, GraphSearchStatus::BudgetExhausted);
    assert_eq!(job.searched_depth, 5);
    assert_eq!(job.downloaded, 1);
}

#[tokio::test]
async fn test_search_server_error_fails_job() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("indexer down"))
        .mount(&server)
        .await;

    let client = search_client(&server, new_cache());
    let mut job = GraphSearchJob::new(vec![Hash::new([5; 32])]);
    let budget = SearchBudget { depth_limit: 10, download_limit: 10 };
    let err = client.run(&mut job, budget, &HashSet::new()).await.unwrap_err();

    assert!(matches!(err, GraphError::ServerError { status_code: 503, .. }));
    assert!(matches!(job.status, GraphSearchStatus::Failed(_)));
}

#[tokio::test]
async fn test_unconfigured_search_fails_fast() {
    let client = GraphSearchClient::new(GraphSearchConfig::default(), new_cache());
    let mut job = GraphSearchJob::new(vec![Hash::new([5; 32])]);
    let budget = SearchBudget { depth_limit: 10, download_limit: 10 };
    let err = client.run(&mut job, budget, &HashSet::new()).await.unwrap_err();
    assert!(matches!(err, GraphError::BackendUnavailable(_)));
}

#[tokio::test]
async fn test_rest_fetcher_verifies_hash() {
    let server = MockServer::start().await;
    let tx = tx_spending(Hash::new([6; 32]), 500);
    let other = tx_spending(Hash::new([7; 32]), 500);

    Mock::given(method("GET"))
        .and(path(format!("/v1/transaction/get/{}", tx.tx_id())))
        .and(header("token", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": tx.tx_id().to_hex(),
            "transaction": tx.to_hex(),
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/v1/transaction/get/{}", other.tx_id())))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": other.tx_id().to_hex(),
            "transaction": tx.to_hex(),
        })))
        .mount(&server)
        .await;

    let fetcher = RestTxFetcher::new(TxFetcherConfig {
        server_url: server.uri(),
        token: Some("secret".to_string()),
        ..Default::default()
    });

    let raw = fetcher.fetch_raw_tx(&tx.tx_id()).await.unwrap();
    assert_eq!(raw, tx.to_bytes());

    let err = fetcher.fetch_raw_tx(&other.tx_id()).await.unwrap_err();
    assert!(matches!(err, GraphError::HashMismatch { .. }));
}

#[tokio::test]
async fn test_rest_fetcher_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = RestTxFetcher::new(TxFetcherConfig { server_url: server.uri(), ..Default::default() });
    let err = fetcher.fetch_raw_tx(&Hash::new([8; 32])).await.unwrap_err();
    assert!(matches!(err, GraphError::NotFound));
}

#[tokio::test]
async fn test_proxy_opinions() {
    let server = MockServer::start().await;
    let good = Hash::new([0x11; 32]);
    let bad = Hash::new([0x22; 32]);

    Mock::given(method("POST"))
        .and(path("/validate"))
        .and(body_json(serde_json::json!({ "txids": [good.to_hex(), bad.to_hex()] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "txid": good.to_hex(), "valid": true },
            { "txid": bad.to_hex(), "valid": false },
            { "txid": "not-a-txid", "valid": true }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let proxy = ProxyClient::new(ProxyConfig { base_url: Some(server.uri()), ..Default::default() });
    let opinions = proxy.opinions(&[good, bad]).await.unwrap();
    assert_eq!(opinions.len(), 2);
    assert_eq!(opinions.get(&good), Some(&true));
    assert_eq!(opinions.get(&bad), Some(&false));
}

#[tokio::test]
async fn test_proxy_unconfigured() {
    let proxy = ProxyClient::new(ProxyConfig::default());
    let err = proxy.opinions(&[Hash::new([1; 32])]).await.unwrap_err();
    assert!(matches!(err, GraphError::BackendUnavailable(_)));
}
