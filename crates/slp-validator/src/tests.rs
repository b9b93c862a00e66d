//! Engine tests: jobs, managers and nested NFT1 parent validation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use serde_json::Value;
use slp_graph::{
    CacheConfig, ExpiringTxCache, GraphError, GraphSearchClient, GraphSearchConfig, TxFetcher,
    ValidityOracle,
};
use slp_primitives::Hash;
use slp_script::{
    build_genesis_script, build_send_script, GenesisFields, Script, TokenId, TokenType,
};
use slp_transaction::{OutPoint, Transaction, TransactionInput, TransactionOutput};
use tokio::sync::Notify;
use wiremock::matchers::method;
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

use crate::{
    GraphContext, JobOptions, JobOutcome, JobStatus, PauseReason, ValidationConfig,
    ValidationError, Validity,
};

// ---------------------------------------------------------------------------
// fixtures
// ---------------------------------------------------------------------------

fn p2pkh() -> Script {
    Script::new_p2pkh(&[0xab; 20])
}

fn genesis_tx(token_type: TokenType, quantity: u64, spends: OutPoint) -> Transaction {
    let fields = GenesisFields {
        ticker: b"TST".to_vec(),
        name: b"Test Token".to_vec(),
        document_url: Vec::new(),
        document_hash: None,
        decimals: 0,
        mint_baton_vout: None,
        initial_quantity: quantity,
    };
    let mut tx = Transaction::new();
    tx.add_input(TransactionInput::new(spends));
    tx.add_output(TransactionOutput::new(0, build_genesis_script(token_type, fields).unwrap()));
    tx.add_output(TransactionOutput::new(546, p2pkh()));
    tx
}

fn send_tx(token_type: TokenType, token: TokenId, spends: &[OutPoint], amounts: &[u64]) -> Transaction {
    let mut tx = Transaction::new();
    for op in spends {
        tx.add_input(TransactionInput::new(*op));
    }
    tx.add_output(TransactionOutput::new(0, build_send_script(token_type, token, amounts).unwrap()));
    for _ in amounts {
        tx.add_output(TransactionOutput::new(546, p2pkh()));
    }
    tx
}

fn funding(n: u8) -> OutPoint {
    OutPoint::new(Hash::new([n; 32]), 0)
}

/// GENESIS(1000) -> SEND1 [600, 400] -> SEND2 [600].
struct Chain {
    token: TokenId,
    genesis: Transaction,
    send1: Transaction,
    send2: Transaction,
}

impl Chain {
    fn new() -> Self {
        let genesis = genesis_tx(TokenType::Fungible, 1000, funding(1));
        let token = TokenId::new(genesis.tx_id());
        let send1 = send_tx(TokenType::Fungible, token, &[OutPoint::new(genesis.tx_id(), 1)], &[600, 400]);
        let send2 = send_tx(TokenType::Fungible, token, &[OutPoint::new(send1.tx_id(), 1)], &[600]);
        Chain { token, genesis, send1, send2 }
    }

    fn ancestors(&self) -> Vec<Transaction> {
        vec![self.genesis.clone(), self.send1.clone()]
    }
}

/// Serves transactions from memory, counting calls. The first call can be
/// held until the test releases it.
#[derive(Default)]
struct MockFetcher {
    txs: HashMap<Hash, Vec<u8>>,
    calls: AtomicUsize,
    order: Mutex<Vec<Hash>>,
    gate: Option<Gate>,
}

#[derive(Default)]
struct Gate {
    used: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl MockFetcher {
    fn with(txs: impl IntoIterator<Item = Transaction>) -> Self {
        MockFetcher {
            txs: txs.into_iter().map(|tx| (tx.tx_id(), tx.to_bytes())).collect(),
            ..Default::default()
        }
    }

    fn gated(mut self) -> Self {
        self.gate = Some(Gate::default());
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn order(&self) -> Vec<Hash> {
        self.order.lock().unwrap().clone()
    }
}

#[async_trait]
impl TxFetcher for MockFetcher {
    async fn fetch_raw_tx(&self, txid: &Hash) -> Result<Vec<u8>, GraphError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.order.lock().unwrap().push(*txid);
        if let Some(gate) = &self.gate {
            if !gate.used.swap(true, Ordering::SeqCst) {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
        }
        self.txs.get(txid).cloned().ok_or(GraphError::NotFound)
    }
}

struct StaticOracle(HashMap<Hash, bool>);

#[async_trait]
impl ValidityOracle for StaticOracle {
    async fn opinions(&self, txids: &[Hash]) -> Result<HashMap<Hash, bool>, GraphError> {
        Ok(txids.iter().filter_map(|t| self.0.get(t).map(|v| (*t, *v))).collect())
    }
}

fn new_cache() -> Arc<ExpiringTxCache> {
    Arc::new(ExpiringTxCache::new(&CacheConfig::default()))
}

fn context_with(config: ValidationConfig, fetcher: Arc<MockFetcher>) -> GraphContext {
    GraphContext::builder(config, new_cache()).fetcher(fetcher).build()
}

async fn validate(context: &GraphContext, tx: &Transaction) -> crate::JobResult {
    context
        .make_job(tx, JobOptions::default())
        .unwrap()
        .expect("token transaction")
        .wait()
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// fungible chains
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_send_chain_valid_via_fetcher() {
    let chain = Chain::new();
    let fetcher = Arc::new(MockFetcher::with(chain.ancestors()));
    let context = context_with(ValidationConfig::default(), fetcher.clone());

    let result = validate(&context, &chain.send2).await;

    assert_eq!(result.outcome, JobOutcome::Complete);
    assert!(result.is_valid());
    assert_eq!(result.validity(&chain.send1.tx_id()), Validity::Valid);
    assert_eq!(result.validity(&chain.genesis.tx_id()), Validity::Valid);
    assert_eq!(result.downloads, 2);
    assert_eq!(fetcher.calls(), 2);
    assert!(context.cache().contains(&chain.genesis.tx_id()));
    assert_eq!(context.graphs(), vec![chain.token]);
}

#[tokio::test]
async fn test_revalidation_is_free() {
    let chain = Chain::new();
    let fetcher = Arc::new(MockFetcher::with(chain.ancestors()));
    let context = context_with(ValidationConfig::default(), fetcher.clone());

    validate(&context, &chain.send2).await;
    let again = validate(&context, &chain.send2).await;

    assert!(again.is_valid());
    assert_eq!(again.downloads, 0);
    assert_eq!(again.nodes.len(), 1);
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_overspend_is_insufficient_inputs() {
    let chain = Chain::new();
    let greedy = send_tx(
        TokenType::Fungible,
        chain.token,
        &[OutPoint::new(chain.genesis.tx_id(), 1)],
        &[1500],
    );
    let fetcher = Arc::new(MockFetcher::with(chain.ancestors()));
    let context = context_with(ValidationConfig::default(), fetcher);

    let result = validate(&context, &greedy).await;

    assert_eq!(result.outcome, JobOutcome::Complete);
    assert_eq!(result.validity(&greedy.tx_id()), Validity::InsufficientInputs);
}

#[tokio::test]
async fn test_zero_amount_input_does_not_count() {
    let genesis = genesis_tx(TokenType::Fungible, 10, funding(2));
    let token = TokenId::new(genesis.tx_id());
    let split = send_tx(TokenType::Fungible, token, &[OutPoint::new(genesis.tx_id(), 1)], &[10, 0]);
    let spend_zero = send_tx(TokenType::Fungible, token, &[OutPoint::new(split.tx_id(), 2)], &[1]);

    let split_id = split.tx_id();
    let fetcher = Arc::new(MockFetcher::with([genesis, split]));
    let context = context_with(ValidationConfig::default(), fetcher.clone());
    let result = validate(&context, &spend_zero).await;

    assert_eq!(result.validity(&spend_zero.tx_id()), Validity::InsufficientInputs);
    // decided once the split was known; the genesis behind it is never needed
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(result.validity(&split_id), Validity::Unknown);
}

#[tokio::test]
async fn test_hook_supplies_ancestors() {
    let chain = Chain::new();
    let known = chain.ancestors();
    let asked = Arc::new(Mutex::new(Vec::new()));
    let asked_in_hook = asked.clone();
    let hook: crate::FetchHook = Arc::new(move |ids: &[Hash]| {
        asked_in_hook.lock().unwrap().extend_from_slice(ids);
        known.iter().filter(|tx| ids.contains(&tx.tx_id())).cloned().collect()
    });

    let fetcher = Arc::new(MockFetcher::default());
    let context = context_with(ValidationConfig::default(), fetcher.clone());
    let result = context
        .make_job(&chain.send2, JobOptions::default().with_hook(hook))
        .unwrap()
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert!(result.is_valid());
    assert_eq!(result.downloads, 0);
    assert_eq!(fetcher.calls(), 0);
    assert!(asked.lock().unwrap().contains(&chain.send1.tx_id()));
}

#[tokio::test]
async fn test_download_budget_leaves_target_unknown() {
    let chain = Chain::new();
    let fetcher = Arc::new(MockFetcher::with(chain.ancestors()));
    let config = ValidationConfig { download_limit: 1, ..Default::default() };
    let context = context_with(config, fetcher);

    let result = validate(&context, &chain.send2).await;

    assert_eq!(result.outcome, JobOutcome::BudgetExhausted);
    assert_eq!(result.downloads, 1);
    assert_eq!(result.validity(&chain.send2.tx_id()), Validity::Unknown);
}

#[tokio::test]
async fn test_depth_budget_leaves_target_unknown() {
    let chain = Chain::new();
    let fetcher = Arc::new(MockFetcher::with(chain.ancestors()));
    let context = context_with(ValidationConfig::default(), fetcher.clone());

    let options = JobOptions { depth_limit: Some(1), ..Default::default() };
    let result = context.make_job(&chain.send2, options).unwrap().unwrap().wait().await.unwrap();

    assert_eq!(result.outcome, JobOutcome::BudgetExhausted);
    assert_eq!(result.validity(&chain.send2.tx_id()), Validity::Unknown);
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_failed_job_does_not_stop_manager() {
    let chain = Chain::new();
    // genesis is missing from the backend
    let fetcher = Arc::new(MockFetcher::with([chain.send1.clone()]));
    let context = context_with(ValidationConfig::default(), fetcher);

    let failed = validate(&context, &chain.send2).await;
    assert!(matches!(failed.outcome, JobOutcome::Failed(_)));
    assert_eq!(failed.validity(&chain.send2.tx_id()), Validity::Unknown);

    let next = validate(&context, &chain.genesis).await;
    assert_eq!(next.outcome, JobOutcome::Complete);
    assert!(next.is_valid());
}

#[tokio::test]
async fn test_callbacks_fire_once() {
    let chain = Chain::new();
    let fetcher = Arc::new(MockFetcher::with(chain.ancestors()));
    let context = context_with(ValidationConfig::default(), fetcher);

    let fired = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(None));
    let (fired_cb, seen_cb) = (fired.clone(), seen.clone());
    let options = JobOptions::default().on_done(move |result| {
        fired_cb.fetch_add(1, Ordering::SeqCst);
        *seen_cb.lock().unwrap() = Some(result.is_valid());
    });

    let handle = context.make_job(&chain.send2, options).unwrap().unwrap();
    handle.wait().await.unwrap();

    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(*seen.lock().unwrap(), Some(true));
}

#[tokio::test]
async fn test_panicking_callback_leaves_manager_running() {
    let chain = Chain::new();
    let fetcher = Arc::new(MockFetcher::with(chain.ancestors()));
    let context = context_with(ValidationConfig::default(), fetcher);

    let fired = Arc::new(AtomicUsize::new(0));
    let fired_cb = fired.clone();
    let options = JobOptions::default()
        .on_done(|_| panic!("callback failure"))
        .on_done(move |_| {
            fired_cb.fetch_add(1, Ordering::SeqCst);
        });

    let first = context.make_job(&chain.send2, options).unwrap().unwrap();
    assert!(first.wait().await.unwrap().is_valid());
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    // the same graph still takes jobs
    let again = validate(&context, &chain.send1).await;
    assert!(again.is_valid());
    assert_eq!(context.graphs(), vec![chain.token]);
}

#[tokio::test]
async fn test_reset_graph_keeps_cache() {
    let chain = Chain::new();
    let fetcher = Arc::new(MockFetcher::with(chain.ancestors()));
    let context = context_with(ValidationConfig::default(), fetcher.clone());

    validate(&context, &chain.send2).await;
    assert!(context.reset_graph(&chain.token));
    assert!(context.graphs().is_empty());
    assert!(!context.reset_graph(&chain.token));

    let again = validate(&context, &chain.send2).await;
    assert!(again.is_valid());
    // ancestors came back out of the cache
    assert_eq!(again.downloads, 0);
    assert_eq!(again.nodes.len(), 3);
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_proxy_opinions_are_hints() {
    let chain = Chain::new();
    let fetcher = Arc::new(MockFetcher::with(chain.ancestors()));
    let oracle = StaticOracle([(chain.send2.tx_id(), false)].into_iter().collect());
    let config = ValidationConfig { proxy_enabled: true, ..Default::default() };
    let context = GraphContext::builder(config, new_cache())
        .fetcher(fetcher)
        .proxy(Arc::new(oracle))
        .build();

    let result = validate(&context, &chain.send2).await;

    assert!(result.is_valid());
    assert_eq!(result.proxy_opinions.get(&chain.send2.tx_id()), Some(&false));
}

#[tokio::test]
async fn test_proxy_suspects_are_downloaded_first() {
    let chain = Chain::new();
    let left = send_tx(TokenType::Fungible, chain.token, &[OutPoint::new(chain.send1.tx_id(), 1)], &[600]);
    let right = send_tx(TokenType::Fungible, chain.token, &[OutPoint::new(chain.send1.tx_id(), 2)], &[400]);
    let merge = send_tx(
        TokenType::Fungible,
        chain.token,
        &[OutPoint::new(left.tx_id(), 1), OutPoint::new(right.tx_id(), 1)],
        &[1000],
    );

    let mut txs = chain.ancestors();
    txs.extend([left.clone(), right.clone()]);
    let fetcher = Arc::new(MockFetcher::with(txs));
    let oracle = StaticOracle([(right.tx_id(), false)].into_iter().collect());
    let config = ValidationConfig { proxy_enabled: true, ..Default::default() };
    let context = GraphContext::builder(config, new_cache())
        .fetcher(fetcher.clone())
        .proxy(Arc::new(oracle))
        .build();

    let result = validate(&context, &merge).await;

    assert_eq!(fetcher.order()[..2], [right.tx_id(), left.tx_id()]);
    // the wrong opinion did not change the verdict
    assert!(result.is_valid());
    assert_eq!(result.validity(&right.tx_id()), Validity::Valid);
}

#[tokio::test]
async fn test_non_token_transactions_make_no_job() {
    let context = context_with(ValidationConfig::default(), Arc::new(MockFetcher::default()));
    let mut plain = Transaction::new();
    plain.add_input(TransactionInput::new(funding(9)));
    plain.add_output(TransactionOutput::new(1000, p2pkh()));

    assert!(context.make_job(&plain, JobOptions::default()).unwrap().is_none());
    assert!(context.graphs().is_empty());
}

#[test]
fn test_make_job_needs_runtime() {
    let chain = Chain::new();
    let context = context_with(ValidationConfig::default(), Arc::new(MockFetcher::default()));
    let err = context.make_job(&chain.send2, JobOptions::default()).unwrap_err();
    assert!(matches!(err, ValidationError::NoRuntime));
}

// ---------------------------------------------------------------------------
// pause / resume
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_pause_and_resume() {
    let chain = Chain::new();
    let fetcher = Arc::new(MockFetcher::with(chain.ancestors()).gated());
    let context = context_with(ValidationConfig::default(), fetcher.clone());
    let gate = fetcher.gate.as_ref().unwrap();

    // first job blocks inside its first fetch
    let first = context.make_job(&chain.send1, JobOptions::default()).unwrap().unwrap();
    gate.entered.notified().await;

    let second = context.make_job(&chain.send2, JobOptions::default()).unwrap().unwrap();
    second.pause().unwrap();
    gate.release.notify_one();

    let first = first.wait().await.unwrap();
    assert!(first.is_valid());
    assert_eq!(second.status(), JobStatus::Paused(PauseReason::Requested));

    second.resume().unwrap();
    let second = second.wait().await.unwrap();
    assert!(second.is_valid());
    assert_eq!(second.downloads, 0);
}

// ---------------------------------------------------------------------------
// graph search
// ---------------------------------------------------------------------------

/// Matches indexer queries by whether the decoded query is a graph lookup.
struct IndexerQuery {
    search: bool,
}

impl Match for IndexerQuery {
    fn matches(&self, request: &Request) -> bool {
        let Some(encoded) = request.url.path().strip_prefix("/q/") else {
            return false;
        };
        let Some(query) = URL_SAFE
            .decode(encoded)
            .ok()
            .and_then(|b| serde_json::from_slice::<Value>(&b).ok())
        else {
            return false;
        };
        let is_search = query["q"]["aggregate"]
            .as_array()
            .is_some_and(|stages| stages.iter().any(|s| s.get("$graphLookup").is_some()));
        is_search == self.search
    }
}

#[tokio::test]
async fn test_graph_search_fills_graph_in_one_round() {
    let chain = Chain::new();
    let server = MockServer::start().await;
    let root = chain.send2.tx_id();

    Mock::given(method("GET"))
        .and(IndexerQuery { search: false })
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "g": [{ "txid": root.to_hex(), "depthMap": {}, "totalDepth": 2, "txcount": 2 }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(IndexerQuery { search: true })
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "g": [{
                "txid": root.to_hex(),
                "tokenId": chain.token.to_string(),
                "dependsOn": [
                    STANDARD.encode(chain.genesis.to_bytes()),
                    STANDARD.encode(chain.send1.to_bytes()),
                ],
                "depths": [2, 1]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let cache = new_cache();
    let search = GraphSearchClient::new(
        GraphSearchConfig { base_url: Some(server.uri()), ..Default::default() },
        cache.clone(),
    );
    let config = ValidationConfig { graph_search_enabled: true, ..Default::default() };
    let context = GraphContext::builder(config, cache.clone()).graph_search(Arc::new(search)).build();

    let result = validate(&context, &chain.send2).await;

    assert_eq!(result.outcome, JobOutcome::Complete);
    assert!(result.is_valid());
    assert_eq!(result.downloads, 2);
    assert!(cache.contains(&chain.send1.tx_id()));
    assert!(cache.contains(&chain.genesis.tx_id()));
}

#[tokio::test]
async fn test_graph_search_without_host_fails_job() {
    let chain = Chain::new();
    let cache = new_cache();
    let search = GraphSearchClient::new(GraphSearchConfig::default(), cache.clone());
    let config = ValidationConfig { graph_search_enabled: true, ..Default::default() };
    let context = GraphContext::builder(config, cache).graph_search(Arc::new(search)).build();

    let result = validate(&context, &chain.send2).await;

    assert!(matches!(result.outcome, JobOutcome::Failed(_)));
    assert_eq!(result.validity(&chain.send2.tx_id()), Validity::Unknown);
}

// ---------------------------------------------------------------------------
// NFT1
// ---------------------------------------------------------------------------

/// Group GENESIS(10) -> group SEND [1, 9] -> child GENESIS -> child SEND [1].
struct NftFamily {
    group_genesis: Transaction,
    group_send: Transaction,
    child_genesis: Transaction,
    child_send: Transaction,
}

impl NftFamily {
    fn new(group_amounts: &[u64]) -> Self {
        let group_genesis = genesis_tx(TokenType::Nft1Group, 10, funding(3));
        let group = TokenId::new(group_genesis.tx_id());
        let group_send = send_tx(
            TokenType::Nft1Group,
            group,
            &[OutPoint::new(group_genesis.tx_id(), 1)],
            group_amounts,
        );
        let child_genesis =
            genesis_tx(TokenType::Nft1Child, 1, OutPoint::new(group_send.tx_id(), 1));
        let child = TokenId::new(child_genesis.tx_id());
        let child_send =
            send_tx(TokenType::Nft1Child, child, &[OutPoint::new(child_genesis.tx_id(), 1)], &[1]);
        NftFamily { group_genesis, group_send, child_genesis, child_send }
    }

    fn backend(&self) -> Arc<MockFetcher> {
        Arc::new(MockFetcher::with([
            self.group_genesis.clone(),
            self.group_send.clone(),
            self.child_genesis.clone(),
        ]))
    }
}

#[tokio::test]
async fn test_nft_child_validated_through_group_parent() {
    let family = NftFamily::new(&[1, 9]);
    let context = context_with(ValidationConfig::default(), family.backend());

    let result = validate(&context, &family.child_send).await;

    assert_eq!(result.outcome, JobOutcome::Complete);
    assert!(result.is_valid());
    assert_eq!(result.validity(&family.child_genesis.tx_id()), Validity::Valid);

    let parent = result.nft_parent.expect("parent resolved");
    assert_eq!(parent.parent_txid, family.group_send.tx_id());
    assert_eq!(parent.group_id, Some(TokenId::new(family.group_genesis.tx_id())));
    assert_eq!(parent.validity, Validity::Valid);

    // the group got a graph of its own
    let mut graphs = context.graphs();
    graphs.sort();
    let mut expected = vec![
        TokenId::new(family.group_genesis.tx_id()),
        TokenId::new(family.child_genesis.tx_id()),
    ];
    expected.sort();
    assert_eq!(graphs, expected);
}

#[tokio::test]
async fn test_nft_child_with_invalid_group_parent() {
    // the group SEND overspends its genesis
    let family = NftFamily::new(&[1, 20]);
    let context = context_with(ValidationConfig::default(), family.backend());

    let result = validate(&context, &family.child_genesis).await;

    assert_eq!(result.validity(&family.child_genesis.tx_id()), Validity::BadNftParent);
    let parent = result.nft_parent.unwrap();
    assert_eq!(parent.validity, Validity::InsufficientInputs);
}

#[tokio::test]
async fn test_nft_child_spending_fungible_token_is_bad_parent() {
    let chain = Chain::new();
    let child_genesis =
        genesis_tx(TokenType::Nft1Child, 1, OutPoint::new(chain.send1.tx_id(), 1));
    let child = TokenId::new(child_genesis.tx_id());
    let child_send =
        send_tx(TokenType::Nft1Child, child, &[OutPoint::new(child_genesis.tx_id(), 1)], &[1]);

    let fetcher = Arc::new(MockFetcher::with([chain.send1.clone(), child_genesis.clone()]));
    let context = context_with(ValidationConfig::default(), fetcher);

    let result = validate(&context, &child_send).await;

    assert_eq!(result.validity(&child_genesis.tx_id()), Validity::BadNftParent);
    assert_eq!(result.validity(&child_send.tx_id()), Validity::InsufficientInputs);
    let parent = result.nft_parent.unwrap();
    assert_eq!(parent.group_id, None);
    // the fungible parent is never judged by the child's job
    assert_eq!(parent.validity, Validity::Unknown);
    // no nested job was started
    assert_eq!(context.graphs(), vec![child]);
}
