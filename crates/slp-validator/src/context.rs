//! The validation engine: shared fetch services plus a registry of token
//! graphs, each driven by its own job manager task.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use slp_graph::{ExpiringTxCache, GraphSearchClient, TxFetcher, ValidityOracle};
use slp_script::{SlpPayload, SlpTransactionType, TokenId};
use slp_transaction::Transaction;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::graph::TokenGraph;
use crate::job::{JobHandle, JobId, JobOptions, ParentRequest, ValidationJob};
use crate::manager::{JobManager, ManagerHandle, ManagerMessage, ParentValidation};
use crate::validator::Validator;
use crate::{ValidationConfig, ValidationError, Validity};

/// Services and settings every job of a context shares.
#[derive(Clone)]
pub(crate) struct JobEnv {
    pub cache: Arc<ExpiringTxCache>,
    pub fetcher: Option<Arc<dyn TxFetcher>>,
    pub graph_search: Option<Arc<GraphSearchClient>>,
    pub proxy: Option<Arc<dyn ValidityOracle>>,
    pub config: ValidationConfig,
}

/// Builder for a [`GraphContext`].
pub struct GraphContextBuilder {
    config: ValidationConfig,
    cache: Arc<ExpiringTxCache>,
    fetcher: Option<Arc<dyn TxFetcher>>,
    graph_search: Option<Arc<GraphSearchClient>>,
    proxy: Option<Arc<dyn ValidityOracle>>,
}

impl GraphContextBuilder {
    /// Per-transaction fetch backend.
    pub fn fetcher(mut self, fetcher: Arc<dyn TxFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Graph indexer client. Only used when `graph_search_enabled` is set.
    pub fn graph_search(mut self, client: Arc<GraphSearchClient>) -> Self {
        self.graph_search = Some(client);
        self
    }

    /// Proxy validity oracle. Only used when `proxy_enabled` is set.
    pub fn proxy(mut self, proxy: Arc<dyn ValidityOracle>) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Finish building.
    pub fn build(self) -> GraphContext {
        let env = JobEnv {
            cache: self.cache,
            fetcher: self.fetcher,
            graph_search: self.graph_search,
            proxy: self.proxy,
            config: self.config,
        };
        let inner = Arc::new_cyclic(|me| ContextInner {
            me: me.clone(),
            env,
            graphs: Mutex::new(HashMap::new()),
            next_job_id: AtomicU64::new(1),
        });
        GraphContext { inner }
    }
}

/// Entry point of the validation engine.
///
/// Cheap to clone; clones share graphs and services. Jobs run on the Tokio
/// runtime that is current when [`make_job`](Self::make_job) is called.
#[derive(Clone)]
pub struct GraphContext {
    inner: Arc<ContextInner>,
}

impl fmt::Debug for GraphContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphContext")
            .field("config", &self.inner.env.config)
            .field("graphs", &self.inner.lock_graphs().len())
            .finish()
    }
}

impl GraphContext {
    /// Start building a context around a shared transaction cache.
    pub fn builder(config: ValidationConfig, cache: Arc<ExpiringTxCache>) -> GraphContextBuilder {
        GraphContextBuilder { config, cache, fetcher: None, graph_search: None, proxy: None }
    }

    /// The shared transaction cache.
    pub fn cache(&self) -> &Arc<ExpiringTxCache> {
        &self.inner.env.cache
    }

    /// Engine configuration.
    pub fn config(&self) -> &ValidationConfig {
        &self.inner.env.config
    }

    /// Submit a job validating `tx` against its token's graph.
    ///
    /// The token id is the transaction's own id for a GENESIS and the declared
    /// id otherwise; the graph's validator follows the message's token type.
    ///
    /// # Returns
    /// `Ok(None)` when the transaction carries nothing to validate: no SLP
    /// message, an unsupported or malformed one, or a COMMIT.
    pub fn make_job(
        &self,
        tx: &Transaction,
        options: JobOptions,
    ) -> Result<Option<JobHandle>, ValidationError> {
        self.inner.make_job(tx, options)
    }

    /// Drop a token's graph. The next job for the token starts from scratch;
    /// jobs still queued on the old graph finish as failed.
    pub fn reset_graph(&self, token_id: &TokenId) -> bool {
        self.inner.reset_graph(token_id)
    }

    /// Token ids with a live graph.
    pub fn graphs(&self) -> Vec<TokenId> {
        self.inner.lock_graphs().keys().copied().collect()
    }

    /// Shut down every graph.
    pub fn shutdown(&self) {
        let mut graphs = self.inner.lock_graphs();
        for (_, manager) in graphs.drain() {
            manager.shutdown();
        }
    }
}

struct ContextInner {
    me: Weak<ContextInner>,
    env: JobEnv,
    graphs: Mutex<HashMap<TokenId, ManagerHandle>>,
    next_job_id: AtomicU64,
}

impl ContextInner {
    fn lock_graphs(&self) -> MutexGuard<'_, HashMap<TokenId, ManagerHandle>> {
        self.graphs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn make_job(&self, tx: &Transaction, options: JobOptions) -> Result<Option<JobHandle>, ValidationError> {
        let txid = tx.tx_id();
        let msg = match tx.slp_message() {
            Ok(msg) => msg,
            Err(e) => {
                debug!(txid = %txid, error = %e, "nothing to validate");
                return Ok(None);
            }
        };
        if msg.transaction_type() == SlpTransactionType::Commit {
            return Ok(None);
        }
        let token_id = match &msg.payload {
            SlpPayload::Genesis(_) => TokenId::new(txid),
            _ => match msg.token_id() {
                Some(id) => id,
                None => return Ok(None),
            },
        };

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| ValidationError::NoRuntime)?;

        if options.reset {
            self.reset_graph(&token_id);
        }

        let id = JobId(self.next_job_id.fetch_add(1, Ordering::Relaxed));
        let mut graphs = self.lock_graphs();
        if graphs.get(&token_id).is_some_and(|m| m.is_closed()) {
            graphs.remove(&token_id);
        }
        let manager = graphs
            .entry(token_id)
            .or_insert_with(|| {
                info!(token_id = %token_id, token_type = %msg.token_type, "creating token graph");
                let graph = TokenGraph::new(Validator::for_token(token_id, msg.token_type));
                let parents: Weak<dyn ParentValidation> = self.me.clone();
                JobManager::spawn(&runtime, graph, self.env.clone(), parents)
            })
            .clone();
        drop(graphs);

        let (job, handle) =
            ValidationJob::new(id, token_id, vec![tx.clone()], options, &self.env, manager.sender());
        debug!(job = %id, txid = %txid, token_id = %token_id, "submitting validation job");
        manager.submit(job)?;
        Ok(Some(handle))
    }

    fn reset_graph(&self, token_id: &TokenId) -> bool {
        match self.lock_graphs().remove(token_id) {
            Some(manager) => {
                info!(token_id = %token_id, "resetting token graph");
                manager.shutdown();
                true
            }
            None => false,
        }
    }
}

impl ParentValidation for ContextInner {
    fn validate_parent(&self, request: ParentRequest, reply: mpsc::UnboundedSender<ManagerMessage>) {
        let ParentRequest { parent_txid, parent_tx, group_id, hook } = request;
        let resolve = move |validity: Validity| ManagerMessage::ParentResolved {
            parent_txid,
            group_id: Some(group_id),
            validity,
        };

        let on_done = reply.clone();
        let options = JobOptions {
            hook,
            callbacks: vec![Box::new(move |result: &crate::JobResult| {
                // the child graph may have been reset meanwhile
                let _ = on_done.send(resolve(result.validity(&parent_txid)));
            })],
            ..Default::default()
        };

        let fallback = match self.make_job(&parent_tx, options) {
            Ok(Some(_handle)) => return,
            Ok(None) => Validity::BadNftParent,
            Err(e) => {
                warn!(parent = %parent_txid, error = %e, "could not start NFT1 parent job");
                Validity::Unknown
            }
        };
        let _ = reply.send(resolve(fallback));
    }
}
