//! Validation jobs.
//!
//! A job validates one or more target transactions against one token graph.
//! It runs in steps driven by the graph's job manager; between steps the
//! manager handles pause/resume messages, so a job never blocks the graph
//! for longer than one network round.
//!
//! Each step:
//!
//! 1. Walks backward from the targets through masked inputs, taking
//!    ancestors from the graph itself, the job's seeded transactions, the
//!    caller's fetch hook and the shared cache. Ancestors of final nodes are
//!    never expanded, so a decided target costs nothing to revalidate.
//! 2. Evaluates every visited node, ancestors first, until nothing changes.
//! 3. If targets are still undecided, performs one network round: the graph
//!    search (once per job), otherwise a batch of per-transaction fetches.
//!
//! Depth and download budgets bound the walk. Running out of either ends
//! the job with undecided nodes left Unknown.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use slp_graph::{GraphError, GraphSearchJob, SearchBudget};
use slp_primitives::Hash;
use slp_script::{TokenId, TokenType};
use slp_transaction::Transaction;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::context::JobEnv;
use crate::graph::TokenGraph;
use crate::manager::ManagerMessage;
use crate::validator::{NftParentState, Verdict};
use crate::{ValidationError, Validity};

/// Per-transaction fetches issued in one network round.
const FETCH_BATCH: usize = 20;

/// Caller-supplied lookup of already-known transactions (e.g. the wallet's).
///
/// Receives the ids the job is missing and returns whichever it has.
pub type FetchHook = Arc<dyn Fn(&[Hash]) -> Vec<Transaction> + Send + Sync>;

/// Completion callback. Called exactly once with the final result.
pub type JobCallback = Box<dyn FnOnce(&JobResult) + Send>;

/// Identifier of a job, unique within a [`GraphContext`](crate::GraphContext).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Why a job is paused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PauseReason {
    /// Paused through [`JobHandle::pause`].
    Requested,
    /// Waiting for the NFT1 group parent to be validated on its own graph.
    AwaitingParent {
        /// The group transaction being validated.
        parent_txid: Hash,
    },
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Every target was decided, or nothing more could be learned.
    Complete,
    /// The depth or download budget ran out first.
    BudgetExhausted,
    /// A resource error stopped the job.
    Failed(String),
}

/// Lifecycle of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// Queued, not started.
    Pending,
    /// Being stepped by the manager.
    Running,
    /// Holding its place in the run list but skipped.
    Paused(PauseReason),
    /// Terminal.
    Finished(JobOutcome),
}

/// Resolution of an NFT1 child's group parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NftParentInfo {
    /// The group transaction spent by the child genesis.
    pub parent_txid: Hash,
    /// Token id of the group, when the parent is a group transaction.
    pub group_id: Option<TokenId>,
    /// Verdict of the nested parent job. `Unknown` when the parent was
    /// rejected without being validated; the child genesis then holds
    /// [`Validity::BadNftParent`] on its own.
    pub validity: Validity,
}

/// Final report of a job.
#[derive(Debug, Clone)]
pub struct JobResult {
    /// The job.
    pub job_id: JobId,
    /// Token graph the job ran against.
    pub token_id: TokenId,
    /// Target transactions.
    pub targets: Vec<Hash>,
    /// Validity of every transaction the job visited.
    pub nodes: HashMap<Hash, Validity>,
    /// How the job ended.
    pub outcome: JobOutcome,
    /// Number of transactions downloaded.
    pub downloads: usize,
    /// Proxy oracle opinions collected on the way. Hints only.
    pub proxy_opinions: HashMap<Hash, bool>,
    /// Group parent resolution, for NFT1 child tokens.
    pub nft_parent: Option<NftParentInfo>,
}

impl JobResult {
    /// Validity of `txid` as seen by this job.
    pub fn validity(&self, txid: &Hash) -> Validity {
        self.nodes.get(txid).copied().unwrap_or_default()
    }

    /// True if every target is Valid.
    pub fn is_valid(&self) -> bool {
        self.targets.iter().all(|t| self.validity(t).is_valid())
    }
}

/// Per-job settings supplied to [`GraphContext::make_job`](crate::GraphContext::make_job).
#[derive(Default)]
pub struct JobOptions {
    /// Lookup of already-known transactions.
    pub hook: Option<FetchHook>,
    /// Callbacks fired on completion.
    pub callbacks: Vec<JobCallback>,
    /// Drop the token's graph first and start from scratch.
    pub reset: bool,
    /// Override of the configured download budget.
    pub download_limit: Option<usize>,
    /// Override of the configured depth budget.
    pub depth_limit: Option<u32>,
}

impl JobOptions {
    /// Set the fetch hook.
    pub fn with_hook(mut self, hook: FetchHook) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Add a completion callback.
    pub fn on_done(mut self, callback: impl FnOnce(&JobResult) + Send + 'static) -> Self {
        self.callbacks.push(Box::new(callback));
        self
    }
}

impl fmt::Debug for JobOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobOptions")
            .field("hook", &self.hook.is_some())
            .field("callbacks", &self.callbacks.len())
            .field("reset", &self.reset)
            .field("download_limit", &self.download_limit)
            .field("depth_limit", &self.depth_limit)
            .finish()
    }
}

/// A request to validate an NFT1 group parent on its own graph.
pub(crate) struct ParentRequest {
    pub parent_txid: Hash,
    pub parent_tx: Transaction,
    pub group_id: TokenId,
    pub hook: Option<FetchHook>,
}

/// Result of one job step.
pub(crate) enum StepOutcome {
    /// More work remains.
    Continue,
    /// Nothing more to do.
    Completed,
    /// A budget ran out.
    BudgetExhausted,
    /// Validate the group parent, then resume.
    AwaitParent(ParentRequest),
    /// Another job already awaits this parent; wait alongside it.
    JoinParent(Hash),
    /// Resource error.
    Failed(ValidationError),
}

/// A validation request against one token graph.
pub struct ValidationJob {
    id: JobId,
    token_id: TokenId,
    targets: Vec<Hash>,
    hook: Option<FetchHook>,
    seeded: HashMap<Hash, Transaction>,
    download_limit: usize,
    depth_limit: u32,
    downloads: usize,
    status: JobStatus,
    status_tx: watch::Sender<JobStatus>,
    callbacks: Vec<JobCallback>,
    done_tx: Option<oneshot::Sender<JobResult>>,

    frontier: VecDeque<(Hash, u32)>,
    visited: HashSet<Hash>,
    order: Vec<Hash>,
    wanted: VecDeque<(Hash, u32)>,
    wanted_set: HashSet<Hash>,
    depth_exceeded: bool,
    graph_search_done: bool,
    parent_attempted: bool,
    nft_parent: Option<NftParentInfo>,
    proxy_asked: HashSet<Hash>,
    proxy_opinions: HashMap<Hash, bool>,
}

impl fmt::Debug for ValidationJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationJob")
            .field("id", &self.id)
            .field("token_id", &self.token_id)
            .field("targets", &self.targets)
            .field("status", &self.status)
            .field("downloads", &self.downloads)
            .field("visited", &self.visited.len())
            .finish()
    }
}

impl ValidationJob {
    /// Create a job and the handle that observes it.
    pub(crate) fn new(
        id: JobId,
        token_id: TokenId,
        targets: Vec<Transaction>,
        options: JobOptions,
        env: &JobEnv,
        manager: mpsc::UnboundedSender<ManagerMessage>,
    ) -> (Self, JobHandle) {
        let (status_tx, status_rx) = watch::channel(JobStatus::Pending);
        let (done_tx, done_rx) = oneshot::channel();

        let mut seeded = HashMap::new();
        let mut target_ids = Vec::new();
        for tx in targets {
            let txid = tx.tx_id();
            target_ids.push(txid);
            seeded.insert(txid, tx);
        }

        let job = ValidationJob {
            id,
            token_id,
            frontier: target_ids.iter().map(|t| (*t, 0)).collect(),
            targets: target_ids,
            hook: options.hook,
            seeded,
            download_limit: options.download_limit.unwrap_or(env.config.download_limit),
            depth_limit: options.depth_limit.unwrap_or(env.config.depth_limit),
            downloads: 0,
            status: JobStatus::Pending,
            status_tx,
            callbacks: options.callbacks,
            done_tx: Some(done_tx),
            visited: HashSet::new(),
            order: Vec::new(),
            wanted: VecDeque::new(),
            wanted_set: HashSet::new(),
            depth_exceeded: false,
            graph_search_done: false,
            parent_attempted: false,
            nft_parent: None,
            proxy_asked: HashSet::new(),
            proxy_opinions: HashMap::new(),
        };
        let handle = JobHandle { id, token_id, status_rx, done_rx, manager };
        (job, handle)
    }

    /// The job's id.
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Current status.
    pub fn status(&self) -> &JobStatus {
        &self.status
    }

    /// Number of downloads so far.
    pub fn downloads(&self) -> usize {
        self.downloads
    }

    pub(crate) fn set_status(&mut self, status: JobStatus) {
        self.status = status.clone();
        // no receivers left is fine: nobody is watching
        let _ = self.status_tx.send(status);
    }

    pub(crate) fn is_paused(&self) -> bool {
        matches!(self.status, JobStatus::Paused(_))
    }

    pub(crate) fn set_nft_parent(&mut self, info: NftParentInfo) {
        self.nft_parent = Some(info);
    }

    /// Advance the job by one step.
    pub(crate) async fn step(&mut self, graph: &mut TokenGraph, env: &JobEnv) -> StepOutcome {
        self.expand(graph, env);
        let awaiting = self.evaluate(graph);

        if self.targets_decided(graph) {
            return StepOutcome::Completed;
        }

        if let Some(genesis) = awaiting {
            if !self.parent_attempted {
                self.parent_attempted = true;
                match graph.validator().nft_parent_state() {
                    Some(NftParentState::Unresolved) => {
                        return match self.prepare_parent(graph, &genesis, env).await {
                            Ok(Some(request)) => StepOutcome::AwaitParent(request),
                            Ok(None) => StepOutcome::Continue,
                            Err(e) => StepOutcome::Failed(e),
                        };
                    }
                    Some(NftParentState::Awaiting { parent_txid }) => {
                        return StepOutcome::JoinParent(parent_txid);
                    }
                    _ => {}
                }
            }
        }

        if self.wanted.is_empty() {
            return if self.depth_exceeded {
                StepOutcome::BudgetExhausted
            } else {
                StepOutcome::Completed
            };
        }
        if self.downloads >= self.download_limit {
            return StepOutcome::BudgetExhausted;
        }

        if env.config.proxy_enabled {
            self.ask_proxy(env).await;
        }

        let round = if env.config.graph_search_enabled && !self.graph_search_done {
            self.graph_search_done = true;
            self.graph_search_round(graph, env).await
        } else {
            self.fetch_round(graph, env).await
        };
        match round {
            Ok(()) => StepOutcome::Continue,
            Err(e) => StepOutcome::Failed(e),
        }
    }

    /// Visit everything reachable without the network.
    fn expand(&mut self, graph: &mut TokenGraph, env: &JobEnv) {
        loop {
            let mut missing: Vec<(Hash, u32)> = Vec::new();
            let mut missing_set = HashSet::new();

            while let Some((txid, depth)) = self.frontier.pop_front() {
                if self.visited.contains(&txid) || self.wanted_set.contains(&txid) {
                    continue;
                }
                if graph.contains(&txid) {
                    self.visit(graph, txid, depth);
                } else if missing_set.insert(txid) {
                    missing.push((txid, depth));
                }
            }

            if missing.is_empty() {
                return;
            }

            let ids: Vec<Hash> = missing.iter().map(|(t, _)| *t).collect();
            let mut found = self.lookup_local(&ids, env);
            for (txid, depth) in missing {
                if let Some(tx) = found.remove(&txid) {
                    graph.insert(txid, &tx);
                    self.frontier.push_back((txid, depth));
                } else if self.wanted_set.insert(txid) {
                    self.wanted.push_back((txid, depth));
                }
            }

            if self.frontier.is_empty() {
                return;
            }
        }
    }

    fn visit(&mut self, graph: &TokenGraph, txid: Hash, depth: u32) {
        if !self.visited.insert(txid) {
            return;
        }
        self.order.push(txid);

        let Some(node) = graph.node(&txid) else {
            return;
        };
        if node.finalized {
            return;
        }
        for op in node.masked_inputs() {
            if self.visited.contains(&op.txid) {
                continue;
            }
            if depth + 1 > self.depth_limit {
                self.depth_exceeded = true;
                continue;
            }
            self.frontier.push_back((op.txid, depth + 1));
        }
    }

    /// Seeded transactions, then the hook, then the cache.
    fn lookup_local(&self, ids: &[Hash], env: &JobEnv) -> HashMap<Hash, Transaction> {
        let mut found = HashMap::new();
        let mut rest = Vec::new();
        for id in ids {
            match self.seeded.get(id) {
                Some(tx) => {
                    found.insert(*id, tx.clone());
                }
                None => rest.push(*id),
            }
        }

        if let (Some(hook), false) = (&self.hook, rest.is_empty()) {
            let wanted: HashSet<Hash> = rest.iter().copied().collect();
            for tx in hook(&rest) {
                let txid = tx.tx_id();
                if wanted.contains(&txid) {
                    found.insert(txid, tx);
                }
            }
        }

        for id in rest {
            if found.contains_key(&id) {
                continue;
            }
            if let Some(tx) = env.cache.get_tx(&id) {
                found.insert(id, tx);
            }
        }
        found
    }

    /// Evaluate visited nodes, ancestors first, until nothing changes.
    ///
    /// # Returns
    /// An NFT1 genesis waiting on its parent, if any.
    fn evaluate(&mut self, graph: &mut TokenGraph) -> Option<Hash> {
        let mut awaiting = None;
        loop {
            let mut changed = false;
            for txid in self.order.iter().rev() {
                if graph.node(txid).map_or(true, |n| n.finalized) {
                    continue;
                }
                match graph.evaluate(txid) {
                    Verdict::Decided(validity) => {
                        debug!(job = %self.id, txid = %txid, validity = validity.code(), "decided");
                        changed = true;
                    }
                    Verdict::AwaitParent => awaiting = Some(*txid),
                    Verdict::Undecided => {}
                }
            }
            if !changed {
                return awaiting;
            }
        }
    }

    fn targets_decided(&self, graph: &TokenGraph) -> bool {
        self.targets.iter().all(|t| graph.node(t).is_some_and(|n| n.finalized))
    }

    /// Get one transaction from any source, downloading if needed.
    async fn obtain(
        &mut self,
        txid: Hash,
        env: &JobEnv,
    ) -> Result<Transaction, ValidationError> {
        if let Some(tx) = self.lookup_local(&[txid], env).remove(&txid) {
            return Ok(tx);
        }
        let fetcher = env.fetcher.as_ref().ok_or(ValidationError::Unavailable(txid))?;
        let raw = fetcher.fetch_raw_tx(&txid).await?;
        slp_graph::verify_raw_tx(&txid, &raw)?;
        env.cache.put_with_txid(txid, &raw);
        self.downloads += 1;
        Ok(Transaction::from_bytes(&raw)?)
    }

    /// Inspect the parent of an NFT1 child genesis.
    ///
    /// # Returns
    /// A parent request when a nested job is needed, or `None` when the
    /// parent was rejected outright (the validator then holds the verdict).
    async fn prepare_parent(
        &mut self,
        graph: &mut TokenGraph,
        genesis: &Hash,
        env: &JobEnv,
    ) -> Result<Option<ParentRequest>, ValidationError> {
        let spent = graph.node(genesis).and_then(|n| n.inputs.first().copied());
        let Some(spent) = spent else {
            self.reject_parent(graph, Hash::default(), None);
            return Ok(None);
        };

        let parent_tx = self.obtain(spent.txid, env).await?;
        let group = match parent_tx.slp_message() {
            Ok(msg) if msg.token_type == TokenType::Nft1Group => {
                let declared = msg.token_outputs().get(spent.vout as usize).map(|o| o.amount());
                if declared.unwrap_or(0) > 0 {
                    Some(msg.token_id().unwrap_or(TokenId::new(spent.txid)))
                } else {
                    None
                }
            }
            _ => None,
        };

        let Some(group_id) = group else {
            info!(job = %self.id, parent = %spent.txid, "NFT1 child spends no group token");
            self.reject_parent(graph, spent.txid, None);
            return Ok(None);
        };

        info!(job = %self.id, parent = %spent.txid, group_id = %group_id, "validating NFT1 group parent");
        Ok(Some(ParentRequest {
            parent_txid: spent.txid,
            parent_tx,
            group_id,
            hook: self.hook.clone(),
        }))
    }

    fn reject_parent(&mut self, graph: &mut TokenGraph, parent_txid: Hash, group_id: Option<TokenId>) {
        let info = NftParentInfo { parent_txid, group_id, validity: Validity::Unknown };
        if let Some(nft) = graph.validator_mut().as_nft_mut() {
            nft.set_parent_state(NftParentState::Resolved {
                parent_txid,
                group_id,
                validity: Validity::BadNftParent,
            });
        }
        self.nft_parent = Some(info);
    }

    /// Move wanted entries back to the frontier so the next expansion
    /// finds them in the cache.
    fn requeue_wanted(&mut self) {
        self.wanted_set.clear();
        self.frontier.extend(self.wanted.drain(..));
    }

    async fn graph_search_round(&mut self, graph: &TokenGraph, env: &JobEnv) -> Result<(), ValidationError> {
        let client = env
            .graph_search
            .as_ref()
            .filter(|c| c.is_configured())
            .ok_or_else(|| GraphError::BackendUnavailable("graph search host is not set".to_string()))?;

        let mut search = GraphSearchJob::new(self.targets.clone());
        let budget = SearchBudget {
            depth_limit: self.depth_limit,
            download_limit: self.download_limit.saturating_sub(self.downloads),
        };
        // decided nodes never need their ancestors again
        let known: HashSet<Hash> = self
            .visited
            .iter()
            .filter(|t| graph.node(t).is_some_and(|n| n.finalized))
            .copied()
            .collect();
        let downloaded = client.run(&mut search, budget, &known).await?;
        self.downloads += downloaded.len();
        info!(
            job = %self.id,
            downloaded = downloaded.len(),
            status = ?search.status,
            "graph search round"
        );
        self.requeue_wanted();
        Ok(())
    }

    async fn fetch_round(&mut self, graph: &mut TokenGraph, env: &JobEnv) -> Result<(), ValidationError> {
        // a graph search may have landed these in the cache meanwhile
        let mut pending = Vec::new();
        for (txid, depth) in self.wanted.drain(..) {
            match env.cache.get_tx(&txid) {
                Some(tx) => {
                    graph.insert(txid, &tx);
                    self.frontier.push_back((txid, depth));
                }
                None => pending.push((txid, depth)),
            }
        }
        self.wanted_set.clear();

        if !self.frontier.is_empty() {
            for (txid, depth) in pending {
                self.wanted_set.insert(txid);
                self.wanted.push_back((txid, depth));
            }
            return Ok(());
        }

        let fetcher = env.fetcher.clone().ok_or_else(|| {
            GraphError::BackendUnavailable("no transaction fetcher configured".to_string())
        })?;

        let room = self.download_limit.saturating_sub(self.downloads).min(FETCH_BATCH);
        let mut rest = pending.split_off(room.min(pending.len()));
        for (txid, depth) in pending {
            let raw = fetcher.fetch_raw_tx(&txid).await?;
            slp_graph::verify_raw_tx(&txid, &raw)?;
            let tx = Transaction::from_bytes(&raw)?;
            env.cache.put_with_txid(txid, &raw);
            self.downloads += 1;
            graph.insert(txid, &tx);
            self.frontier.push_back((txid, depth));
        }
        debug!(job = %self.id, downloads = self.downloads, remaining = rest.len(), "fetch round");

        for (txid, depth) in rest.drain(..) {
            self.wanted_set.insert(txid);
            self.wanted.push_back((txid, depth));
        }
        Ok(())
    }

    /// Collect proxy opinions on the targets and the pending downloads.
    ///
    /// Opinions never decide a verdict. They only reorder the download
    /// queue: ancestors the proxy calls invalid are fetched first, since one
    /// bad input is enough to decide a target.
    async fn ask_proxy(&mut self, env: &JobEnv) {
        let Some(proxy) = env.proxy.as_ref() else {
            return;
        };
        let ids: Vec<Hash> = self
            .targets
            .iter()
            .chain(self.wanted.iter().map(|(t, _)| t))
            .filter(|t| !self.proxy_asked.contains(*t))
            .copied()
            .collect();
        if ids.is_empty() {
            return;
        }
        self.proxy_asked.extend(ids.iter().copied());

        match tokio::time::timeout(env.config.proxy_timeout(), proxy.opinions(&ids)).await {
            Ok(Ok(opinions)) => self.proxy_opinions.extend(opinions),
            Ok(Err(e)) => warn!(job = %self.id, error = %e, "proxy request failed"),
            Err(_) => warn!(job = %self.id, "proxy request timed out"),
        }
        self.prioritize_suspects();
    }

    /// Stable partition of `wanted`: proxy-invalid ids first.
    fn prioritize_suspects(&mut self) {
        let (suspects, rest): (VecDeque<_>, VecDeque<_>) = self
            .wanted
            .drain(..)
            .partition(|(txid, _)| self.proxy_opinions.get(txid) == Some(&false));
        if !suspects.is_empty() {
            debug!(job = %self.id, suspects = suspects.len(), "proxy suspects fetched first");
        }
        self.wanted = suspects;
        self.wanted.extend(rest);
    }

    /// Terminate the job: report to the handle and fire every callback once.
    pub(crate) fn finish(mut self, graph: &TokenGraph, outcome: JobOutcome) {
        let mut nodes = HashMap::with_capacity(self.order.len());
        for txid in &self.order {
            let validity = graph
                .node(txid)
                .map(|n| if n.finalized { n.validity } else { Validity::Unknown })
                .unwrap_or_default();
            nodes.insert(*txid, validity);
        }
        for txid in &self.targets {
            nodes.entry(*txid).or_insert(Validity::Unknown);
        }

        for (txid, opinion) in &self.proxy_opinions {
            if let Some(validity) = nodes.get(txid).filter(|v| **v != Validity::Unknown) {
                if validity.is_valid() != *opinion {
                    warn!(
                        job = %self.id,
                        txid = %txid,
                        validity = validity.code(),
                        proxy = opinion,
                        "proxy opinion disagrees with validation"
                    );
                }
            }
        }

        let result = JobResult {
            job_id: self.id,
            token_id: self.token_id,
            targets: self.targets.clone(),
            nodes,
            outcome: outcome.clone(),
            downloads: self.downloads,
            proxy_opinions: std::mem::take(&mut self.proxy_opinions),
            nft_parent: self.nft_parent,
        };

        info!(
            job = %self.id,
            token_id = %self.token_id,
            outcome = ?outcome,
            downloads = self.downloads,
            valid = result.is_valid(),
            "validation job finished"
        );

        self.set_status(JobStatus::Finished(outcome));
        for callback in self.callbacks.drain(..) {
            // a panicking callback must not take the manager loop down with it
            if panic::catch_unwind(AssertUnwindSafe(|| callback(&result))).is_err() {
                warn!(job = %self.id, token_id = %self.token_id, "job callback panicked");
            }
        }
        if let Some(tx) = self.done_tx.take() {
            // the handle may have been dropped
            let _ = tx.send(result);
        }
    }
}

/// Observer and control handle of a submitted job.
#[derive(Debug)]
pub struct JobHandle {
    id: JobId,
    token_id: TokenId,
    status_rx: watch::Receiver<JobStatus>,
    done_rx: oneshot::Receiver<JobResult>,
    manager: mpsc::UnboundedSender<ManagerMessage>,
}

impl JobHandle {
    /// The job's id.
    pub fn id(&self) -> JobId {
        self.id
    }

    /// The token graph the job runs against.
    pub fn token_id(&self) -> TokenId {
        self.token_id
    }

    /// Current status.
    pub fn status(&self) -> JobStatus {
        self.status_rx.borrow().clone()
    }

    /// Ask the manager to skip this job until [`resume`](Self::resume).
    pub fn pause(&self) -> Result<(), ValidationError> {
        self.manager
            .send(ManagerMessage::Pause(self.id))
            .map_err(|_| ValidationError::ManagerStopped(self.token_id.to_string()))
    }

    /// Undo [`pause`](Self::pause).
    pub fn resume(&self) -> Result<(), ValidationError> {
        self.manager
            .send(ManagerMessage::Resume(self.id))
            .map_err(|_| ValidationError::ManagerStopped(self.token_id.to_string()))
    }

    /// Wait for the final result.
    pub async fn wait(self) -> Result<JobResult, ValidationError> {
        self.done_rx.await.map_err(|_| ValidationError::JobDropped)
    }
}
