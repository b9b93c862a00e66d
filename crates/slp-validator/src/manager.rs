//! Per-graph job manager.
//!
//! Every token graph is owned by exactly one manager task. The task keeps a
//! FIFO run list and steps the first job that is not paused, so jobs on the
//! same graph run one after another while distinct graphs run concurrently.
//! Control messages (submit, pause, resume, parent resolution, shutdown) are
//! drained between steps.

use std::collections::{HashMap, VecDeque};
use std::sync::Weak;

use slp_primitives::Hash;
use slp_script::TokenId;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use crate::context::JobEnv;
use crate::graph::TokenGraph;
use crate::job::{
    JobId, JobOutcome, JobStatus, NftParentInfo, ParentRequest, PauseReason, StepOutcome,
    ValidationJob,
};
use crate::validator::NftParentState;
use crate::{ValidationError, Validity};

/// Messages accepted by a job manager.
pub(crate) enum ManagerMessage {
    Submit(Box<ValidationJob>),
    Pause(JobId),
    Resume(JobId),
    ParentResolved {
        parent_txid: Hash,
        group_id: Option<TokenId>,
        validity: Validity,
    },
    Shutdown,
}

/// Runs NFT1 group parents on their own graph.
///
/// When the nested job finishes, the implementation must send
/// [`ManagerMessage::ParentResolved`] through `reply`.
pub(crate) trait ParentValidation: Send + Sync {
    fn validate_parent(&self, request: ParentRequest, reply: mpsc::UnboundedSender<ManagerMessage>);
}

/// Sending side of a running manager.
#[derive(Clone)]
pub(crate) struct ManagerHandle {
    token_id: TokenId,
    tx: mpsc::UnboundedSender<ManagerMessage>,
}

impl ManagerHandle {
    pub(crate) fn sender(&self) -> mpsc::UnboundedSender<ManagerMessage> {
        self.tx.clone()
    }

    pub(crate) fn submit(&self, job: ValidationJob) -> Result<(), ValidationError> {
        self.tx
            .send(ManagerMessage::Submit(Box::new(job)))
            .map_err(|_| ValidationError::ManagerStopped(self.token_id.to_string()))
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub(crate) fn shutdown(&self) {
        // already gone is fine
        let _ = self.tx.send(ManagerMessage::Shutdown);
    }
}

pub(crate) struct JobManager {
    graph: TokenGraph,
    env: JobEnv,
    jobs: VecDeque<ValidationJob>,
    parent_waiters: HashMap<Hash, Vec<JobId>>,
    rx: mpsc::UnboundedReceiver<ManagerMessage>,
    reply_tx: mpsc::WeakUnboundedSender<ManagerMessage>,
    parents: Weak<dyn ParentValidation>,
}

impl JobManager {
    /// Start a manager task for `graph` on `runtime`.
    pub(crate) fn spawn(
        runtime: &tokio::runtime::Handle,
        graph: TokenGraph,
        env: JobEnv,
        parents: Weak<dyn ParentValidation>,
    ) -> ManagerHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let token_id = graph.token_id();
        let manager = JobManager {
            graph,
            env,
            jobs: VecDeque::new(),
            parent_waiters: HashMap::new(),
            rx,
            reply_tx: tx.downgrade(),
            parents,
        };
        runtime.spawn(manager.run());
        ManagerHandle { token_id, tx }
    }

    async fn run(mut self) {
        let token_id = self.graph.token_id();
        info!(token_id = %token_id, "job manager started");

        loop {
            loop {
                match self.rx.try_recv() {
                    Ok(msg) => {
                        if !self.handle(msg) {
                            return self.stop("graph reset");
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => return self.stop("graph dropped"),
                }
            }

            let Some(index) = self.jobs.iter().position(|j| !j.is_paused()) else {
                match self.rx.recv().await {
                    Some(msg) => {
                        if !self.handle(msg) {
                            return self.stop("graph reset");
                        }
                    }
                    None => return self.stop("graph dropped"),
                }
                continue;
            };

            let Some(mut job) = self.jobs.remove(index) else {
                continue;
            };
            if *job.status() != JobStatus::Running {
                job.set_status(JobStatus::Running);
            }

            match job.step(&mut self.graph, &self.env).await {
                StepOutcome::Continue => self.jobs.insert(index, job),
                StepOutcome::Completed => job.finish(&self.graph, JobOutcome::Complete),
                StepOutcome::BudgetExhausted => job.finish(&self.graph, JobOutcome::BudgetExhausted),
                StepOutcome::Failed(e) => {
                    warn!(token_id = %token_id, job = %job.id(), error = %e, "validation job failed");
                    job.finish(&self.graph, JobOutcome::Failed(e.to_string()));
                }
                StepOutcome::AwaitParent(request) => {
                    let parent_txid = request.parent_txid;
                    if let Some(nft) = self.graph.validator_mut().as_nft_mut() {
                        nft.set_parent_state(NftParentState::Awaiting { parent_txid });
                    }
                    self.park(job, index, parent_txid);
                    self.dispatch_parent(request);
                }
                StepOutcome::JoinParent(parent_txid) => self.park(job, index, parent_txid),
            }

            tokio::task::yield_now().await;
        }
    }

    /// Pause a job until its group parent resolves.
    fn park(&mut self, mut job: ValidationJob, index: usize, parent_txid: Hash) {
        debug!(job = %job.id(), parent = %parent_txid, "waiting on NFT1 group parent");
        job.set_status(JobStatus::Paused(PauseReason::AwaitingParent { parent_txid }));
        self.parent_waiters.entry(parent_txid).or_default().push(job.id());
        self.jobs.insert(index, job);
    }

    fn dispatch_parent(&mut self, request: ParentRequest) {
        let parent_txid = request.parent_txid;
        match (self.parents.upgrade(), self.reply_tx.upgrade()) {
            (Some(parents), Some(reply)) => parents.validate_parent(request, reply),
            _ => {
                warn!(parent = %parent_txid, "engine gone; NFT1 parent left unknown");
                self.resolve_parent(parent_txid, Some(request.group_id), Validity::Unknown);
            }
        }
    }

    fn resolve_parent(&mut self, parent_txid: Hash, group_id: Option<TokenId>, validity: Validity) {
        info!(
            token_id = %self.graph.token_id(),
            parent = %parent_txid,
            validity = validity.code(),
            "NFT1 group parent resolved"
        );
        let state = if validity == Validity::Unknown {
            NftParentState::Unresolved
        } else {
            NftParentState::Resolved { parent_txid, group_id, validity }
        };
        if let Some(nft) = self.graph.validator_mut().as_nft_mut() {
            nft.set_parent_state(state);
        }

        let info = NftParentInfo { parent_txid, group_id, validity };
        for id in self.parent_waiters.remove(&parent_txid).unwrap_or_default() {
            if let Some(job) = self.jobs.iter_mut().find(|j| j.id() == id) {
                job.set_nft_parent(info);
                if matches!(job.status(), JobStatus::Paused(PauseReason::AwaitingParent { .. })) {
                    job.set_status(JobStatus::Running);
                }
            }
        }
    }

    /// Apply a control message. Returns false on shutdown.
    fn handle(&mut self, msg: ManagerMessage) -> bool {
        match msg {
            ManagerMessage::Submit(job) => {
                debug!(token_id = %self.graph.token_id(), job = %job.id(), "job queued");
                self.jobs.push_back(*job);
            }
            ManagerMessage::Pause(id) => match self.jobs.iter_mut().find(|j| j.id() == id) {
                Some(job) if matches!(job.status(), JobStatus::Pending | JobStatus::Running) => {
                    job.set_status(JobStatus::Paused(PauseReason::Requested));
                }
                Some(job) => debug!(job = %id, status = ?job.status(), "pause ignored"),
                None => debug!(job = %id, "pause for unknown or finished job"),
            },
            ManagerMessage::Resume(id) => match self.jobs.iter_mut().find(|j| j.id() == id) {
                Some(job) if *job.status() == JobStatus::Paused(PauseReason::Requested) => {
                    job.set_status(JobStatus::Running);
                }
                Some(job) => debug!(job = %id, status = ?job.status(), "resume ignored"),
                None => debug!(job = %id, "resume for unknown or finished job"),
            },
            ManagerMessage::ParentResolved { parent_txid, group_id, validity } => {
                self.resolve_parent(parent_txid, group_id, validity);
            }
            ManagerMessage::Shutdown => return false,
        }
        true
    }

    /// Fail every remaining job and exit.
    fn stop(mut self, reason: &str) {
        info!(token_id = %self.graph.token_id(), remaining = self.jobs.len(), reason, "job manager stopping");
        while let Some(job) = self.jobs.pop_front() {
            job.finish(&self.graph, JobOutcome::Failed(reason.to_string()));
        }
    }
}
