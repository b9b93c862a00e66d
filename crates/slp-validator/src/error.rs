//! Error types for the validation engine.

use slp_graph::GraphError;
use slp_primitives::Hash;
use slp_transaction::TransactionError;

/// Errors surfaced by validation jobs and the engine around them.
///
/// Inside a job these are resource errors: the job ends with the error
/// recorded and undecided transactions stay [`Unknown`](crate::Validity::Unknown).
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// A fetch-layer failure (indexer, raw-tx API, proxy).
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A fetched transaction could not be decoded.
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// No source could supply a transaction.
    #[error("transaction {0} unavailable from every source")]
    Unavailable(Hash),

    /// The job manager for the token graph has shut down.
    #[error("job manager for token {0} is not running")]
    ManagerStopped(String),

    /// The job was dropped before it reported a result.
    #[error("validation job was dropped before completion")]
    JobDropped,

    /// Jobs can only be started from inside a Tokio runtime.
    #[error("no Tokio runtime available to run the job manager")]
    NoRuntime,
}
