//! # slp-validator
//!
//! Provenance validation of SLP token transactions.
//!
//! A transaction is valid only if the chain of token transactions back to
//! the token's GENESIS is valid. The engine keeps one in-memory
//! [`TokenGraph`] per token, each driven by a job manager task that runs
//! [`ValidationJob`]s one at a time. Jobs walk ancestors, fetch what is
//! missing (graph search, then per-transaction), and decide validity
//! bottom-up using the token's [`Validator`] rules.
//!
//! NFT1 child tokens (type 65) also require their genesis to spend a valid
//! NFT1 group (type 129) output. The child job pauses while a nested job
//! validates the parent on the group's graph, then resumes.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use slp_graph::{CacheConfig, ExpiringTxCache, RestTxFetcher, TxFetcherConfig};
//! use slp_transaction::Transaction;
//! use slp_validator::{GraphContext, JobOptions, ValidationConfig};
//!
//! # async fn run(tx: Transaction) -> Result<(), slp_validator::ValidationError> {
//! let cache = Arc::new(ExpiringTxCache::new(&CacheConfig::default()));
//! let context = GraphContext::builder(ValidationConfig::default(), cache)
//!     .fetcher(Arc::new(RestTxFetcher::new(TxFetcherConfig::default())))
//!     .build();
//!
//! if let Some(job) = context.make_job(&tx, JobOptions::default())? {
//!     let result = job.wait().await?;
//!     println!("valid: {}", result.is_valid());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod graph;
pub mod job;
mod manager;
pub mod validator;
pub mod validity;

#[cfg(test)]
mod tests;

pub use config::ValidationConfig;
pub use context::{GraphContext, GraphContextBuilder};
pub use error::ValidationError;
pub use graph::{TokenGraph, ValidationNode};
pub use job::{
    FetchHook, JobCallback, JobHandle, JobId, JobOptions, JobOutcome, JobResult, JobStatus,
    NftParentInfo, PauseReason, ValidationJob,
};
pub use validator::{
    FungibleValidator, NftParentState, NftValidator, Validator, ValidatorRules, Verdict,
};
pub use validity::Validity;
