#![deny(missing_docs)]

//! SLP token toolkit.
//!
//! Re-exports every component for single-crate usage: the codec layers,
//! the ancestor sources (cache, fetcher, graph search, proxy), the
//! validation engine and the wallet layer.

pub use slp_graph as graph;
pub use slp_primitives as primitives;
pub use slp_script as script;
pub use slp_transaction as transaction;
pub use slp_validator as validator;
pub use slp_wallet as wallet;

pub mod logging;
