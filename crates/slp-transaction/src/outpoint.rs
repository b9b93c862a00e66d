//! Reference to a single transaction output.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use slp_primitives::Hash;

use crate::TransactionError;

/// A `(txid, vout)` pair identifying one output of one transaction.
///
/// Displayed and parsed as `txid:vout`, the form wallets use as a coin key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutPoint {
    /// Transaction id of the output's transaction.
    pub txid: Hash,
    /// Output index.
    pub vout: u32,
}

impl OutPoint {
    /// Create a new outpoint.
    pub fn new(txid: Hash, vout: u32) -> Self {
        OutPoint { txid, vout }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

impl FromStr for OutPoint {
    type Err = TransactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (txid, vout) = s
            .split_once(':')
            .ok_or_else(|| TransactionError::SerializationError(format!("bad outpoint {s}")))?;
        let vout = vout
            .parse::<u32>()
            .map_err(|e| TransactionError::SerializationError(format!("bad vout in {s}: {e}")))?;
        Ok(OutPoint { txid: Hash::from_hex(txid)?, vout })
    }
}
