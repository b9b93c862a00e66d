//! Token identifier type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use slp_primitives::{Hash, PrimitivesError};

/// A token identifier: the id of the token's GENESIS transaction.
///
/// Immutable once assigned; used as the key of a token graph and of every
/// per-token wallet index.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(Hash);

impl TokenId {
    /// Wrap a genesis transaction id.
    pub const fn new(genesis_txid: Hash) -> Self {
        TokenId(genesis_txid)
    }

    /// The genesis transaction id this token is named after.
    pub fn genesis_txid(&self) -> Hash {
        self.0
    }

    /// Parse a token id from its 64-character hex form.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        Ok(TokenId(Hash::from_hex(hex_str)?))
    }

    /// Bytes as they appear inside an OP_RETURN message (display order).
    pub fn to_message_bytes(&self) -> [u8; 32] {
        self.0.to_display_bytes()
    }
}

impl From<Hash> for TokenId {
    fn from(h: Hash) -> Self {
        TokenId(h)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenId({})", self.0)
    }
}

impl FromStr for TokenId {
    type Err = PrimitivesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TokenId::from_hex(s)
    }
}
