//! Wallet-side token types: token metadata, token-tagged coins, balances.

use serde::{Deserialize, Serialize};
use slp_script::{TokenId, TokenType};
use slp_transaction::OutPoint;
use slp_validator::Validity;

/// Token metadata a wallet keeps per token id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Token class (SLP1, SLP65, SLP129).
    pub class: TokenType,
    /// Display name.
    pub name: String,
    /// Decimal places.
    pub decimals: u8,
    /// For NFT1 children: the group token they were minted from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<TokenId>,
}

/// What a token-tagged coin holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoinValue {
    /// Token amount in base units.
    Amount(u64),
    /// The token's minting baton.
    MintBaton,
}

/// A coin carrying token value, as indexed by the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendableTokenCoin {
    /// The coin.
    pub outpoint: OutPoint,
    /// Owning address.
    pub address: String,
    /// Token the coin belongs to.
    pub token_id: TokenId,
    /// Amount or baton.
    pub value: CoinValue,
    /// Validity of the transaction that created the coin.
    pub validity: Validity,
    /// Frozen by the user.
    pub frozen: bool,
    /// Mined.
    pub confirmed: bool,
}

impl SpendableTokenCoin {
    /// Token amount, zero for a baton.
    pub fn amount(&self) -> u64 {
        match self.value {
            CoinValue::Amount(a) => a,
            CoinValue::MintBaton => 0,
        }
    }

    /// True for a minting baton.
    pub fn is_baton(&self) -> bool {
        self.value == CoinValue::MintBaton
    }
}

/// Per-token balance summary.
///
/// `unfrozen + frozen == valid`. Unfrozen only counts coins that may be
/// spent under the selection config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    /// Sum of coins created by Valid transactions.
    pub valid: u128,
    /// Sum of coins whose validity is still Unknown.
    pub unvalidated: u128,
    /// Sum of coins created by invalid transactions.
    pub invalid: u128,
    /// Spendable part of `valid`.
    pub unfrozen: u128,
    /// Frozen (or, with `confirmed_only`, unconfirmed) part of `valid`.
    pub frozen: u128,
}
