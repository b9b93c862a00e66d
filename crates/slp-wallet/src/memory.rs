//! In-memory [`WalletView`].

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use slp_primitives::Hash;
use slp_script::TokenId;
use slp_transaction::{OutPoint, Transaction};
use slp_validator::Validity;

use crate::types::{SpendableTokenCoin, TokenInfo};
use crate::wallet_view::WalletView;

#[derive(Debug, Default)]
struct MemoryState {
    transactions: HashMap<Hash, Transaction>,
    tokens: HashMap<TokenId, TokenInfo>,
    coins: HashMap<OutPoint, SpendableTokenCoin>,
    validity: HashMap<Hash, Validity>,
}

/// A wallet kept entirely in memory.
///
/// Persisted validity also updates the coins created by that transaction.
#[derive(Debug, Default)]
pub struct MemoryWallet {
    state: Mutex<MemoryState>,
}

impl MemoryWallet {
    /// An empty wallet.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Remember a transaction.
    pub fn add_transaction(&self, tx: Transaction) {
        self.lock().transactions.insert(tx.tx_id(), tx);
    }

    /// Register token metadata.
    pub fn add_token(&self, token_id: TokenId, info: TokenInfo) {
        self.lock().tokens.insert(token_id, info);
    }

    /// Index a token-tagged coin.
    pub fn add_coin(&self, coin: SpendableTokenCoin) {
        self.lock().coins.insert(coin.outpoint, coin);
    }

    /// Drop a coin from the index (spent).
    pub fn remove_coin(&self, outpoint: &OutPoint) -> Option<SpendableTokenCoin> {
        self.lock().coins.remove(outpoint)
    }

    /// Freeze or unfreeze a coin.
    pub fn set_frozen(&self, outpoint: &OutPoint, frozen: bool) -> bool {
        match self.lock().coins.get_mut(outpoint) {
            Some(coin) => {
                coin.frozen = frozen;
                true
            }
            None => false,
        }
    }

    /// Persisted validity of a transaction.
    pub fn validity(&self, txid: &Hash) -> Validity {
        self.lock().validity.get(txid).copied().unwrap_or_default()
    }
}

impl WalletView for MemoryWallet {
    fn get_transaction(&self, txid: &Hash) -> Option<Transaction> {
        self.lock().transactions.get(txid).cloned()
    }

    fn token_info(&self, token_id: &TokenId) -> Option<TokenInfo> {
        self.lock().tokens.get(token_id).cloned()
    }

    fn token_coin(&self, outpoint: &OutPoint) -> Option<SpendableTokenCoin> {
        self.lock().coins.get(outpoint).cloned()
    }

    fn token_coins(&self, token_id: &TokenId) -> Vec<SpendableTokenCoin> {
        let mut coins: Vec<SpendableTokenCoin> =
            self.lock().coins.values().filter(|c| c.token_id == *token_id).cloned().collect();
        coins.sort_by_key(|c| c.outpoint);
        coins
    }

    fn set_validity(&self, txid: Hash, validity: Validity) {
        let mut state = self.lock();
        state.validity.insert(txid, validity);
        for coin in state.coins.values_mut().filter(|c| c.outpoint.txid == txid) {
            coin.validity = validity;
        }
    }

    fn set_token_info(&self, token_id: TokenId, info: TokenInfo) {
        self.lock().tokens.insert(token_id, info);
    }
}
