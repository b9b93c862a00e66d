//! The wallet collaborator the token layer reads from and writes to.

use slp_primitives::Hash;
use slp_script::TokenId;
use slp_transaction::{OutPoint, Transaction};
use slp_validator::Validity;

use crate::config::SelectionConfig;
use crate::types::{SpendableTokenCoin, TokenBalance, TokenInfo};

/// What the token layer needs from a wallet.
///
/// Storage, keys and addresses stay behind this trait. Write methods take
/// `&self` because validation callbacks persist verdicts from the engine's
/// worker tasks; implementations use interior mutability.
pub trait WalletView: Send + Sync {
    // === Reads ===

    /// A transaction the wallet already has.
    fn get_transaction(&self, txid: &Hash) -> Option<Transaction>;

    /// Metadata of a token.
    fn token_info(&self, token_id: &TokenId) -> Option<TokenInfo>;

    /// The token-tagged coin at `outpoint`, if the wallet indexed one.
    fn token_coin(&self, outpoint: &OutPoint) -> Option<SpendableTokenCoin>;

    /// Every indexed coin of a token, spent coins excluded.
    fn token_coins(&self, token_id: &TokenId) -> Vec<SpendableTokenCoin>;

    // === Writes ===

    /// Persist a transaction's resolved validity.
    fn set_validity(&self, txid: Hash, validity: Validity);

    /// Persist token metadata.
    fn set_token_info(&self, token_id: TokenId, info: TokenInfo);

    // === Derived ===

    /// Balance summary of a token.
    fn token_balance(&self, token_id: &TokenId, config: &SelectionConfig) -> TokenBalance {
        let mut balance = TokenBalance::default();
        for coin in self.token_coins(token_id) {
            let amount = coin.amount() as u128;
            match coin.validity {
                Validity::Valid => {
                    balance.valid += amount;
                    if is_spendable(&coin, config) {
                        balance.unfrozen += amount;
                    } else {
                        balance.frozen += amount;
                    }
                }
                Validity::Unknown => balance.unvalidated += amount,
                _ => balance.invalid += amount,
            }
        }
        balance
    }

    /// Valid, unfrozen amount coins of a token (no batons).
    fn spendable_coins(&self, token_id: &TokenId, config: &SelectionConfig) -> Vec<SpendableTokenCoin> {
        self.token_coins(token_id)
            .into_iter()
            .filter(|c| c.validity.is_valid() && !c.is_baton() && is_spendable(c, config))
            .collect()
    }
}

fn is_spendable(coin: &SpendableTokenCoin, config: &SelectionConfig) -> bool {
    !coin.frozen && (coin.confirmed || !config.confirmed_only)
}
