//! Token coin selection for outgoing payments.
//!
//! Selection never spends more than the wallet validly owns: it is checked
//! against the valid balance first, then against the spendable part of it,
//! and only then are coins picked, smallest first.

use slp_script::{build_send_script, Script, TokenId, TokenType};
use tracing::debug;

use crate::config::SelectionConfig;
use crate::error::WalletError;
use crate::types::SpendableTokenCoin;
use crate::wallet_view::WalletView;

/// Coins picked for a payment and the SEND message that spends them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinSelection {
    /// Coins to spend, smallest first.
    pub coins: Vec<SpendableTokenCoin>,
    /// Sum of the selected coins.
    pub total: u128,
    /// Declared SEND amounts: `[amount]` or `[amount, change]`.
    pub amounts: Vec<u64>,
    /// Token change returned to the wallet.
    pub change: u64,
    /// The SEND OP_RETURN, `None` when nothing was selected.
    pub op_return: Option<Script>,
}

/// Pick coins paying `amount` of `token_id`.
///
/// # Errors
/// - [`WalletError::NotEnoughFunds`] if `amount` exceeds the valid balance.
/// - [`WalletError::NotEnoughUnfrozenFunds`] if the valid balance covers
///   `amount` but its spendable part does not.
pub fn select_coins(
    wallet: &dyn WalletView,
    token_id: &TokenId,
    amount: u64,
    config: &SelectionConfig,
) -> Result<CoinSelection, WalletError> {
    let coins = pick(wallet, token_id, amount as u128, config)?;
    let total: u128 = coins.iter().map(|c| c.amount() as u128).sum();

    if total == 0 {
        return Ok(CoinSelection { coins, total, amounts: Vec::new(), change: 0, op_return: None });
    }

    let change = change_amount(total, amount as u128)?;
    let mut amounts = vec![amount];
    if change > 0 {
        amounts.push(change);
    }
    let token_type = token_type(wallet, token_id);
    let op_return = build_send_script(token_type, *token_id, &amounts)?;

    debug!(
        token_id = %token_id,
        amount,
        coins = coins.len(),
        change,
        "selected token coins"
    );
    Ok(CoinSelection { coins, total, amounts, change, op_return: Some(op_return) })
}

/// Balance checks plus the smallest-first walk. Shared with postage
/// selection, which builds its own SEND message.
pub(crate) fn pick(
    wallet: &dyn WalletView,
    token_id: &TokenId,
    amount: u128,
    config: &SelectionConfig,
) -> Result<Vec<SpendableTokenCoin>, WalletError> {
    let balance = wallet.token_balance(token_id, config);
    if amount > balance.valid {
        return Err(WalletError::NotEnoughFunds { required: amount, available: balance.valid });
    }
    if amount > balance.unfrozen {
        return Err(WalletError::NotEnoughUnfrozenFunds { required: amount, unfrozen: balance.unfrozen });
    }

    let mut candidates = wallet.spendable_coins(token_id, config);
    candidates.sort_by_key(|c| (c.amount(), c.outpoint));

    let mut selected = Vec::new();
    let mut total: u128 = 0;
    for coin in candidates {
        if total >= amount {
            break;
        }
        total += coin.amount() as u128;
        selected.push(coin);
    }

    // the wallet's balance and coin listing disagree
    if total < amount {
        return Err(WalletError::NotEnoughUnfrozenFunds { required: amount, unfrozen: total });
    }
    Ok(selected)
}

pub(crate) fn change_amount(total: u128, spent: u128) -> Result<u64, WalletError> {
    u64::try_from(total.saturating_sub(spent))
        .map_err(|_| WalletError::AmountOverflow(format!("change of {} does not fit 8 bytes", total - spent)))
}

pub(crate) fn token_type(wallet: &dyn WalletView, token_id: &TokenId) -> TokenType {
    wallet.token_info(token_id).map(|i| i.class).unwrap_or(TokenType::Fungible)
}
