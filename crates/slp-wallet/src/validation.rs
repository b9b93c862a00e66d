//! Wallet-driven validation.
//!
//! [`SlpWallet`] pairs a [`WalletView`] with a [`GraphContext`]: the
//! wallet's own transactions feed every job before anything is downloaded,
//! and finished jobs write their verdicts back into the wallet.

use std::sync::Arc;

use slp_primitives::Hash;
use slp_script::{TokenId, TokenType};
use slp_transaction::{OutPoint, Transaction};
use slp_validator::{FetchHook, GraphContext, JobHandle, JobOptions, JobResult, NftParentInfo, Validity};
use tracing::{debug, info};

use crate::checker::check_tx_slp;
use crate::coin_chooser::{select_coins, CoinSelection};
use crate::config::SelectionConfig;
use crate::error::WalletError;
use crate::types::{TokenBalance, TokenInfo};
use crate::wallet_view::WalletView;

/// Token operations over one wallet.
pub struct SlpWallet<W: WalletView + 'static> {
    wallet: Arc<W>,
    context: GraphContext,
    selection: SelectionConfig,
}

impl<W: WalletView + 'static> SlpWallet<W> {
    /// Wrap a wallet and the validation engine it should use.
    pub fn new(wallet: Arc<W>, context: GraphContext, selection: SelectionConfig) -> Self {
        Self { wallet, context, selection }
    }

    /// The wrapped wallet.
    pub fn wallet(&self) -> &Arc<W> {
        &self.wallet
    }

    /// The validation engine.
    pub fn context(&self) -> &GraphContext {
        &self.context
    }

    /// Coin selection settings.
    pub fn selection(&self) -> &SelectionConfig {
        &self.selection
    }

    /// Start validating `tx`.
    ///
    /// Every non-Unknown verdict the job reaches is persisted through
    /// [`WalletView::set_validity`] before the handle resolves. For NFT1
    /// children the group id is recorded on the child's token metadata, and
    /// an unknown group gets a `<child name>-parent` placeholder entry.
    ///
    /// Returns `Ok(None)` when `tx` carries nothing to validate.
    pub fn validate_transaction(
        &self,
        tx: &Transaction,
        reset: bool,
    ) -> Result<Option<JobHandle>, WalletError> {
        let wallet = Arc::clone(&self.wallet);
        let hook: FetchHook = Arc::new(move |ids: &[Hash]| -> Vec<Transaction> {
            ids.iter().filter_map(|id| wallet.get_transaction(id)).collect()
        });

        let wallet = Arc::clone(&self.wallet);
        let options = JobOptions { reset, ..JobOptions::default() }
            .with_hook(hook)
            .on_done(move |result| persist(wallet.as_ref(), result));

        let job = self.context.make_job(tx, options)?;
        if let Some(job) = &job {
            debug!(txid = %tx.tx_id(), token_id = %job.token_id(), job = %job.id(), "wallet validation started");
        }
        Ok(job)
    }

    /// Balance summary of a token.
    pub fn token_balance(&self, token_id: &TokenId) -> TokenBalance {
        self.wallet.token_balance(token_id, &self.selection)
    }

    /// Pick coins paying `amount` of `token_id`.
    pub fn select_coins(&self, token_id: &TokenId, amount: u64) -> Result<CoinSelection, WalletError> {
        select_coins(self.wallet.as_ref(), token_id, amount, &self.selection)
    }

    /// Conservation check of a transaction about to be signed.
    pub fn check_transaction(&self, tx: &Transaction, coins_to_burn: &[OutPoint]) -> Result<(), WalletError> {
        check_tx_slp(self.wallet.as_ref(), tx, coins_to_burn)?;
        Ok(())
    }
}

fn persist(wallet: &dyn WalletView, result: &JobResult) {
    let mut persisted = 0;
    for (txid, validity) in &result.nodes {
        if *validity != Validity::Unknown {
            wallet.set_validity(*txid, *validity);
            persisted += 1;
        }
    }

    // only a validated group parent has a verdict of its own
    if let Some(NftParentInfo { parent_txid, group_id: Some(group_id), validity }) = result.nft_parent {
        if validity != Validity::Unknown {
            wallet.set_validity(parent_txid, validity);
        }
        record_group(wallet, result.token_id, group_id);
    }

    info!(
        token_id = %result.token_id,
        job = %result.job_id,
        persisted,
        valid = result.is_valid(),
        "validation verdicts persisted"
    );
}

fn record_group(wallet: &dyn WalletView, child: TokenId, group_id: TokenId) {
    let mut info = wallet.token_info(&child).unwrap_or_else(|| TokenInfo {
        class: TokenType::Nft1Child,
        name: child.to_string(),
        decimals: 0,
        group_id: None,
    });

    if wallet.token_info(&group_id).is_none() {
        // group decimals are not known from the child side
        wallet.set_token_info(
            group_id,
            TokenInfo { class: TokenType::Nft1Group, name: format!("{}-parent", info.name), decimals: 0, group_id: None },
        );
    }

    if info.group_id != Some(group_id) {
        info.group_id = Some(group_id);
        wallet.set_token_info(child, info);
    }
}
