//! Pre-broadcast conservation check.
//!
//! The last gate before a transaction is signed or broadcast: it must not
//! counterfeit tokens and must not destroy any token coin the caller did
//! not explicitly approve for burning.
//!
//! | transaction       | token-tagged inputs allowed                              |
//! |-------------------|----------------------------------------------------------|
//! | not SLP / COMMIT  | approved burns only                                      |
//! | SEND              | amounts of the declared token summing exactly to the outputs, plus approved burns |
//! | GENESIS           | approved burns; NFT1 child input 0 may be a group coin   |
//! | MINT              | at least one baton of the token, plus approved burns     |

use std::collections::HashSet;

use slp_script::{SlpMessage, SlpPayload, TokenId, TokenType};
use slp_transaction::{OutPoint, Transaction};
use tracing::{debug, warn};

use crate::types::SpendableTokenCoin;
use crate::wallet_view::WalletView;

/// Conservation violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlpCheckError {
    /// A non-SLP transaction spends an unapproved token coin.
    #[error("non-SLP transaction spends token coin {0}")]
    NonSlpTransactionHasSlpInputs(OutPoint),

    /// An approved burn coin is not spent by the transaction.
    #[error("coin {0} approved for burning is not an input")]
    MissingCoinToBeBurned(OutPoint),

    /// A SEND spends a coin of another token.
    #[error("input {outpoint} belongs to token {found}, SEND is for {expected}")]
    SlpWrongTokenInput {
        /// The offending input.
        outpoint: OutPoint,
        /// The SEND's token.
        expected: TokenId,
        /// The coin's token.
        found: TokenId,
    },

    /// Token inputs are below the declared outputs.
    #[error("token inputs {inputs} are below declared outputs {outputs}")]
    SlpInputsTooLow {
        /// Sum of token inputs.
        inputs: u128,
        /// Sum of declared outputs.
        outputs: u128,
    },

    /// Token inputs exceed the declared outputs beyond the approved burns.
    #[error("token inputs {inputs} exceed declared outputs {outputs} (approved burn {burned})")]
    SlpInputsTooHigh {
        /// Sum of token inputs.
        inputs: u128,
        /// Sum of declared outputs.
        outputs: u128,
        /// Approved burn amount.
        burned: u128,
    },

    /// A SEND spends an unapproved minting baton.
    #[error("SEND spends minting baton {0}")]
    SendSpendsBaton(OutPoint),

    /// A GENESIS spends an unapproved token coin.
    #[error("GENESIS spends token coin {0}")]
    GenesisSpendsTokenInput(OutPoint),

    /// A MINT spends an unapproved coin that is not its own baton.
    #[error("MINT spends token coin {0} that is not its minting baton")]
    MintSpendsTokenInput(OutPoint),

    /// A MINT spends no baton of its token.
    #[error("MINT spends no minting baton of token {0}")]
    MintWithoutBaton(TokenId),
}

/// Check that `tx` neither counterfeits nor silently destroys tokens.
///
/// `coins_to_burn` lists token coins the caller approved for destruction;
/// each must be spent by `tx`.
pub fn check_tx_slp(
    wallet: &dyn WalletView,
    tx: &Transaction,
    coins_to_burn: &[OutPoint],
) -> Result<(), SlpCheckError> {
    let burns: HashSet<OutPoint> = coins_to_burn.iter().copied().collect();
    let spent: HashSet<OutPoint> = tx.inputs.iter().map(|i| i.outpoint()).collect();
    if let Some(missing) = coins_to_burn.iter().find(|c| !spent.contains(*c)) {
        warn!(outpoint = %missing, "SLP check failed: burn coin not spent");
        return Err(SlpCheckError::MissingCoinToBeBurned(*missing));
    }

    let inputs: Vec<(OutPoint, Option<SpendableTokenCoin>)> = tx
        .inputs
        .iter()
        .map(|i| {
            let op = i.outpoint();
            (op, wallet.token_coin(&op))
        })
        .collect();

    let result = match tx.slp_message() {
        Ok(msg) => check_slp(wallet, &msg, &inputs, &burns),
        // anything unparsable burns whatever token inputs it spends
        Err(_) => only_burns(&inputs, &burns, SlpCheckError::NonSlpTransactionHasSlpInputs),
    };

    match &result {
        Ok(()) => debug!(txid = %tx.tx_id(), "SLP check passed"),
        Err(e) => warn!(txid = %tx.tx_id(), error = %e, "SLP check failed"),
    }
    result
}

fn check_slp(
    wallet: &dyn WalletView,
    msg: &SlpMessage,
    inputs: &[(OutPoint, Option<SpendableTokenCoin>)],
    burns: &HashSet<OutPoint>,
) -> Result<(), SlpCheckError> {
    match &msg.payload {
        SlpPayload::Send(send) => check_send(send.token_id, &send.amounts, inputs, burns),
        SlpPayload::Genesis(_) => {
            for (index, (op, coin)) in inputs.iter().enumerate() {
                let Some(coin) = coin else { continue };
                if burns.contains(op) {
                    continue;
                }
                let group_parent = index == 0
                    && msg.token_type == TokenType::Nft1Child
                    && !coin.is_baton()
                    && wallet.token_info(&coin.token_id).is_some_and(|i| i.class == TokenType::Nft1Group);
                if !group_parent {
                    return Err(SlpCheckError::GenesisSpendsTokenInput(*op));
                }
            }
            Ok(())
        }
        SlpPayload::Mint(mint) => {
            let mut batons = 0;
            for (op, coin) in inputs {
                let Some(coin) = coin else { continue };
                if coin.is_baton() && coin.token_id == mint.token_id {
                    batons += 1;
                } else if !burns.contains(op) {
                    return Err(SlpCheckError::MintSpendsTokenInput(*op));
                }
            }
            if batons == 0 {
                return Err(SlpCheckError::MintWithoutBaton(mint.token_id));
            }
            Ok(())
        }
        SlpPayload::Commit(_) => only_burns(inputs, burns, SlpCheckError::NonSlpTransactionHasSlpInputs),
    }
}

fn check_send(
    token_id: TokenId,
    amounts: &[u64],
    inputs: &[(OutPoint, Option<SpendableTokenCoin>)],
    burns: &HashSet<OutPoint>,
) -> Result<(), SlpCheckError> {
    let outputs: u128 = amounts.iter().map(|a| *a as u128).sum();
    let mut total: u128 = 0;
    let mut burned: u128 = 0;

    for (op, coin) in inputs {
        let Some(coin) = coin else { continue };
        let approved = burns.contains(op);
        if coin.token_id != token_id {
            if approved {
                continue;
            }
            return Err(SlpCheckError::SlpWrongTokenInput {
                outpoint: *op,
                expected: token_id,
                found: coin.token_id,
            });
        }
        if coin.is_baton() {
            if approved {
                continue;
            }
            return Err(SlpCheckError::SendSpendsBaton(*op));
        }
        total += coin.amount() as u128;
        if approved {
            burned += coin.amount() as u128;
        }
    }

    if total < outputs {
        return Err(SlpCheckError::SlpInputsTooLow { inputs: total, outputs });
    }
    if total > outputs && total - outputs != burned {
        return Err(SlpCheckError::SlpInputsTooHigh { inputs: total, outputs, burned });
    }
    Ok(())
}

fn only_burns(
    inputs: &[(OutPoint, Option<SpendableTokenCoin>)],
    burns: &HashSet<OutPoint>,
    err: fn(OutPoint) -> SlpCheckError,
) -> Result<(), SlpCheckError> {
    match inputs.iter().find(|(op, coin)| coin.is_some() && !burns.contains(op)) {
        Some((op, _)) => Err(err(*op)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryWallet;
    use crate::types::{CoinValue, TokenInfo};
    use slp_primitives::Hash;
    use slp_script::{build_mint_script, build_send_script, Script};
    use slp_transaction::{TransactionInput, TransactionOutput};
    use slp_validator::Validity;

    fn token(n: u8) -> TokenId {
        TokenId::new(Hash::new([n; 32]))
    }

    fn op(n: u8) -> OutPoint {
        OutPoint::new(Hash::new([n; 32]), 1)
    }

    fn add_coin(wallet: &MemoryWallet, n: u8, token_id: TokenId, value: CoinValue) {
        wallet.add_coin(SpendableTokenCoin {
            outpoint: op(n),
            address: "qrtest".to_string(),
            token_id,
            value,
            validity: Validity::Valid,
            frozen: false,
            confirmed: true,
        });
    }

    fn tx_with(spends: &[u8], op_return: Option<Script>) -> Transaction {
        let mut tx = Transaction::new();
        for n in spends {
            tx.add_input(TransactionInput::new(op(*n)));
        }
        if let Some(script) = op_return {
            tx.add_output(TransactionOutput::new(0, script));
        }
        tx.add_output(TransactionOutput::new(546, Script::new_p2pkh(&[2; 20])));
        tx
    }

    fn send(token_id: TokenId, amounts: &[u64]) -> Option<Script> {
        Some(build_send_script(TokenType::Fungible, token_id, amounts).unwrap())
    }

    #[test]
    fn test_non_slp_tx_with_token_input() {
        let wallet = MemoryWallet::new();
        add_coin(&wallet, 1, token(9), CoinValue::Amount(5));
        let tx = tx_with(&[1, 2], None);

        assert_eq!(
            check_tx_slp(&wallet, &tx, &[]),
            Err(SlpCheckError::NonSlpTransactionHasSlpInputs(op(1)))
        );
        assert_eq!(check_tx_slp(&wallet, &tx, &[op(1)]), Ok(()));
    }

    #[test]
    fn test_burn_coin_must_be_spent() {
        let wallet = MemoryWallet::new();
        let tx = tx_with(&[2], None);
        assert_eq!(
            check_tx_slp(&wallet, &tx, &[op(3)]),
            Err(SlpCheckError::MissingCoinToBeBurned(op(3)))
        );
    }

    #[test]
    fn test_send_wrong_token_input() {
        let wallet = MemoryWallet::new();
        add_coin(&wallet, 1, token(9), CoinValue::Amount(5));
        add_coin(&wallet, 2, token(8), CoinValue::Amount(5));
        let tx = tx_with(&[1, 2], send(token(9), &[5]));
        assert!(matches!(
            check_tx_slp(&wallet, &tx, &[]),
            Err(SlpCheckError::SlpWrongTokenInput { found, .. }) if found == token(8)
        ));
    }

    #[test]
    fn test_send_spending_baton_needs_approval() {
        let wallet = MemoryWallet::new();
        add_coin(&wallet, 1, token(9), CoinValue::Amount(5));
        add_coin(&wallet, 2, token(9), CoinValue::MintBaton);
        let tx = tx_with(&[1, 2], send(token(9), &[5]));
        assert_eq!(check_tx_slp(&wallet, &tx, &[]), Err(SlpCheckError::SendSpendsBaton(op(2))));
        assert_eq!(check_tx_slp(&wallet, &tx, &[op(2)]), Ok(()));
    }

    #[test]
    fn test_send_partial_burn_must_match_exactly() {
        let wallet = MemoryWallet::new();
        add_coin(&wallet, 1, token(9), CoinValue::Amount(5));
        add_coin(&wallet, 2, token(9), CoinValue::Amount(3));
        let tx = tx_with(&[1, 2], send(token(9), &[5]));

        assert!(matches!(check_tx_slp(&wallet, &tx, &[]), Err(SlpCheckError::SlpInputsTooHigh { .. })));
        assert_eq!(check_tx_slp(&wallet, &tx, &[op(2)]), Ok(()));
        // the approved burn has to equal the excess
        assert!(matches!(check_tx_slp(&wallet, &tx, &[op(1)]), Err(SlpCheckError::SlpInputsTooHigh { .. })));
    }

    #[test]
    fn test_genesis_rules() {
        let wallet = MemoryWallet::new();
        let group = token(4);
        wallet.add_token(
            group,
            TokenInfo { class: TokenType::Nft1Group, name: "group".into(), decimals: 0, group_id: None },
        );
        add_coin(&wallet, 1, group, CoinValue::Amount(1));
        add_coin(&wallet, 2, token(9), CoinValue::Amount(5));

        let fields = slp_script::GenesisFields {
            ticker: Vec::new(),
            name: Vec::new(),
            document_url: Vec::new(),
            document_hash: None,
            decimals: 0,
            mint_baton_vout: None,
            initial_quantity: 1,
        };
        let child = slp_script::build_genesis_script(TokenType::Nft1Child, fields.clone()).unwrap();
        let fungible = slp_script::build_genesis_script(TokenType::Fungible, fields).unwrap();

        assert_eq!(check_tx_slp(&wallet, &tx_with(&[1], Some(child.clone())), &[]), Ok(()));
        assert_eq!(
            check_tx_slp(&wallet, &tx_with(&[1], Some(fungible)), &[]),
            Err(SlpCheckError::GenesisSpendsTokenInput(op(1)))
        );
        assert_eq!(
            check_tx_slp(&wallet, &tx_with(&[1, 2], Some(child)), &[]),
            Err(SlpCheckError::GenesisSpendsTokenInput(op(2)))
        );
    }

    #[test]
    fn test_mint_rules() {
        let wallet = MemoryWallet::new();
        add_coin(&wallet, 1, token(9), CoinValue::MintBaton);
        add_coin(&wallet, 2, token(9), CoinValue::Amount(5));
        let mint = Some(build_mint_script(TokenType::Fungible, token(9), Some(2), 100).unwrap());

        assert_eq!(check_tx_slp(&wallet, &tx_with(&[1], mint.clone()), &[]), Ok(()));
        assert_eq!(
            check_tx_slp(&wallet, &tx_with(&[1, 2], mint.clone()), &[]),
            Err(SlpCheckError::MintSpendsTokenInput(op(2)))
        );
        assert_eq!(
            check_tx_slp(&wallet, &tx_with(&[3], mint), &[]),
            Err(SlpCheckError::MintWithoutBaton(token(9)))
        );
    }
}
