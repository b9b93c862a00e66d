//! Validator variants.
//!
//! A validator answers two questions about one transaction of its token:
//!
//! 1. [`classify`](ValidatorRules::classify): looking at the transaction
//!    alone, is it prunable, and if not, which inputs must be examined, what
//!    must they contribute, and what does it declare per output?
//! 2. [`validate`](ValidatorRules::validate): given what is currently known
//!    about the examined inputs, is the transaction decided yet?
//!
//! `validate` reasons from best and worst cases so that a transaction can be
//! decided before every ancestor has been downloaded.
//!
//! The variant is chosen once per token graph from the token type:
//!
//! | token type | validator                                         |
//! |------------|---------------------------------------------------|
//! | 1          | [`FungibleValidator`] enforcing type 1            |
//! | 129        | [`FungibleValidator`] enforcing type 129 (group)  |
//! | 65         | [`NftValidator`] (child, needs a valid group parent) |

use slp_primitives::Hash;
use slp_script::{SlpError, SlpMessage, SlpPayload, TokenId, TokenOutput, TokenType};
use slp_transaction::Transaction;

use crate::Validity;

/// What a transaction requires from its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contribution {
    /// Token creation; no inputs are examined.
    Genesis,
    /// Issuance; needs a valid minting baton input.
    Mint,
    /// Transfer; valid inputs must sum to at least this amount.
    Send(u128),
}

/// Classification of a transaction that was not pruned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInfo {
    /// One flag per input: whether that input must be resolved.
    pub input_mask: Vec<bool>,
    /// What the inputs must supply.
    pub contribution: Contribution,
    /// Declared token value per output, sized to the real output count.
    pub outputs: Vec<TokenOutput>,
}

impl TxInfo {
    /// Declared value of output `vout`, or [`TokenOutput::None`].
    pub fn output(&self, vout: u32) -> TokenOutput {
        self.outputs.get(vout as usize).copied().unwrap_or(TokenOutput::None)
    }
}

/// Result of [`ValidatorRules::classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Stop here with this validity (Unknown or Malformed); the
    /// transaction contributes nothing to its children.
    Prune(Validity),
    /// Examine the transaction further.
    Check(TxInfo),
}

/// Current knowledge about one examined input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputInfo {
    /// Validity of the parent transaction so far.
    pub validity: Validity,
    /// Amount the spent output declares, or `None` while the parent has not
    /// been downloaded.
    pub amount: Option<u64>,
}

/// Result of [`ValidatorRules::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Final validity.
    Decided(Validity),
    /// More input information is needed.
    Undecided,
    /// An NFT1 child genesis whose group parent must be validated first.
    AwaitParent,
}

/// The rules a validator variant implements.
pub trait ValidatorRules {
    /// The token this validator belongs to.
    fn token_id(&self) -> TokenId;

    /// Check every rule that does not depend on inputs.
    fn classify(&self, txid: &Hash, tx: &Transaction) -> Classification;

    /// Whether an input whose parent declares `output` counts toward
    /// `contribution`.
    fn check_needed(&self, contribution: &Contribution, output: TokenOutput) -> bool;

    /// Decide from the examined inputs, if possible.
    fn validate(&self, contribution: &Contribution, inputs: &[InputInfo]) -> Verdict;
}

/// Pad or truncate declared outputs to the transaction's real output count.
fn fit_outputs(mut outputs: Vec<TokenOutput>, n_outputs: usize) -> Vec<TokenOutput> {
    outputs.resize(n_outputs, TokenOutput::None);
    outputs
}

/// Parse output 0, mapping parse failures to prune verdicts.
fn parse_message(tx: &Transaction) -> Result<SlpMessage, Classification> {
    match tx.slp_message() {
        Ok(msg) => Ok(msg),
        // unknown types are ignored rather than remembered as bad
        Err(SlpError::UnsupportedTokenType(_)) => Err(Classification::Prune(Validity::Unknown)),
        Err(_) => Err(Classification::Prune(Validity::Malformed)),
    }
}

/// Transfer rule shared by both variants.
fn validate_send(required: u128, inputs: &[InputInfo]) -> Verdict {
    // An undownloaded parent could supply any amount, so only fail fast
    // when every examined parent is known.
    if inputs.iter().all(|i| i.amount.is_some()) {
        let best_case: u128 = inputs
            .iter()
            .filter(|i| !i.validity.is_invalid())
            .map(|i| i.amount.unwrap_or(0) as u128)
            .sum();
        if best_case < required {
            return Verdict::Decided(Validity::InsufficientInputs);
        }
    }

    let valid_sum: u128 = inputs
        .iter()
        .filter(|i| i.validity.is_valid())
        .map(|i| i.amount.unwrap_or(0) as u128)
        .sum();
    if valid_sum >= required {
        return Verdict::Decided(Validity::Valid);
    }
    Verdict::Undecided
}

/// Fungible-token rules (token type 1, and type 129 NFT1 groups).
#[derive(Debug, Clone)]
pub struct FungibleValidator {
    token_id: TokenId,
    enforced_token_type: TokenType,
}

impl FungibleValidator {
    /// Validator for `token_id`, accepting only `enforced_token_type`.
    pub fn new(token_id: TokenId, enforced_token_type: TokenType) -> Self {
        Self { token_id, enforced_token_type }
    }

    /// The token type this validator accepts.
    pub fn enforced_token_type(&self) -> TokenType {
        self.enforced_token_type
    }
}

impl ValidatorRules for FungibleValidator {
    fn token_id(&self) -> TokenId {
        self.token_id
    }

    fn classify(&self, txid: &Hash, tx: &Transaction) -> Classification {
        if tx.outputs.is_empty() {
            return Classification::Prune(Validity::Malformed);
        }
        let msg = match parse_message(tx) {
            Ok(msg) => msg,
            Err(prune) => return prune,
        };
        if msg.token_type != self.enforced_token_type {
            return Classification::Prune(Validity::Unknown);
        }

        let n_inputs = tx.inputs.len();
        let (token_id, input_mask, contribution) = match &msg.payload {
            SlpPayload::Genesis(_) => {
                (TokenId::new(*txid), vec![false; n_inputs], Contribution::Genesis)
            }
            SlpPayload::Mint(m) => (m.token_id, vec![true; n_inputs], Contribution::Mint),
            SlpPayload::Send(s) => {
                let total = s.amounts.iter().map(|a| *a as u128).sum();
                (s.token_id, vec![true; n_inputs], Contribution::Send(total))
            }
            SlpPayload::Commit(_) => return Classification::Prune(Validity::Unknown),
        };

        if token_id != self.token_id {
            return Classification::Prune(Validity::Unknown);
        }

        Classification::Check(TxInfo {
            input_mask,
            contribution,
            outputs: fit_outputs(msg.token_outputs(), tx.outputs.len()),
        })
    }

    fn check_needed(&self, contribution: &Contribution, output: TokenOutput) -> bool {
        match contribution {
            Contribution::Genesis => false,
            Contribution::Mint => output == TokenOutput::MintBaton,
            Contribution::Send(_) => matches!(output, TokenOutput::Amount(a) if a > 0),
        }
    }

    fn validate(&self, contribution: &Contribution, inputs: &[InputInfo]) -> Verdict {
        match contribution {
            Contribution::Genesis => Verdict::Decided(Validity::Valid),
            Contribution::Mint => {
                if inputs.iter().any(|i| i.validity.is_valid()) {
                    Verdict::Decided(Validity::Valid)
                } else if inputs.iter().all(|i| i.amount.is_some() && i.validity.is_invalid()) {
                    // also covers a MINT that spends no baton at all
                    Verdict::Decided(Validity::InsufficientInputs)
                } else {
                    Verdict::Undecided
                }
            }
            Contribution::Send(required) => validate_send(*required, inputs),
        }
    }
}

/// Where an NFT1 child token stands on its group parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NftParentState {
    /// Not looked at yet.
    Unresolved,
    /// A nested job on the group token's graph is running.
    Awaiting {
        /// The group transaction spent by the child genesis.
        parent_txid: Hash,
    },
    /// The parent has a decided validity.
    Resolved {
        /// The group transaction spent by the child genesis.
        parent_txid: Hash,
        /// Token id of the group.
        group_id: Option<TokenId>,
        /// Validity of the parent transaction.
        validity: Validity,
    },
}

/// NFT1 child rules (token type 65).
#[derive(Debug, Clone)]
pub struct NftValidator {
    token_id: TokenId,
    parent: NftParentState,
}

impl NftValidator {
    /// Validator for the child token `token_id`.
    pub fn new(token_id: TokenId) -> Self {
        Self { token_id, parent: NftParentState::Unresolved }
    }

    /// Current parent state.
    pub fn parent_state(&self) -> NftParentState {
        self.parent
    }

    /// Record progress on the group parent.
    pub fn set_parent_state(&mut self, state: NftParentState) {
        self.parent = state;
    }
}

impl ValidatorRules for NftValidator {
    fn token_id(&self) -> TokenId {
        self.token_id
    }

    fn classify(&self, txid: &Hash, tx: &Transaction) -> Classification {
        if tx.outputs.is_empty() {
            return Classification::Prune(Validity::Malformed);
        }
        let msg = match parse_message(tx) {
            Ok(msg) => msg,
            Err(prune) => return prune,
        };
        if msg.token_type != TokenType::Nft1Child {
            return Classification::Prune(Validity::Unknown);
        }

        let n_inputs = tx.inputs.len();
        let (token_id, input_mask, contribution) = match &msg.payload {
            SlpPayload::Send(s) => {
                if s.amounts.len() != 1 || s.amounts[0] != 1 {
                    return Classification::Prune(Validity::Malformed);
                }
                (s.token_id, vec![true; n_inputs], Contribution::Send(1))
            }
            SlpPayload::Genesis(g) => {
                if g.mint_baton_vout.is_some() || g.decimals != 0 || g.initial_quantity != 1 {
                    return Classification::Prune(Validity::Malformed);
                }
                (TokenId::new(*txid), vec![false; n_inputs], Contribution::Genesis)
            }
            SlpPayload::Mint(_) => return Classification::Prune(Validity::Malformed),
            SlpPayload::Commit(_) => return Classification::Prune(Validity::Unknown),
        };

        if token_id != self.token_id {
            return Classification::Prune(Validity::Unknown);
        }

        Classification::Check(TxInfo {
            input_mask,
            contribution,
            outputs: fit_outputs(msg.token_outputs(), tx.outputs.len()),
        })
    }

    fn check_needed(&self, contribution: &Contribution, output: TokenOutput) -> bool {
        match contribution {
            Contribution::Send(_) => matches!(output, TokenOutput::Amount(a) if a > 0),
            _ => false,
        }
    }

    fn validate(&self, contribution: &Contribution, inputs: &[InputInfo]) -> Verdict {
        match contribution {
            Contribution::Genesis => match self.parent {
                NftParentState::Unresolved => Verdict::AwaitParent,
                NftParentState::Awaiting { .. } => Verdict::AwaitParent,
                NftParentState::Resolved { validity, .. } => match validity {
                    Validity::Valid => Verdict::Decided(Validity::Valid),
                    Validity::Unknown => Verdict::Undecided,
                    _ => Verdict::Decided(Validity::BadNftParent),
                },
            },
            Contribution::Send(required) => validate_send(*required, inputs),
            Contribution::Mint => Verdict::Decided(Validity::Malformed),
        }
    }
}

/// The validator of one token graph.
#[derive(Debug, Clone)]
pub enum Validator {
    /// Type 1 or type 129 rules.
    Fungible(FungibleValidator),
    /// Type 65 rules.
    Nft(NftValidator),
}

impl Validator {
    /// Pick the variant for a token of the given type.
    pub fn for_token(token_id: TokenId, token_type: TokenType) -> Self {
        match token_type {
            TokenType::Fungible | TokenType::Nft1Group => {
                Validator::Fungible(FungibleValidator::new(token_id, token_type))
            }
            TokenType::Nft1Child => Validator::Nft(NftValidator::new(token_id)),
        }
    }

    /// The NFT1 child validator, if this is one.
    pub fn as_nft_mut(&mut self) -> Option<&mut NftValidator> {
        match self {
            Validator::Nft(v) => Some(v),
            Validator::Fungible(_) => None,
        }
    }

    /// The NFT1 child parent state, if this is an NFT1 child validator.
    pub fn nft_parent_state(&self) -> Option<NftParentState> {
        match self {
            Validator::Nft(v) => Some(v.parent_state()),
            Validator::Fungible(_) => None,
        }
    }
}

impl ValidatorRules for Validator {
    fn token_id(&self) -> TokenId {
        match self {
            Validator::Fungible(v) => v.token_id(),
            Validator::Nft(v) => v.token_id(),
        }
    }

    fn classify(&self, txid: &Hash, tx: &Transaction) -> Classification {
        match self {
            Validator::Fungible(v) => v.classify(txid, tx),
            Validator::Nft(v) => v.classify(txid, tx),
        }
    }

    fn check_needed(&self, contribution: &Contribution, output: TokenOutput) -> bool {
        match self {
            Validator::Fungible(v) => v.check_needed(contribution, output),
            Validator::Nft(v) => v.check_needed(contribution, output),
        }
    }

    fn validate(&self, contribution: &Contribution, inputs: &[InputInfo]) -> Verdict {
        match self {
            Validator::Fungible(v) => v.validate(contribution, inputs),
            Validator::Nft(v) => v.validate(contribution, inputs),
        }
    }
}
