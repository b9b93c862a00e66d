//! Per-token DAG of validation nodes.

use std::collections::HashMap;

use slp_primitives::Hash;
use slp_script::{SlpMessage, TokenId, TokenOutput};
use slp_transaction::{OutPoint, Transaction};

use crate::validator::{Classification, InputInfo, TxInfo, Validator, ValidatorRules, Verdict};
use crate::Validity;

/// One transaction as seen by a token graph.
#[derive(Debug, Clone)]
pub struct ValidationNode {
    /// Transaction id.
    pub txid: Hash,
    /// Parsed SLP message of output 0, if it has one.
    pub message: Option<SlpMessage>,
    /// Current validity.
    pub validity: Validity,
    /// Whether `validity` is final. Undecided nodes are Unknown and not final.
    pub finalized: bool,
    /// Classification, `None` when the node was pruned.
    pub info: Option<TxInfo>,
    /// Outpoints spent by the transaction, index-aligned with its inputs.
    pub inputs: Vec<OutPoint>,
}

impl ValidationNode {
    /// Declared token value of output `vout`. Pruned nodes declare nothing.
    pub fn output(&self, vout: u32) -> TokenOutput {
        self.info.as_ref().map(|i| i.output(vout)).unwrap_or(TokenOutput::None)
    }

    /// Outpoints the validator wants resolved.
    pub fn masked_inputs(&self) -> impl Iterator<Item = &OutPoint> {
        let mask = self.info.as_ref().map(|i| i.input_mask.as_slice()).unwrap_or(&[]);
        self.inputs.iter().zip(mask.iter()).filter(|(_, m)| **m).map(|(op, _)| op)
    }
}

/// The in-memory validation graph of one token.
///
/// Nodes live as long as the graph. Only the graph's job manager mutates it.
#[derive(Debug)]
pub struct TokenGraph {
    validator: Validator,
    nodes: HashMap<Hash, ValidationNode>,
}

impl TokenGraph {
    /// An empty graph evaluated by `validator`.
    pub fn new(validator: Validator) -> Self {
        Self { validator, nodes: HashMap::new() }
    }

    /// The graph's token.
    pub fn token_id(&self) -> TokenId {
        self.validator.token_id()
    }

    /// The graph's validator.
    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Mutable access to the validator (NFT parent state).
    pub fn validator_mut(&mut self) -> &mut Validator {
        &mut self.validator
    }

    /// Look up a node.
    pub fn node(&self, txid: &Hash) -> Option<&ValidationNode> {
        self.nodes.get(txid)
    }

    /// True if the transaction has been added.
    pub fn contains(&self, txid: &Hash) -> bool {
        self.nodes.contains_key(txid)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a transaction, classifying it. Existing nodes are left untouched.
    pub fn insert(&mut self, txid: Hash, tx: &Transaction) -> &ValidationNode {
        let validator = &self.validator;
        self.nodes.entry(txid).or_insert_with(|| {
            let inputs = tx.inputs.iter().map(|i| i.outpoint()).collect();
            let message = tx.slp_message().ok();
            match validator.classify(&txid, tx) {
                Classification::Prune(validity) => ValidationNode {
                    txid,
                    message,
                    validity,
                    finalized: true,
                    info: None,
                    inputs,
                },
                Classification::Check(info) => ValidationNode {
                    txid,
                    message,
                    validity: Validity::Unknown,
                    finalized: false,
                    info: Some(info),
                    inputs,
                },
            }
        })
    }

    /// What is currently known about each counted input of `txid`.
    fn input_infos(&self, node: &ValidationNode, info: &TxInfo) -> Vec<InputInfo> {
        let mut out = Vec::new();
        for op in node.masked_inputs() {
            match self.nodes.get(&op.txid) {
                None => out.push(InputInfo { validity: Validity::Unknown, amount: None }),
                Some(parent) => {
                    let declared = parent.output(op.vout);
                    if !self.validator.check_needed(&info.contribution, declared) {
                        continue;
                    }
                    let validity = if parent.finalized { parent.validity } else { Validity::Unknown };
                    out.push(InputInfo { validity, amount: Some(declared.amount()) });
                }
            }
        }
        out
    }

    /// Run the validator on a node.
    ///
    /// Final nodes report their validity; a newly decided node is finalized.
    pub fn evaluate(&mut self, txid: &Hash) -> Verdict {
        let verdict = {
            let Some(node) = self.nodes.get(txid) else {
                return Verdict::Undecided;
            };
            if node.finalized {
                return Verdict::Decided(node.validity);
            }
            let Some(info) = node.info.as_ref() else {
                return Verdict::Undecided;
            };
            let inputs = self.input_infos(node, info);
            self.validator.validate(&info.contribution, &inputs)
        };

        if let Verdict::Decided(validity) = verdict {
            self.finalize(txid, validity);
        }
        verdict
    }

    /// Fix a node's validity.
    pub fn finalize(&mut self, txid: &Hash, validity: Validity) {
        if let Some(node) = self.nodes.get_mut(txid) {
            node.validity = validity;
            node.finalized = true;
        }
    }
}
