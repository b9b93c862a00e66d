//! SLP OP_RETURN message parsing and building.
//!
//! An SLP message lives in output 0 of a transaction:
//!
//! ```text
//! OP_RETURN <"SLP\0"> <token_type> <tx_type> <fields...>
//! ```
//!
//! | tx type | fields                                                                |
//! |---------|-----------------------------------------------------------------------|
//! | GENESIS | ticker, name, document url, document hash, decimals, baton vout, qty  |
//! | MINT    | token id, baton vout, additional qty                                  |
//! | SEND    | token id, 1..=19 output amounts                                       |
//! | COMMIT  | token id, opaque commitment fields                                    |
//!
//! Every field after OP_RETURN must be a push-data chunk; quantities are
//! 8-byte big-endian integers and token ids are carried in display order.

use std::fmt;

use serde::{Deserialize, Serialize};
use slp_primitives::Hash;

use crate::chunk::decode_script;
use crate::opcodes::OP_RETURN;
use crate::{Script, SlpError, TokenId};

/// Protocol identifier pushed right after OP_RETURN.
pub const LOKAD_ID: [u8; 4] = *b"SLP\0";

/// Maximum number of token outputs a SEND may declare.
pub const MAX_SEND_OUTPUTS: usize = 19;

/// Largest `decimals` value a GENESIS may declare.
pub const MAX_DECIMALS: u8 = 9;

/// Token types this library validates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenType {
    /// Type 1, plain fungible tokens.
    Fungible,
    /// Type 65, NFT1 child tokens (one unit, minted from a group coin).
    Nft1Child,
    /// Type 129, NFT1 group tokens. Fungible rules apply.
    Nft1Group,
}

impl TokenType {
    /// The numeric token type carried on the wire.
    pub fn code(self) -> u16 {
        match self {
            TokenType::Fungible => 1,
            TokenType::Nft1Child => 65,
            TokenType::Nft1Group => 129,
        }
    }

    /// Map a wire token type to a supported variant.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(TokenType::Fungible),
            65 => Some(TokenType::Nft1Child),
            129 => Some(TokenType::Nft1Group),
            _ => None,
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SLP{}", self.code())
    }
}

/// SLP transaction sub-type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlpTransactionType {
    /// Create a token.
    Genesis,
    /// Issue more supply via a minting baton.
    Mint,
    /// Transfer existing supply.
    Send,
    /// Auxiliary commitment, unused by validation.
    Commit,
}

impl SlpTransactionType {
    /// The ASCII tag used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            SlpTransactionType::Genesis => "GENESIS",
            SlpTransactionType::Mint => "MINT",
            SlpTransactionType::Send => "SEND",
            SlpTransactionType::Commit => "COMMIT",
        }
    }

    fn from_wire(bytes: &[u8]) -> Option<Self> {
        match bytes {
            b"GENESIS" => Some(SlpTransactionType::Genesis),
            b"MINT" => Some(SlpTransactionType::Mint),
            b"SEND" => Some(SlpTransactionType::Send),
            b"COMMIT" => Some(SlpTransactionType::Commit),
            _ => None,
        }
    }
}

impl fmt::Display for SlpTransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// GENESIS fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenesisFields {
    /// Ticker symbol bytes (usually UTF-8).
    pub ticker: Vec<u8>,
    /// Token name bytes (usually UTF-8).
    pub name: Vec<u8>,
    /// Document URL bytes.
    pub document_url: Vec<u8>,
    /// Optional 32-byte document hash.
    pub document_hash: Option<[u8; 32]>,
    /// Number of decimal places, at most [`MAX_DECIMALS`].
    pub decimals: u8,
    /// Output index of the minting baton, if one is created.
    pub mint_baton_vout: Option<u8>,
    /// Quantity minted to output 1.
    pub initial_quantity: u64,
}

/// MINT fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintFields {
    /// Token being minted.
    pub token_id: TokenId,
    /// Output index of the new minting baton, if it is passed on.
    pub mint_baton_vout: Option<u8>,
    /// Quantity minted to output 1.
    pub additional_quantity: u64,
}

/// SEND fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendFields {
    /// Token being transferred.
    pub token_id: TokenId,
    /// Declared amounts for outputs 1..=amounts.len().
    pub amounts: Vec<u64>,
}

/// COMMIT fields. Only the token id is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitFields {
    /// Token the commitment refers to.
    pub token_id: TokenId,
    /// Remaining pushes, kept verbatim.
    pub extra: Vec<Vec<u8>>,
}

/// The per-type body of an SLP message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlpPayload {
    /// Token creation.
    Genesis(GenesisFields),
    /// Additional issuance.
    Mint(MintFields),
    /// Transfer.
    Send(SendFields),
    /// Commitment.
    Commit(CommitFields),
}

/// Token value an output declares, indexed by vout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenOutput {
    /// No token value (including the OP_RETURN at vout 0).
    None,
    /// A token amount in base units.
    Amount(u64),
    /// The minting baton.
    MintBaton,
}

impl TokenOutput {
    /// The amount, or zero for non-amount outputs.
    pub fn amount(&self) -> u64 {
        match self {
            TokenOutput::Amount(a) => *a,
            _ => 0,
        }
    }
}

/// A parsed SLP message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlpMessage {
    /// Declared token type.
    pub token_type: TokenType,
    /// Type-specific fields.
    pub payload: SlpPayload,
}

impl SlpMessage {
    /// Parse an output script as an SLP message.
    ///
    /// # Errors
    /// - [`SlpError::NotSlp`] if the script is not an SLP OP_RETURN.
    /// - [`SlpError::UnsupportedTokenType`] for token types other than 1, 65, 129.
    /// - [`SlpError::InvalidOutputMessage`] for any encoding rule violation.
    pub fn parse(script: &Script) -> Result<Self, SlpError> {
        Self::parse_bytes(script.to_bytes())
    }

    /// Parse raw output script bytes as an SLP message.
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self, SlpError> {
        let chunks = match decode_script(bytes) {
            Ok(chunks) => chunks,
            Err(_) if has_lokad_prefix(bytes) => return Err(invalid("truncated push")),
            Err(_) => return Err(SlpError::NotSlp),
        };

        if chunks.first().map(|c| c.op) != Some(OP_RETURN) {
            return Err(SlpError::NotSlp);
        }
        if chunks.get(1).and_then(|c| c.data.as_deref()) != Some(&LOKAD_ID[..]) {
            return Err(SlpError::NotSlp);
        }

        let mut pushes = Vec::with_capacity(chunks.len() - 1);
        for chunk in chunks.into_iter().skip(1) {
            if !chunk.is_push() {
                return Err(invalid("non-push opcode after OP_RETURN"));
            }
            pushes.push(chunk.data.unwrap_or_default());
        }

        let type_bytes = pushes.get(1).ok_or_else(|| invalid("missing token type"))?;
        if type_bytes.is_empty() || type_bytes.len() > 2 {
            return Err(invalid("token type must be 1 or 2 bytes"));
        }
        let code = type_bytes.iter().fold(0u16, |acc, b| (acc << 8) | *b as u16);
        let token_type = TokenType::from_code(code).ok_or(SlpError::UnsupportedTokenType(code))?;

        let tx_type = pushes
            .get(2)
            .and_then(|b| SlpTransactionType::from_wire(b))
            .ok_or_else(|| invalid("bad transaction type"))?;
        let fields = &pushes[3..];

        let payload = match tx_type {
            SlpTransactionType::Genesis => SlpPayload::Genesis(parse_genesis(fields)?),
            SlpTransactionType::Mint => SlpPayload::Mint(parse_mint(fields)?),
            SlpTransactionType::Send => SlpPayload::Send(parse_send(fields)?),
            SlpTransactionType::Commit => SlpPayload::Commit(parse_commit(fields)?),
        };

        Ok(SlpMessage { token_type, payload })
    }

    /// Build a SEND message, checking the output count limits.
    pub fn new_send(
        token_type: TokenType,
        token_id: TokenId,
        amounts: Vec<u64>,
    ) -> Result<Self, SlpError> {
        if amounts.is_empty() || amounts.len() > MAX_SEND_OUTPUTS {
            return Err(invalid("SEND must declare between 1 and 19 outputs"));
        }
        Ok(SlpMessage {
            token_type,
            payload: SlpPayload::Send(SendFields { token_id, amounts }),
        })
    }

    /// The transaction sub-type.
    pub fn transaction_type(&self) -> SlpTransactionType {
        match self.payload {
            SlpPayload::Genesis(_) => SlpTransactionType::Genesis,
            SlpPayload::Mint(_) => SlpTransactionType::Mint,
            SlpPayload::Send(_) => SlpTransactionType::Send,
            SlpPayload::Commit(_) => SlpTransactionType::Commit,
        }
    }

    /// The declared token id. GENESIS messages have none: their token id is
    /// the id of the transaction carrying them.
    pub fn token_id(&self) -> Option<TokenId> {
        match &self.payload {
            SlpPayload::Genesis(_) => None,
            SlpPayload::Mint(m) => Some(m.token_id),
            SlpPayload::Send(s) => Some(s.token_id),
            SlpPayload::Commit(c) => Some(c.token_id),
        }
    }

    /// Declared token value per output index, starting at vout 0.
    ///
    /// The vector is not truncated to the real output count of the carrying
    /// transaction; callers that need that must truncate themselves.
    pub fn token_outputs(&self) -> Vec<TokenOutput> {
        match &self.payload {
            SlpPayload::Genesis(g) => {
                with_baton(vec![TokenOutput::None, TokenOutput::Amount(g.initial_quantity)], g.mint_baton_vout)
            }
            SlpPayload::Mint(m) => {
                with_baton(vec![TokenOutput::None, TokenOutput::Amount(m.additional_quantity)], m.mint_baton_vout)
            }
            SlpPayload::Send(s) => std::iter::once(TokenOutput::None)
                .chain(s.amounts.iter().map(|a| TokenOutput::Amount(*a)))
                .collect(),
            SlpPayload::Commit(_) => Vec::new(),
        }
    }

    /// Encode this message as an OP_RETURN output script.
    pub fn to_script(&self) -> Result<Script, SlpError> {
        let mut script = Script::new();
        script.append_opcode(OP_RETURN);
        script.append_push_data(&LOKAD_ID)?;
        script.append_push_data(&[self.token_type.code() as u8])?;
        script.append_push_data(self.transaction_type().as_str().as_bytes())?;

        match &self.payload {
            SlpPayload::Genesis(g) => {
                if g.decimals > MAX_DECIMALS {
                    return Err(invalid("decimals above 9"));
                }
                check_baton(g.mint_baton_vout)?;
                script.append_push_data(&g.ticker)?;
                script.append_push_data(&g.name)?;
                script.append_push_data(&g.document_url)?;
                script.append_push_data(g.document_hash.as_ref().map(|h| &h[..]).unwrap_or(&[]))?;
                script.append_push_data(&[g.decimals])?;
                script.append_push_data(g.mint_baton_vout.as_ref().map(std::slice::from_ref).unwrap_or(&[]))?;
                script.append_push_data(&g.initial_quantity.to_be_bytes())?;
            }
            SlpPayload::Mint(m) => {
                check_baton(m.mint_baton_vout)?;
                script.append_push_data(&m.token_id.to_message_bytes())?;
                script.append_push_data(m.mint_baton_vout.as_ref().map(std::slice::from_ref).unwrap_or(&[]))?;
                script.append_push_data(&m.additional_quantity.to_be_bytes())?;
            }
            SlpPayload::Send(s) => {
                if s.amounts.is_empty() || s.amounts.len() > MAX_SEND_OUTPUTS {
                    return Err(invalid("SEND must declare between 1 and 19 outputs"));
                }
                script.append_push_data(&s.token_id.to_message_bytes())?;
                for amount in &s.amounts {
                    script.append_push_data(&amount.to_be_bytes())?;
                }
            }
            SlpPayload::Commit(c) => {
                script.append_push_data(&c.token_id.to_message_bytes())?;
                for field in &c.extra {
                    script.append_push_data(field)?;
                }
            }
        }

        Ok(script)
    }
}

/// Build the SEND OP_RETURN script for a token payment.
pub fn build_send_script(
    token_type: TokenType,
    token_id: TokenId,
    amounts: &[u64],
) -> Result<Script, SlpError> {
    SlpMessage::new_send(token_type, token_id, amounts.to_vec())?.to_script()
}

/// Build a GENESIS OP_RETURN script.
pub fn build_genesis_script(token_type: TokenType, fields: GenesisFields) -> Result<Script, SlpError> {
    SlpMessage { token_type, payload: SlpPayload::Genesis(fields) }.to_script()
}

/// Build a MINT OP_RETURN script.
pub fn build_mint_script(
    token_type: TokenType,
    token_id: TokenId,
    mint_baton_vout: Option<u8>,
    additional_quantity: u64,
) -> Result<Script, SlpError> {
    SlpMessage {
        token_type,
        payload: SlpPayload::Mint(MintFields { token_id, mint_baton_vout, additional_quantity }),
    }
    .to_script()
}

fn invalid(msg: &str) -> SlpError {
    SlpError::InvalidOutputMessage(msg.to_string())
}

fn has_lokad_prefix(bytes: &[u8]) -> bool {
    bytes.len() >= 6 && bytes[0] == OP_RETURN && bytes[1] == 0x04 && bytes[2..6] == LOKAD_ID
}

fn with_baton(mut outputs: Vec<TokenOutput>, baton: Option<u8>) -> Vec<TokenOutput> {
    if let Some(vout) = baton {
        let vout = vout as usize;
        if outputs.len() <= vout {
            outputs.resize(vout + 1, TokenOutput::None);
        }
        outputs[vout] = TokenOutput::MintBaton;
    }
    outputs
}

fn check_baton(baton: Option<u8>) -> Result<(), SlpError> {
    match baton {
        Some(v) if v < 2 => Err(invalid("mint baton vout must be 2 or higher")),
        _ => Ok(()),
    }
}

fn parse_amount(bytes: &[u8]) -> Result<u64, SlpError> {
    let arr: [u8; 8] = bytes.try_into().map_err(|_| invalid("amount must be 8 bytes"))?;
    Ok(u64::from_be_bytes(arr))
}

fn parse_token_id(bytes: &[u8]) -> Result<TokenId, SlpError> {
    if bytes.len() != 32 {
        return Err(invalid("token id must be 32 bytes"));
    }
    let hash = Hash::from_display_bytes(bytes).map_err(|e| invalid(&e.to_string()))?;
    Ok(TokenId::new(hash))
}

fn parse_baton(bytes: &[u8]) -> Result<Option<u8>, SlpError> {
    match bytes {
        [] => Ok(None),
        [v] => {
            let baton = Some(*v);
            check_baton(baton)?;
            Ok(baton)
        }
        _ => Err(invalid("mint baton vout must be 0 or 1 bytes")),
    }
}

fn parse_genesis(fields: &[Vec<u8>]) -> Result<GenesisFields, SlpError> {
    let [ticker, name, url, hash, decimals, baton, qty] = fields else {
        return Err(invalid("GENESIS must have exactly 7 fields"));
    };

    let document_hash = match hash.len() {
        0 => None,
        32 => {
            let mut h = [0u8; 32];
            h.copy_from_slice(hash);
            Some(h)
        }
        _ => return Err(invalid("document hash must be 0 or 32 bytes")),
    };

    let decimals = match decimals.as_slice() {
        [d] if *d <= MAX_DECIMALS => *d,
        _ => return Err(invalid("decimals must be one byte, at most 9")),
    };

    Ok(GenesisFields {
        ticker: ticker.clone(),
        name: name.clone(),
        document_url: url.clone(),
        document_hash,
        decimals,
        mint_baton_vout: parse_baton(baton)?,
        initial_quantity: parse_amount(qty)?,
    })
}

fn parse_mint(fields: &[Vec<u8>]) -> Result<MintFields, SlpError> {
    let [token_id, baton, qty] = fields else {
        return Err(invalid("MINT must have exactly 3 fields"));
    };
    Ok(MintFields {
        token_id: parse_token_id(token_id)?,
        mint_baton_vout: parse_baton(baton)?,
        additional_quantity: parse_amount(qty)?,
    })
}

fn parse_send(fields: &[Vec<u8>]) -> Result<SendFields, SlpError> {
    let (token_id, amounts) = fields.split_first().ok_or_else(|| invalid("missing token id"))?;
    if amounts.is_empty() {
        return Err(invalid("SEND declares no outputs"));
    }
    if amounts.len() > MAX_SEND_OUTPUTS {
        return Err(invalid("SEND declares more than 19 outputs"));
    }
    Ok(SendFields {
        token_id: parse_token_id(token_id)?,
        amounts: amounts.iter().map(|a| parse_amount(a)).collect::<Result<_, _>>()?,
    })
}

fn parse_commit(fields: &[Vec<u8>]) -> Result<CommitFields, SlpError> {
    let (token_id, extra) = fields.split_first().ok_or_else(|| invalid("missing token id"))?;
    Ok(CommitFields { token_id: parse_token_id(token_id)?, extra: extra.to_vec() })
}
