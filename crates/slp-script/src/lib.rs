//! SLP toolkit - script chunk parsing and the SLP OP_RETURN message codec.
//!
//! Provides the [`Script`] newtype, push-data chunk decoding, the
//! [`TokenId`] identifier and [`slp::SlpMessage`], the parsed form of a
//! token-protocol output script.

pub mod chunk;
pub mod opcodes;
pub mod script;
pub mod slp;
pub mod token_id;

mod error;
pub use chunk::ScriptChunk;
pub use error::{ScriptError, SlpError};
pub use script::Script;
pub use slp::{
    build_genesis_script, build_mint_script, build_send_script, GenesisFields, MintFields,
    SendFields, SlpMessage, SlpPayload, SlpTransactionType, TokenOutput, TokenType,
};
pub use token_id::TokenId;
