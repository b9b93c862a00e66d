//! Error types for wallet-side token operations.

use slp_script::{SlpError, TokenId};
use slp_validator::ValidationError;

use crate::checker::SlpCheckError;

/// Errors from coin selection, postage, and wallet-driven validation.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// The valid balance of the token cannot cover the payment.
    #[error("insufficient token balance: need {required}, valid balance is {available}")]
    NotEnoughFunds {
        /// Requested amount.
        required: u128,
        /// Valid balance.
        available: u128,
    },

    /// The valid balance would cover the payment but too much of it is
    /// frozen or unconfirmed.
    #[error("insufficient unfrozen token balance: need {required}, spendable balance is {unfrozen}")]
    NotEnoughUnfrozenFunds {
        /// Requested amount.
        required: u128,
        /// Spendable balance.
        unfrozen: u128,
    },

    /// The payment does not fit in one SEND message.
    #[error("token amount overflow: {0}")]
    AmountOverflow(String),

    /// The post office does not sell postage for this token.
    #[error("post office offers no postage for token {0}")]
    NoPostage(TokenId),

    /// Post office negotiation failed.
    #[error("post office error: {0}")]
    PostOffice(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Server answered with an error status.
    #[error("server error (status {status_code}): {message}")]
    ServerError {
        /// HTTP status code.
        status_code: u16,
        /// Response body.
        message: String,
    },

    /// Conservation check failed.
    #[error(transparent)]
    Check(#[from] SlpCheckError),

    /// Validation engine error.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// SLP message encoding error.
    #[error(transparent)]
    Slp(#[from] SlpError),
}
