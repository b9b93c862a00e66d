/// Error types for script operations.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// Not enough data in script to complete a push operation.
    #[error("not enough data")]
    DataTooSmall,

    /// Push data exceeds maximum allowed size.
    #[error("data too big")]
    DataTooBig,

    /// Hex decoding error.
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}

/// Errors raised while parsing or building an SLP OP_RETURN message.
///
/// The split between [`SlpError::NotSlp`], [`SlpError::UnsupportedTokenType`]
/// and [`SlpError::InvalidOutputMessage`] matters to validators: the first
/// two are ignored, the last marks a transaction as malformed.
#[derive(Debug, thiserror::Error)]
pub enum SlpError {
    /// The script is not an SLP message at all.
    #[error("not an SLP output script")]
    NotSlp,

    /// The message declares a token type this library does not validate.
    #[error("unsupported SLP token type {0}")]
    UnsupportedTokenType(u16),

    /// The message is SLP but violates the message encoding rules.
    #[error("invalid SLP output message: {0}")]
    InvalidOutputMessage(String),

    /// Script decoding failed.
    #[error(transparent)]
    Script(#[from] ScriptError),
}
