/// Error types for transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// An error occurred during binary/hex deserialization.
    #[error("serialization error: {0}")]
    SerializationError(String),
    /// An underlying script error (forwarded from `slp-script`).
    #[error("script error: {0}")]
    Script(#[from] slp_script::ScriptError),
    /// An underlying primitives error (forwarded from `slp-primitives`).
    #[error("primitives error: {0}")]
    Primitives(#[from] slp_primitives::PrimitivesError),
}
