//! Error types for ancestor fetch operations.

use slp_primitives::Hash;

/// Errors raised by the cache-backed fetch layer, the graph search client,
/// the raw transaction fetcher and the proxy oracle client.
///
/// All of these are resource errors: a validation job that hits one fails
/// with the error recorded and leaves undecided transactions Unknown.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// HTTP request failed (connection, timeout, body read).
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Failed to serialize or deserialize data.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Server returned a non-2xx response.
    #[error("server error ({status_code}): {message}")]
    ServerError {
        /// HTTP status code.
        status_code: u16,
        /// Error message from server.
        message: String,
    },

    /// Resource not found (404, or a record without transaction data).
    #[error("not found")]
    NotFound,

    /// No indexer / fetch backend is configured.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A query was issued with an empty id list.
    #[error("no txids provided for graph search query")]
    NoTxids,

    /// A fetched transaction does not hash to the requested id.
    #[error("hash mismatch: requested {requested}, got {actual}")]
    HashMismatch {
        /// The id that was asked for.
        requested: Hash,
        /// The id of the bytes that came back.
        actual: Hash,
    },

    /// A response field could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}
