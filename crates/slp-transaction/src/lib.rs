//! SLP toolkit - transaction codec.
//!
//! Provides the [`Transaction`] type with binary/hex serialization and txid
//! computation, the [`OutPoint`] coin reference, and a helper to read the
//! SLP message carried in output 0.

pub mod input;
pub mod outpoint;
pub mod output;
pub mod transaction;

mod error;
pub use error::TransactionError;
pub use input::TransactionInput;
pub use outpoint::OutPoint;
pub use output::TransactionOutput;
pub use transaction::Transaction;

#[cfg(test)]
mod tests;
