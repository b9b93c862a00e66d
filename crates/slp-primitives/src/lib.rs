//! SLP toolkit - hashing, transaction id and binary encoding primitives.
//!
//! This crate provides the foundational building blocks shared by every
//! other member of the workspace:
//! - SHA-256 and double SHA-256
//! - The 32-byte [`Hash`] used for transaction ids and token ids
//! - Variable-length integers and a cursor-based byte reader/writer

pub mod chainhash;
pub mod hash;
pub mod util;

mod error;
pub use chainhash::Hash;
pub use error::PrimitivesError;
