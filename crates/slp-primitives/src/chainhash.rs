//! Chain hash type for transaction and token identification.
//!
//! Provides a `Hash` type - a 32-byte array displayed as byte-reversed hex,
//! matching Bitcoin's convention for transaction ids. SLP token ids are
//! genesis transaction ids, so they share this representation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::PrimitivesError;

/// Size of a Hash in bytes.
pub const HASH_SIZE: usize = 32;

/// A 32-byte hash used for transaction ids.
///
/// Bytes are stored in internal (little-endian) order. When displayed as a
/// string the bytes are reversed, so `Display` output is the familiar txid.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    /// Create a Hash from a raw 32-byte array in internal byte order.
    pub const fn new(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }

    /// Create a Hash from a byte slice in internal byte order.
    ///
    /// # Returns
    /// `Ok(Hash)` if the slice is 32 bytes, or an error otherwise.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let arr: [u8; HASH_SIZE] = bytes.try_into().map_err(|_| {
            PrimitivesError::InvalidHash(format!(
                "invalid hash length of {}, want {}",
                bytes.len(),
                HASH_SIZE
            ))
        })?;
        Ok(Hash(arr))
    }

    /// Create a Hash from bytes given in display (big-endian) order.
    ///
    /// SLP OP_RETURN messages carry token ids this way.
    pub fn from_display_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let mut hash = Self::from_bytes(bytes)?;
        hash.0.reverse();
        Ok(hash)
    }

    /// Parse a 64-character byte-reversed hex string.
    ///
    /// # Arguments
    /// * `hex_str` - The txid as conventionally displayed.
    ///
    /// # Returns
    /// `Ok(Hash)` on success, or an error for bad hex or wrong length.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        if hex_str.len() != HASH_SIZE * 2 {
            return Err(PrimitivesError::InvalidHash(format!(
                "hash string must be {} hex characters, got {}",
                HASH_SIZE * 2,
                hex_str.len()
            )));
        }
        let decoded = hex::decode(hex_str)?;
        Self::from_display_bytes(&decoded)
    }

    /// Borrow the internal bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// Return the bytes in display (big-endian) order.
    pub fn to_display_bytes(&self) -> [u8; HASH_SIZE] {
        let mut out = self.0;
        out.reverse();
        out
    }

    /// Return the byte-reversed hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_display_bytes())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl FromStr for Hash {
    type Err = PrimitivesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hash::from_hex(s)
    }
}

impl From<[u8; HASH_SIZE]> for Hash {
    fn from(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
