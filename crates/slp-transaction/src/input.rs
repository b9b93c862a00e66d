//! Transaction input referencing a previous output.

use slp_primitives::util::{ByteReader, ByteWriter, VarInt};
use slp_primitives::Hash;
use slp_script::Script;

use crate::{OutPoint, TransactionError};

/// Default sequence number indicating a finalized input.
pub const DEFAULT_SEQUENCE_NUMBER: u32 = 0xFFFF_FFFF;

/// A single transaction input.
///
/// # Wire format
///
/// | Field              | Size             |
/// |--------------------|------------------|
/// | source_txid        | 32 bytes (LE)    |
/// | source_tx_out_index| 4 bytes (LE)     |
/// | script length      | VarInt           |
/// | unlocking_script   | variable         |
/// | sequence_number    | 4 bytes (LE)     |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionInput {
    /// Id of the transaction whose output is spent.
    pub source_txid: Hash,

    /// Index of the spent output within the source transaction.
    pub source_tx_out_index: u32,

    /// The unlocking script (scriptSig). Empty for unsigned inputs.
    pub unlocking_script: Script,

    /// Sequence number. Defaults to `0xFFFFFFFF`.
    pub sequence_number: u32,
}

impl TransactionInput {
    /// Create an unsigned input spending `outpoint`.
    pub fn new(outpoint: OutPoint) -> Self {
        TransactionInput {
            source_txid: outpoint.txid,
            source_tx_out_index: outpoint.vout,
            unlocking_script: Script::new(),
            sequence_number: DEFAULT_SEQUENCE_NUMBER,
        }
    }

    /// The output this input spends.
    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.source_txid, self.source_tx_out_index)
    }

    /// Deserialize a `TransactionInput` from a `ByteReader`.
    ///
    /// # Returns
    /// `Ok(TransactionInput)` on success, or a `TransactionError` if the
    /// data is truncated.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let txid_bytes = reader.read_bytes(32).map_err(|e| {
            TransactionError::SerializationError(format!("reading source txid: {}", e))
        })?;
        let source_txid = Hash::from_bytes(txid_bytes)?;

        let source_tx_out_index = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading output index: {}", e))
        })?;

        let script_len = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading script length: {}", e))
        })?;

        let script_bytes = reader.read_bytes(script_len.value() as usize).map_err(|e| {
            TransactionError::SerializationError(format!("reading unlocking script: {}", e))
        })?;

        let sequence_number = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading sequence number: {}", e))
        })?;

        Ok(TransactionInput {
            source_txid,
            source_tx_out_index,
            unlocking_script: Script::from_bytes(script_bytes),
            sequence_number,
        })
    }

    /// Serialize this input into a `ByteWriter`.
    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_bytes(self.source_txid.as_bytes());
        writer.write_u32_le(self.source_tx_out_index);
        let script_bytes = self.unlocking_script.to_bytes();
        writer.write_varint(VarInt::from(script_bytes.len()));
        writer.write_bytes(script_bytes);
        writer.write_u32_le(self.sequence_number);
    }
}
