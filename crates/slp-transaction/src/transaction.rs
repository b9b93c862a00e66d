//! Core transaction type.
//!
//! Validation only ever needs to read transactions (their inputs, outputs
//! and the SLP message in output 0) and to compute their ids; the wallet
//! layer additionally assembles unsigned transactions for the conservation
//! checker. No signing lives here.

use slp_primitives::hash::sha256d;
use slp_primitives::util::{ByteReader, ByteWriter, VarInt};
use slp_primitives::Hash;
use slp_script::{SlpError, SlpMessage};

use crate::input::TransactionInput;
use crate::output::TransactionOutput;
use crate::TransactionError;

/// Smallest possible encoded input: txid, index, empty script, sequence.
const MIN_INPUT_SIZE: usize = 32 + 4 + 1 + 4;
/// Smallest possible encoded output: value and empty script.
const MIN_OUTPUT_SIZE: usize = 8 + 1;

/// A transaction consisting of a version, a set of inputs, a set of
/// outputs, and a lock time.
///
/// # Wire format
///
/// | Field        | Size                      |
/// |--------------|---------------------------|
/// | version      | 4 bytes (LE)              |
/// | input count  | VarInt                    |
/// | inputs       | variable (per input)      |
/// | output count | VarInt                    |
/// | outputs      | variable (per output)     |
/// | lock_time    | 4 bytes (LE)              |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// Transaction format version.
    pub version: u32,

    /// Ordered list of transaction inputs.
    pub inputs: Vec<TransactionInput>,

    /// Ordered list of transaction outputs.
    pub outputs: Vec<TransactionOutput>,

    /// Lock time.
    pub lock_time: u32,
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl Transaction {
    /// Create a new empty transaction with version 2 and lock time 0.
    pub fn new() -> Self {
        Transaction { version: 2, inputs: Vec::new(), outputs: Vec::new(), lock_time: 0 }
    }

    // -----------------------------------------------------------------
    // Deserialization
    // -----------------------------------------------------------------

    /// Parse a transaction from a hex-encoded string.
    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(hex_str).map_err(|e| {
            TransactionError::SerializationError(format!("invalid hex: {}", e))
        })?;
        Self::from_bytes(&bytes)
    }

    /// Parse a transaction from raw bytes.
    ///
    /// The byte slice must contain exactly one complete transaction with no
    /// trailing data.
    ///
    /// # Arguments
    /// * `bytes` - The raw transaction bytes.
    ///
    /// # Returns
    /// `Ok(Transaction)` on success, or a `TransactionError` if the data
    /// is truncated, malformed, or has trailing bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut reader = ByteReader::new(bytes);
        let tx = Self::read_from(&mut reader)?;
        if reader.remaining() != 0 {
            return Err(TransactionError::SerializationError(format!(
                "trailing {} bytes after transaction",
                reader.remaining()
            )));
        }
        Ok(tx)
    }

    /// Deserialize a transaction from a `ByteReader`.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let version = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading version: {}", e))
        })?;

        let input_count = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading input count: {}", e))
        })?;

        let cap = (input_count.value() as usize).min(reader.remaining() / MIN_INPUT_SIZE);
        let mut inputs = Vec::with_capacity(cap);
        for _ in 0..input_count.value() {
            inputs.push(TransactionInput::read_from(reader)?);
        }

        let output_count = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading output count: {}", e))
        })?;

        let cap = (output_count.value() as usize).min(reader.remaining() / MIN_OUTPUT_SIZE);
        let mut outputs = Vec::with_capacity(cap);
        for _ in 0..output_count.value() {
            outputs.push(TransactionOutput::read_from(reader)?);
        }

        let lock_time = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading lock time: {}", e))
        })?;

        Ok(Transaction { version, inputs, outputs, lock_time })
    }

    // -----------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------

    /// Serialize this transaction to raw wire-format bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::with_capacity(256);
        writer.write_u32_le(self.version);

        writer.write_varint(VarInt::from(self.inputs.len()));
        for input in &self.inputs {
            input.write_to(&mut writer);
        }

        writer.write_varint(VarInt::from(self.outputs.len()));
        for output in &self.outputs {
            output.write_to(&mut writer);
        }

        writer.write_u32_le(self.lock_time);
        writer.into_bytes()
    }

    /// Serialize this transaction to a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Compute the transaction id (double SHA-256 of the serialized bytes).
    ///
    /// Displaying the returned [`Hash`] gives the conventional reversed hex.
    pub fn tx_id(&self) -> Hash {
        Hash::new(sha256d(&self.to_bytes()))
    }

    // -----------------------------------------------------------------
    // Builders
    // -----------------------------------------------------------------

    /// Append an input.
    pub fn add_input(&mut self, input: TransactionInput) {
        self.inputs.push(input);
    }

    /// Append an output.
    pub fn add_output(&mut self, output: TransactionOutput) {
        self.outputs.push(output);
    }

    /// Parse output 0 as an SLP message.
    ///
    /// # Returns
    /// The parsed message, [`SlpError::NotSlp`] if the transaction has no
    /// outputs or output 0 is not SLP, or another `SlpError` if it is SLP
    /// but malformed.
    pub fn slp_message(&self) -> Result<SlpMessage, SlpError> {
        let first = self.outputs.first().ok_or(SlpError::NotSlp)?;
        SlpMessage::parse(&first.locking_script)
    }
}
