//! Script chunk parsing and encoding.
//!
//! A script chunk is either an opcode or a data push with its associated
//! bytes. Unlike a consensus interpreter, OP_RETURN is decoded as an ordinary
//! opcode so the pushes that follow it (the token-protocol fields) stay
//! addressable as separate chunks.

use crate::opcodes::*;
use crate::ScriptError;

/// A single parsed element of a script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptChunk {
    /// The opcode byte. For direct pushes (1-75 bytes) this is the length.
    pub op: u8,
    /// The data payload, if this chunk is a push operation.
    pub data: Option<Vec<u8>>,
}

impl ScriptChunk {
    /// True for OP_DATA_1..=OP_PUSHDATA4 chunks.
    ///
    /// OP_0 is deliberately excluded; token messages must encode empty
    /// fields with OP_PUSHDATA1 0x00.
    pub fn is_push(&self) -> bool {
        self.op > OP_0 && self.op <= OP_PUSHDATA4 && self.data.is_some()
    }
}

/// Decode raw script bytes into a vector of `ScriptChunk` values.
///
/// # Returns
/// The parsed chunks, or `ScriptError::DataTooSmall` if a push is truncated.
pub fn decode_script(bytes: &[u8]) -> Result<Vec<ScriptChunk>, ScriptError> {
    let mut chunks = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let op = bytes[pos];
        pos += 1;

        let length = match op {
            0x01..=OP_DATA_75 => op as usize,
            OP_PUSHDATA1 => read_len(bytes, &mut pos, 1)?,
            OP_PUSHDATA2 => read_len(bytes, &mut pos, 2)?,
            OP_PUSHDATA4 => read_len(bytes, &mut pos, 4)?,
            _ => {
                chunks.push(ScriptChunk { op, data: None });
                continue;
            }
        };

        let end = pos.checked_add(length).ok_or(ScriptError::DataTooSmall)?;
        if end > bytes.len() {
            return Err(ScriptError::DataTooSmall);
        }
        chunks.push(ScriptChunk { op, data: Some(bytes[pos..end].to_vec()) });
        pos = end;
    }

    Ok(chunks)
}

fn read_len(bytes: &[u8], pos: &mut usize, width: usize) -> Result<usize, ScriptError> {
    if bytes.len() < *pos + width {
        return Err(ScriptError::DataTooSmall);
    }
    let mut le = [0u8; 4];
    le[..width].copy_from_slice(&bytes[*pos..*pos + width]);
    *pos += width;
    Ok(u32::from_le_bytes(le) as usize)
}

/// Compute the push prefix bytes for a data payload of the given length.
///
/// Lengths 1..=75 use a direct push; zero-length and longer payloads use
/// the smallest OP_PUSHDATA form that fits.
pub fn push_data_prefix(data_len: usize) -> Result<Vec<u8>, ScriptError> {
    if (1..=75).contains(&data_len) {
        Ok(vec![data_len as u8])
    } else if data_len <= 0xFF {
        Ok(vec![OP_PUSHDATA1, data_len as u8])
    } else if data_len <= 0xFFFF {
        let mut buf = vec![OP_PUSHDATA2];
        buf.extend_from_slice(&(data_len as u16).to_le_bytes());
        Ok(buf)
    } else if data_len <= 0xFFFF_FFFF {
        let mut buf = vec![OP_PUSHDATA4];
        buf.extend_from_slice(&(data_len as u32).to_le_bytes());
        Ok(buf)
    } else {
        Err(ScriptError::DataTooBig)
    }
}
