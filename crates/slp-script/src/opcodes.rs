//! Opcode constants used by token scripts.

/// Push an empty byte vector.
pub const OP_0: u8 = 0x00;
/// Largest direct-push opcode (push the next 75 bytes).
pub const OP_DATA_75: u8 = 0x4b;
/// Next byte is the push length.
pub const OP_PUSHDATA1: u8 = 0x4c;
/// Next two bytes (LE) are the push length.
pub const OP_PUSHDATA2: u8 = 0x4d;
/// Next four bytes (LE) are the push length.
pub const OP_PUSHDATA4: u8 = 0x4e;
/// Marks an output as provably unspendable data carrier.
pub const OP_RETURN: u8 = 0x6a;
/// Duplicate the top stack item.
pub const OP_DUP: u8 = 0x76;
/// Fail unless the top two items are equal.
pub const OP_EQUALVERIFY: u8 = 0x88;
/// Replace the top item with RIPEMD160(SHA256(item)).
pub const OP_HASH160: u8 = 0xa9;
/// Check a signature against a public key.
pub const OP_CHECKSIG: u8 = 0xac;
