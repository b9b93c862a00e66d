//! Tests for the slp-transaction crate.

use slp_primitives::Hash;
use slp_script::slp::build_send_script;
use slp_script::{Script, SlpError, SlpTransactionType, TokenId, TokenType};

use crate::{OutPoint, Transaction, TransactionInput, TransactionOutput};

/// A standard P2PKH transaction whose first output also carries a non-SLP
/// OP_RETURN suffix.
const SOURCE_RAW_TX: &str = "010000000138c7c61c14ffb063c3bb2664041a3e29ea6ea0412a0c18ff725ba4e9e12afae2030000006a47304402203e9ab8e4c14addf3b4741540b556cfb0e0efb67dc1a7b5ce84c3ac56b3fd447802203c9f49f7bd893ebd7060176dfc36bcaff9d2c443d9a0dd6cd2d59b372c024d20412102798913bc057b344de675dac34faafe3dc2f312c758cd9068209f810877306d66ffffffff02dc050000000000002076a914eb0bd5edba389198e73f8efabddfc61666969ff788ac6a0568656c6c6faa0d0000000000001976a914eb0bd5edba389198e73f8efabddfc61666969ff788ac00000000";

const SOURCE_TXID: &str = "11b476ad8e0a48fcd40807a111a050af51114877e09283bfa7f3505081a1819d";

#[test]
fn test_parse_known_transaction() {
    let tx = Transaction::from_hex(SOURCE_RAW_TX).expect("should parse");
    assert_eq!(tx.version, 1);
    assert_eq!(tx.inputs.len(), 1);
    assert_eq!(tx.outputs.len(), 2);
    assert_eq!(tx.outputs[0].satoshis, 1500);
    assert_eq!(tx.outputs[1].satoshis, 3498);
    assert_eq!(tx.to_hex(), SOURCE_RAW_TX);
}

#[test]
fn test_tx_id_is_display_reversed() {
    let tx = Transaction::from_hex(SOURCE_RAW_TX).unwrap();
    assert_eq!(tx.tx_id().to_string(), SOURCE_TXID);
}

#[test]
fn test_input_outpoint_uses_display_order() {
    let tx = Transaction::from_hex(SOURCE_RAW_TX).unwrap();
    let op = tx.inputs[0].outpoint();
    assert_eq!(op.vout, 3);
    assert_eq!(
        op.to_string(),
        "e2fa2ae1e9a45b72ff180c2a41a06eea293e1a046426bbc363b0ff141cc6c738:3"
    );
    let parsed: OutPoint = op.to_string().parse().unwrap();
    assert_eq!(parsed, op);
}

#[test]
fn test_trailing_bytes_rejected() {
    let hex = format!("{SOURCE_RAW_TX}00");
    assert!(Transaction::from_hex(&hex).is_err());
}

#[test]
fn test_truncated_rejected() {
    let hex = &SOURCE_RAW_TX[..SOURCE_RAW_TX.len() - 10];
    assert!(Transaction::from_hex(hex).is_err());
}

#[test]
fn test_huge_input_count_does_not_preallocate() {
    // version, then an input count of 2^32 with nothing behind it
    let bytes = hex::decode("01000000feffffffff").unwrap();
    assert!(Transaction::from_bytes(&bytes).is_err());
}

#[test]
fn test_slp_message_from_output_zero() {
    let token = TokenId::new(Hash::new([7; 32]));
    let mut tx = Transaction::new();
    tx.add_input(TransactionInput::new(OutPoint::new(Hash::new([1; 32]), 0)));
    tx.add_output(TransactionOutput::new(
        0,
        build_send_script(TokenType::Fungible, token, &[10]).unwrap(),
    ));
    tx.add_output(TransactionOutput::new(546, Script::new_p2pkh(&[2; 20])));

    let reparsed = Transaction::from_bytes(&tx.to_bytes()).unwrap();
    assert_eq!(reparsed, tx);
    let msg = reparsed.slp_message().unwrap();
    assert_eq!(msg.transaction_type(), SlpTransactionType::Send);
    assert_eq!(msg.token_id(), Some(token));
}

#[test]
fn test_non_slp_transaction() {
    let tx = Transaction::from_hex(SOURCE_RAW_TX).unwrap();
    assert!(matches!(tx.slp_message(), Err(SlpError::NotSlp)));
    assert!(matches!(Transaction::new().slp_message(), Err(SlpError::NotSlp)));
}
