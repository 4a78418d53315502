//! # Channel Payload Codec
//!
//! Fixed-order binary layouts, integers big-endian.
//!
//! ```text
//! message: correlation_key[32] | amount[16] | min_amount[16] | recipient[20]
//! bridge:  correlation_key[32] | recipient[20]
//! ```

use crate::domain::{AggregatorError, BridgePayload, CorrelationKey, MessagePayload};

/// Encoded message payload length.
pub const MESSAGE_PAYLOAD_LEN: usize = 32 + 16 + 16 + 20;

/// Encoded bridge payload length.
pub const BRIDGE_PAYLOAD_LEN: usize = 32 + 20;

/// Encode a message payload.
pub fn encode_message_payload(payload: &MessagePayload) -> Vec<u8> {
    let mut out = Vec::with_capacity(MESSAGE_PAYLOAD_LEN);
    out.extend_from_slice(payload.correlation_key.as_bytes());
    out.extend_from_slice(&payload.amount.to_be_bytes());
    out.extend_from_slice(&payload.min_amount.to_be_bytes());
    out.extend_from_slice(&payload.recipient);
    out
}

/// Decode a message payload.
pub fn decode_message_payload(bytes: &[u8]) -> Result<MessagePayload, AggregatorError> {
    check_len(bytes, MESSAGE_PAYLOAD_LEN)?;
    let mut key = [0u8; 32];
    let mut amount = [0u8; 16];
    let mut min_amount = [0u8; 16];
    let mut recipient = [0u8; 20];
    key.copy_from_slice(&bytes[..32]);
    amount.copy_from_slice(&bytes[32..48]);
    min_amount.copy_from_slice(&bytes[48..64]);
    recipient.copy_from_slice(&bytes[64..84]);

    Ok(MessagePayload {
        correlation_key: CorrelationKey(key),
        amount: u128::from_be_bytes(amount),
        min_amount: u128::from_be_bytes(min_amount),
        recipient,
    })
}

/// Encode a bridge payload.
pub fn encode_bridge_payload(payload: &BridgePayload) -> Vec<u8> {
    let mut out = Vec::with_capacity(BRIDGE_PAYLOAD_LEN);
    out.extend_from_slice(payload.correlation_key.as_bytes());
    out.extend_from_slice(&payload.recipient);
    out
}

/// Decode a bridge payload.
pub fn decode_bridge_payload(bytes: &[u8]) -> Result<BridgePayload, AggregatorError> {
    check_len(bytes, BRIDGE_PAYLOAD_LEN)?;
    let mut key = [0u8; 32];
    let mut recipient = [0u8; 20];
    key.copy_from_slice(&bytes[..32]);
    recipient.copy_from_slice(&bytes[32..52]);
    Ok(BridgePayload {
        correlation_key: CorrelationKey(key),
        recipient,
    })
}

fn check_len(bytes: &[u8], expected: usize) -> Result<(), AggregatorError> {
    if bytes.len() != expected {
        return Err(AggregatorError::MalformedPayload {
            expected,
            got: bytes.len(),
        });
    }
    Ok(())
}
