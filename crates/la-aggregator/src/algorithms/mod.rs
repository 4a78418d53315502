//! # Algorithms Module
//!
//! Pure functions behind dispatch and reconciliation.

pub mod correlation;
pub mod payload;
pub mod settlement;

pub use correlation::{derive_correlation_key, NonceCounter};
pub use payload::{
    decode_bridge_payload, decode_message_payload, encode_bridge_payload, encode_message_payload,
    BRIDGE_PAYLOAD_LEN, MESSAGE_PAYLOAD_LEN,
};
pub use settlement::{decide_resolution, Resolution};
