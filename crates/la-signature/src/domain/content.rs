//! # Canonical Leg Content
//!
//! Order-sensitive byte encoding of every field that moves value in a leg.
//! A field missing from this encoding could be swapped by a relayer without
//! invalidating the signature, so the layout is fixed and versioned.
//!
//! ```text
//! "LIQAGG/v1" | src_chain (u16 BE) | dst_chain (u16 BE) | amount (u128 BE)
//!             | min_amount (u128 BE) | deadline (u64 BE) | caller (20 bytes)
//! ```

use super::ecdsa::keccak256;
use super::entities::{Address, Hash};
use serde::{Deserialize, Serialize};

/// Domain tag prefixed to every signed leg.
pub const LEG_DOMAIN_TAG: &[u8; 9] = b"LIQAGG/v1";

/// Length of [`LegContent::canonical_bytes`].
pub const CANONICAL_LEN: usize = 9 + 2 + 2 + 16 + 16 + 8 + 20;

/// Economic terms of a single leg as seen by the signer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegContent {
    /// Chain the request is submitted on.
    pub source_chain_id: u16,
    /// Chain the liquidity is sent to.
    pub destination_chain_id: u16,
    /// Amount debited on the source chain.
    pub amount: u128,
    /// Slippage floor accepted on the destination chain.
    pub min_amount: u128,
    /// Logical-time deadline.
    pub deadline: u64,
    /// Account whose liquidity is debited.
    pub caller: Address,
}

impl LegContent {
    /// Fixed-order canonical encoding.
    pub fn canonical_bytes(&self) -> [u8; CANONICAL_LEN] {
        let mut out = [0u8; CANONICAL_LEN];
        let mut at = 0;
        let mut put = |bytes: &[u8]| {
            out[at..at + bytes.len()].copy_from_slice(bytes);
            at += bytes.len();
        };
        put(LEG_DOMAIN_TAG);
        put(&self.source_chain_id.to_be_bytes());
        put(&self.destination_chain_id.to_be_bytes());
        put(&self.amount.to_be_bytes());
        put(&self.min_amount.to_be_bytes());
        put(&self.deadline.to_be_bytes());
        put(&self.caller);
        out
    }

    /// keccak256 of the canonical encoding; this is what gets signed.
    pub fn digest(&self) -> Hash {
        keccak256(&self.canonical_bytes())
    }
}
