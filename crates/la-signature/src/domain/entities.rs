//! # Authorization Entities
//!
//! Value types shared by the signature domain.

use super::errors::SignatureError;
use serde::{Deserialize, Serialize};

/// 20-byte account address (last 20 bytes of keccak256(pubkey)).
pub type Address = [u8; 20];

/// 32-byte digest.
pub type Hash = [u8; 32];

/// Recoverable secp256k1 signature in Ethereum layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcdsaSignature {
    /// R component.
    pub r: [u8; 32],
    /// S component (must be in the lower half of the curve order).
    pub s: [u8; 32],
    /// Recovery id: 0, 1, 27 or 28.
    pub v: u8,
}

impl EcdsaSignature {
    /// Parse a packed 65-byte `r || s || v` signature.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignatureError> {
        if bytes.len() != 65 {
            return Err(SignatureError::InvalidLength(bytes.len()));
        }
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Ok(Self { r, s, v: bytes[64] })
    }

    /// Packed 65-byte form.
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = self.v;
        out
    }
}

/// Outcome of checking a leg signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Authorization {
    /// Signature was produced by the expected signer over this exact content.
    Authorized,
    /// Anything else, with the reason.
    Unauthorized(SignatureError),
}

impl Authorization {
    /// True when the leg may be dispatched.
    pub fn is_authorized(&self) -> bool {
        matches!(self, Authorization::Authorized)
    }
}
