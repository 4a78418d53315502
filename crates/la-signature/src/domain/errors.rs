//! # Signature Errors
//!
//! Error types for leg authorization.

use thiserror::Error;

/// Errors that can occur while checking a leg signature.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// The signature is not 65 bytes of `r || s || v`
    #[error("Invalid signature length: expected 65 bytes, got {0}")]
    InvalidLength(usize),

    /// R or S is zero or not below the curve order
    #[error("Invalid signature format")]
    InvalidFormat,

    /// Signature has high S value (EIP-2 malleability protection)
    #[error("Malleable signature (high S value)")]
    MalleableSignature,

    /// Invalid recovery ID (v must be 0, 1, 27, or 28)
    #[error("Invalid recovery ID: {0}")]
    InvalidRecoveryId(u8),

    /// Failed to recover public key from signature
    #[error("Failed to recover public key")]
    RecoveryFailed,

    /// Recovered signer does not match expected signer
    #[error("Signer mismatch: expected 0x{}, got 0x{}", hex::encode(expected), hex::encode(actual))]
    SignerMismatch {
        /// Address the leg had to be signed by.
        expected: [u8; 20],
        /// Address actually recovered from the signature.
        actual: [u8; 20],
    },
}
