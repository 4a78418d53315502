//! # Signature Authorizer
//!
//! Checks that a leg's signature was produced by the entitled signer over the
//! leg's canonical content. Stateless: the same inputs always give the same
//! answer, so it can be called before any state is touched.

use crate::domain::content::LegContent;
use crate::domain::ecdsa;
use crate::domain::entities::{Address, Authorization, EcdsaSignature};
use tracing::debug;

/// Leg signature verifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureAuthorizer;

impl SignatureAuthorizer {
    /// Create a new authorizer.
    pub fn new() -> Self {
        Self
    }

    /// Verify a packed 65-byte signature over `content` against `expected_signer`.
    pub fn verify(
        &self,
        content: &LegContent,
        signature: &[u8],
        expected_signer: Address,
    ) -> Authorization {
        let result = EcdsaSignature::from_bytes(signature).and_then(|sig| {
            ecdsa::verify_ecdsa_signer(&content.digest(), &sig, expected_signer)
        });

        match result {
            Ok(()) => Authorization::Authorized,
            Err(reason) => {
                debug!(
                    dst_chain = content.destination_chain_id,
                    signer = %hex::encode(expected_signer),
                    %reason,
                    "Leg signature rejected"
                );
                Authorization::Unauthorized(reason)
            }
        }
    }
}
