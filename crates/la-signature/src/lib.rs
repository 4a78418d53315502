//! # Leg Signature Authorization
//!
//! Verifies that an aggregate-request leg was signed by the account whose
//! liquidity it moves, so a relayer can submit the request without being able
//! to alter its economic terms.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): canonical leg encoding and secp256k1 recovery, no I/O
//! - **Authorizer** (`authorizer.rs`): `verify(content, signature, expected_signer)`
//!
//! ## Security Notes
//!
//! - **Malleability Prevention (EIP-2)**: Signatures with high S values are rejected
//! - **Domain separation**: the source chain id is part of the signed bytes

pub mod authorizer;
pub mod domain;

pub use authorizer::SignatureAuthorizer;
pub use domain::content::{LegContent, CANONICAL_LEN, LEG_DOMAIN_TAG};
pub use domain::ecdsa::{address_from_pubkey, keccak256, recover_address, verify_ecdsa_signer};
pub use domain::entities::{Address, Authorization, EcdsaSignature, Hash};
pub use domain::errors::SignatureError;

#[cfg(any(test, feature = "test-helpers"))]
pub use domain::ecdsa::test_helpers;
