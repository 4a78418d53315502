//! # ECDSA Verification (secp256k1)
//!
//! Recover-and-compare verification of leg signatures.
//!
//! ## Security Notes
//!
//! - **Malleability Prevention (EIP-2)**: S must be STRICTLY LESS THAN SECP256K1_HALF_ORDER
//! - **Scalar Range Validation**: R and S must be in [1, n-1]
//! - Range checks use `subtle` so they run in fixed time

use super::entities::{Address, EcdsaSignature, Hash};
use super::errors::SignatureError;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha3::{Digest, Keccak256};
use subtle::{Choice, ConstantTimeEq};

/// secp256k1 curve order n
const SECP256K1_ORDER: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE,
    0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41,
];

/// n/2, upper bound (exclusive) for S.
const SECP256K1_HALF_ORDER: [u8; 32] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D, 0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B, 0x20, 0xA0,
];

/// Recover the signer of `message_hash` after range and malleability checks.
pub fn verify_ecdsa(
    message_hash: &Hash,
    signature: &EcdsaSignature,
) -> Result<Address, SignatureError> {
    if !is_valid_scalar(&signature.r) || !is_valid_scalar(&signature.s) {
        return Err(SignatureError::InvalidFormat);
    }
    if !is_low_s(&signature.s) {
        return Err(SignatureError::MalleableSignature);
    }
    recover_address(message_hash, signature)
}

/// Verify and require the recovered signer to equal `expected`.
pub fn verify_ecdsa_signer(
    message_hash: &Hash,
    signature: &EcdsaSignature,
    expected: Address,
) -> Result<(), SignatureError> {
    let actual = verify_ecdsa(message_hash, signature)?;
    if !bool::from(actual[..].ct_eq(&expected[..])) {
        return Err(SignatureError::SignerMismatch { expected, actual });
    }
    Ok(())
}

/// Recover the signer's address from a signature without policy checks.
pub fn recover_address(
    message_hash: &Hash,
    signature: &EcdsaSignature,
) -> Result<Address, SignatureError> {
    use zeroize::Zeroize;

    let recovery_id = parse_recovery_id(signature.v)?;

    let mut sig_bytes = [0u8; 64];
    sig_bytes[..32].copy_from_slice(&signature.r);
    sig_bytes[32..].copy_from_slice(&signature.s);
    let parsed = Signature::from_slice(&sig_bytes);
    sig_bytes.zeroize();
    let sig = parsed.map_err(|_| SignatureError::InvalidFormat)?;

    let recovered_key = VerifyingKey::recover_from_prehash(message_hash, &sig, recovery_id)
        .map_err(|_| SignatureError::RecoveryFailed)?;

    Ok(address_from_pubkey(&recovered_key))
}

/// Keccak256 hash function.
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Derive the 20-byte address from a public key.
pub fn address_from_pubkey(public_key: &VerifyingKey) -> Address {
    let pubkey_bytes = public_key.to_encoded_point(false);
    // Skip the 0x04 SEC1 prefix
    let hash = keccak256(&pubkey_bytes.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

/// s < n/2, strict, constant time.
fn is_low_s(s: &[u8; 32]) -> bool {
    lt_constant_time(s, &SECP256K1_HALF_ORDER)
}

/// Scalar in [1, n-1], constant time.
fn is_valid_scalar(scalar: &[u8; 32]) -> bool {
    let mut is_zero = Choice::from(1u8);
    for byte in scalar {
        is_zero &= byte.ct_eq(&0u8);
    }
    let in_range = Choice::from(lt_constant_time(scalar, &SECP256K1_ORDER) as u8);
    (!is_zero & in_range).into()
}

/// Big-endian `a < b` without early exit.
fn lt_constant_time(a: &[u8; 32], b: &[u8; 32]) -> bool {
    let mut less = Choice::from(0u8);
    let mut greater = Choice::from(0u8);
    for i in 0..32 {
        let not_decided = !(less | greater);
        less |= not_decided & Choice::from((a[i] < b[i]) as u8);
        greater |= not_decided & Choice::from((a[i] > b[i]) as u8);
    }
    less.into()
}

/// Valid v values: 0, 1, 27, 28
fn parse_recovery_id(v: u8) -> Result<RecoveryId, SignatureError> {
    let id = match v {
        0 | 27 => 0,
        1 | 28 => 1,
        _ => return Err(SignatureError::InvalidRecoveryId(v)),
    };
    RecoveryId::try_from(id).map_err(|_| SignatureError::InvalidRecoveryId(v))
}

/// s' = n - s
pub fn invert_s(s: &[u8; 32]) -> [u8; 32] {
    let mut result = [0u8; 32];
    let mut borrow: i32 = 0;
    for i in (0..32).rev() {
        let diff = (SECP256K1_ORDER[i] as i32) - (s[i] as i32) - borrow;
        if diff < 0 {
            result[i] = (diff + 256) as u8;
            borrow = 1;
        } else {
            result[i] = diff as u8;
            borrow = 0;
        }
    }
    result
}

/// Key generation and signing for test suites.
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use super::*;
    use crate::domain::content::LegContent;
    pub use k256::ecdsa::SigningKey;

    /// Random secp256k1 key and its address.
    pub fn generate_signer() -> (SigningKey, Address) {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        let address = address_from_pubkey(signing_key.verifying_key());
        (signing_key, address)
    }

    /// Sign a prehashed message, normalised to low S with v in {27, 28}.
    pub fn sign(message_hash: &Hash, private_key: &SigningKey) -> EcdsaSignature {
        let (sig, recid) = private_key
            .sign_prehash_recoverable(message_hash)
            .expect("signing failed");

        let sig_bytes = sig.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&sig_bytes[..32]);
        s.copy_from_slice(&sig_bytes[32..]);

        let flipped = !is_low_s(&s);
        if flipped {
            s = invert_s(&s);
        }
        // Negating S flips the parity of R's y coordinate
        let parity = recid.to_byte() & 1;
        let v = 27 + if flipped { parity ^ 1 } else { parity };

        EcdsaSignature { r, s, v }
    }

    /// Sign the canonical digest of a leg.
    pub fn sign_leg(content: &LegContent, private_key: &SigningKey) -> EcdsaSignature {
        sign(&content.digest(), private_key)
    }
}
