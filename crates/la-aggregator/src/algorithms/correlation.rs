//! # Correlation Keys
//!
//! `key = keccak256(src_chain_be16 || dst_chain_be16 || nonce_be64)`

use crate::domain::{ChainId, CorrelationKey};
use la_signature::keccak256;
use std::sync::atomic::{AtomicU64, Ordering};

/// Derive the correlation key of a leg.
pub fn derive_correlation_key(source: ChainId, destination: ChainId, nonce: u64) -> CorrelationKey {
    let mut preimage = [0u8; 12];
    preimage[..2].copy_from_slice(&source.0.to_be_bytes());
    preimage[2..4].copy_from_slice(&destination.0.to_be_bytes());
    preimage[4..].copy_from_slice(&nonce.to_be_bytes());
    CorrelationKey(keccak256(&preimage))
}

/// Monotonic per-chain nonce. Values are never handed out twice.
#[derive(Debug, Default)]
pub struct NonceCounter {
    next: AtomicU64,
}

impl NonceCounter {
    /// Counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next nonce.
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// Nonce the next call will return.
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}
