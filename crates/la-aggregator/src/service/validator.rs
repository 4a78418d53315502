//! # Leg Request Validator
//!
//! Checks one leg in a fixed order, short-circuiting on the first failure:
//!
//! 1. deadline not passed → `Expired`
//! 2. `amount > 0 && min_amount <= amount` → `InvalidAmount`
//! 3. signature by the depositor, not already consumed → `Unauthorized`
//! 4. vault can cover `amount` → `InsufficientFunds`
//!
//! Validation never mutates state. Digests are consumed by the orchestrator
//! only once the leg has been debited and recorded, and are kept until the
//! leg's deadline passes. After that the expiry check rejects the leg first.

use crate::domain::{
    invariant_amount_bounds, invariant_deadline_not_passed, Address, AggregatorError, ChainId,
    Hash, Leg,
};
use crate::ports::outbound::LiquidityVault;
use la_signature::{Authorization, LegContent, SignatureAuthorizer};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// A leg that passed every check and may be dispatched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedLeg {
    /// The leg as submitted.
    pub leg: Leg,
    /// Content the signature covers.
    pub content: LegContent,
    /// Signed digest, consumed on dispatch.
    pub digest: Hash,
}

/// Per-leg validation against signature, time and liquidity.
pub struct LegRequestValidator {
    local_chain_id: ChainId,
    authorizer: SignatureAuthorizer,
    vault: Arc<dyn LiquidityVault>,
    // digest -> deadline of the signed leg
    consumed: RwLock<HashMap<Hash, u64>>,
}

impl LegRequestValidator {
    /// Validator for legs leaving `local_chain_id`.
    pub fn new(local_chain_id: ChainId, vault: Arc<dyn LiquidityVault>) -> Self {
        Self {
            local_chain_id,
            authorizer: SignatureAuthorizer::new(),
            vault,
            consumed: RwLock::new(HashMap::new()),
        }
    }

    /// Validate `leg` for `depositor` at logical time `now`.
    pub fn validate(
        &self,
        leg: &Leg,
        depositor: &Address,
        now: u64,
    ) -> Result<ValidatedLeg, AggregatorError> {
        invariant_deadline_not_passed(leg.deadline, now)?;
        invariant_amount_bounds(leg.amount, leg.min_amount)?;

        let content = leg.content(self.local_chain_id, *depositor);
        if let Authorization::Unauthorized(reason) =
            self.authorizer.verify(&content, &leg.signature, *depositor)
        {
            return Err(AggregatorError::Unauthorized(reason.to_string()));
        }
        let digest = content.digest();
        if self.is_consumed(&digest) {
            return Err(AggregatorError::Unauthorized(
                "leg signature already used".to_string(),
            ));
        }

        let available = self.vault.available(depositor);
        if available < leg.amount {
            return Err(AggregatorError::InsufficientFunds {
                required: leg.amount,
                available,
            });
        }

        Ok(ValidatedLeg {
            leg: leg.clone(),
            content,
            digest,
        })
    }

    /// Has this signed digest already been dispatched?
    pub fn is_consumed(&self, digest: &Hash) -> bool {
        self.consumed.read().contains_key(digest)
    }

    /// Mark a digest dispatched until `deadline`. Returns false if it already was.
    pub fn consume(&self, digest: Hash, deadline: u64) -> bool {
        let mut consumed = self.consumed.write();
        if consumed.contains_key(&digest) {
            return false;
        }
        consumed.insert(digest, deadline);
        true
    }

    /// Forget digests whose legs can no longer pass the deadline check.
    pub fn evict_expired(&self, now: u64) -> usize {
        let mut consumed = self.consumed.write();
        let before = consumed.len();
        consumed.retain(|_, deadline| invariant_deadline_not_passed(*deadline, now).is_ok());
        before - consumed.len()
    }

    /// Number of digests currently remembered.
    pub fn consumed_len(&self) -> usize {
        self.consumed.read().len()
    }
}
