//! # Domain Invariants
//!
//! Business rules shared by validation and reconciliation.

use super::errors::{AggregatorError, Amount};

/// Invariant: a leg's deadline has not passed at `now`.
pub fn invariant_deadline_not_passed(deadline: u64, now: u64) -> Result<(), AggregatorError> {
    if now > deadline {
        return Err(AggregatorError::Expired { deadline, now });
    }
    Ok(())
}

/// Invariant: `amount > 0` and `min_amount <= amount`.
pub fn invariant_amount_bounds(amount: Amount, min_amount: Amount) -> Result<(), AggregatorError> {
    if amount == 0 || min_amount > amount {
        return Err(AggregatorError::InvalidAmount { amount, min_amount });
    }
    Ok(())
}

/// Invariant: value paid out or retained never exceeds value bridged in.
pub fn invariant_conservation(
    bridged_in: Amount,
    credited: Amount,
    refunded: Amount,
    retained: Amount,
) -> bool {
    credited
        .checked_add(refunded)
        .and_then(|v| v.checked_add(retained))
        .is_some_and(|out| out <= bridged_in)
}
