//! In-memory liquidity vault.
//!
//! Balances and allowances per account; pulled value goes into a single
//! custody pool that releases pay out of.

use crate::domain::{Address, AggregatorError, Amount};
use crate::ports::outbound::LiquidityVault;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Default)]
struct VaultState {
    balances: HashMap<Address, Amount>,
    allowances: HashMap<Address, Amount>,
    custody: Amount,
}

/// In-memory vault for tests and local simulation.
#[derive(Debug, Default)]
pub struct InMemoryVault {
    state: RwLock<VaultState>,
}

impl InMemoryVault {
    /// Empty vault.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` to `owner`.
    pub fn mint(&self, owner: Address, amount: Amount) {
        let mut state = self.state.write();
        let balance = state.balances.entry(owner).or_default();
        *balance = balance.saturating_add(amount);
    }

    /// Let the aggregator pull up to `amount` from `owner`.
    pub fn approve(&self, owner: Address, amount: Amount) {
        self.state.write().allowances.insert(owner, amount);
    }

    /// Add bridged-in value to custody.
    pub fn fund_custody(&self, amount: Amount) {
        let mut state = self.state.write();
        state.custody = state.custody.saturating_add(amount);
    }

    /// Balance of `owner`.
    pub fn balance_of(&self, owner: &Address) -> Amount {
        self.state.read().balances.get(owner).copied().unwrap_or(0)
    }

    /// Remaining allowance of `owner`.
    pub fn allowance_of(&self, owner: &Address) -> Amount {
        self.state.read().allowances.get(owner).copied().unwrap_or(0)
    }

    /// Value currently in custody.
    pub fn custody(&self) -> Amount {
        self.state.read().custody
    }
}

impl LiquidityVault for InMemoryVault {
    fn available(&self, owner: &Address) -> Amount {
        let state = self.state.read();
        let balance = state.balances.get(owner).copied().unwrap_or(0);
        let allowance = state.allowances.get(owner).copied().unwrap_or(0);
        balance.min(allowance)
    }

    fn pull(&self, owner: &Address, amount: Amount) -> Result<(), AggregatorError> {
        let mut state = self.state.write();
        let balance = state.balances.get(owner).copied().unwrap_or(0);
        let allowance = state.allowances.get(owner).copied().unwrap_or(0);
        let available = balance.min(allowance);
        if available < amount {
            return Err(AggregatorError::InsufficientFunds {
                required: amount,
                available,
            });
        }
        state.balances.insert(*owner, balance - amount);
        state.allowances.insert(*owner, allowance - amount);
        state.custody = state.custody.saturating_add(amount);
        Ok(())
    }

    fn release(&self, to: &Address, amount: Amount) {
        let mut state = self.state.write();
        if state.custody < amount {
            warn!(
                custody = %state.custody,
                requested = %amount,
                "Release exceeds custody"
            );
        }
        state.custody = state.custody.saturating_sub(amount);
        let balance = state.balances.entry(*to).or_default();
        *balance = balance.saturating_add(amount);
    }
}
