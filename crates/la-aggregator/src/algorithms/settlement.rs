//! # Settlement Decision
//!
//! What happens to arrived funds once the message is also present.
//!
//! - `observed < min_amount` → `Refunded`, everything observed goes back
//! - otherwise → `Credited` with `min(observed, amount)`; the rest is surplus

use crate::domain::{Amount, LegStatus};

/// Terminal split of the observed value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    /// `Credited` or `Refunded`.
    pub status: LegStatus,
    /// Released to the recipient as a credit.
    pub credited: Amount,
    /// Returned under the slippage guard.
    pub refunded: Amount,
    /// Held back for explicit reconciliation.
    pub surplus: Amount,
}

/// Decide the terminal state for a complete record.
pub fn decide_resolution(observed: Amount, claimed_amount: Amount, claimed_min: Amount) -> Resolution {
    if observed < claimed_min {
        return Resolution {
            status: LegStatus::Refunded,
            credited: 0,
            refunded: observed,
            surplus: 0,
        };
    }

    let credited = observed.min(claimed_amount);
    Resolution {
        status: LegStatus::Credited,
        credited,
        refunded: 0,
        surplus: observed - credited,
    }
}
