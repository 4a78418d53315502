//! Aggregator configuration and validation

use super::errors::{Address, AggregatorError};
use super::value_objects::ChainId;
use serde::{Deserialize, Serialize};

/// Per-deployment aggregator settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Chain this aggregator runs on.
    pub local_chain_id: ChainId,
    /// Address of this aggregator as seen by remotes.
    pub local_address: Address,
    /// Identity allowed to administer trusted remotes and release held value.
    pub owner: Address,
    /// Deadline window for records first created by an inbound event.
    pub inbound_settlement_window_secs: u64,
    /// How long terminal records stay queryable before archival.
    pub retention_secs: u64,
    /// Upper bound on legs per aggregate call.
    pub max_legs_per_request: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            local_chain_id: ChainId(1),
            local_address: [0u8; 20],
            owner: [0u8; 20],
            inbound_settlement_window_secs: 24 * 3600, // 24 hours
            retention_secs: 7 * 24 * 3600,             // 7 days
            max_legs_per_request: 16,
        }
    }
}

impl AggregatorConfig {
    /// Configuration for a chain with the given owner and address.
    pub fn for_chain(local_chain_id: ChainId, local_address: Address, owner: Address) -> Self {
        Self {
            local_chain_id,
            local_address,
            owner,
            ..Self::default()
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), AggregatorError> {
        if self.inbound_settlement_window_secs == 0 {
            return Err(AggregatorError::InvalidConfig(
                "inbound settlement window must be greater than 0".to_string(),
            ));
        }
        if self.max_legs_per_request == 0 {
            return Err(AggregatorError::InvalidConfig(
                "max legs per request must be greater than 0".to_string(),
            ));
        }
        if self.local_address == [0u8; 20] {
            return Err(AggregatorError::InvalidConfig(
                "local address must be set".to_string(),
            ));
        }
        Ok(())
    }
}
