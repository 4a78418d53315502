//! # Domain Value Objects
//!
//! Immutable value types for liquidity aggregation.

use super::errors::{Address, AggregatorError, Hash};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric chain identifier as used by the message network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChainId(pub u16);

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deterministic identifier linking a leg's message to its funds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CorrelationKey(pub Hash);

impl CorrelationKey {
    /// Raw bytes.
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps log lines readable
        write!(f, "CorrelationKey(0x{}..)", hex::encode(&self.0[..4]))
    }
}

/// Authorized counterpart addresses for one remote chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePair {
    /// Our counterpart contract on the remote chain.
    pub remote: Address,
    /// Our own address as the remote sees it.
    pub local: Address,
}

impl RemotePair {
    /// Packed path length: remote (20) || local (20).
    pub const PATH_LEN: usize = 40;

    /// Create a new pair.
    pub fn new(remote: Address, local: Address) -> Self {
        Self { remote, local }
    }

    /// Parse the packed 40-byte path.
    pub fn from_path(path: &[u8]) -> Result<Self, AggregatorError> {
        if path.len() != Self::PATH_LEN {
            return Err(AggregatorError::InvalidRemotePath(path.len()));
        }
        let mut remote = [0u8; 20];
        let mut local = [0u8; 20];
        remote.copy_from_slice(&path[..20]);
        local.copy_from_slice(&path[20..]);
        Ok(Self { remote, local })
    }

    /// Packed 40-byte path.
    pub fn to_path(&self) -> [u8; 40] {
        let mut out = [0u8; 40];
        out[..20].copy_from_slice(&self.remote);
        out[20..].copy_from_slice(&self.local);
        out
    }
}

/// Reconciliation state of a leg.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LegStatus {
    /// Waiting for one or both channels.
    #[default]
    Pending,
    /// Funds released to the recipient under the message's authorization.
    Credited,
    /// Arrived value fell below the floor and was returned.
    Refunded,
    /// Deadline swept before both channels arrived.
    Expired,
}

impl LegStatus {
    /// Check if transition is valid.
    pub fn can_transition_to(&self, next: LegStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Credited)
                | (Self::Pending, Self::Refunded)
                | (Self::Pending, Self::Expired)
        )
    }

    /// Check if terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Which side created the record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegOrigin {
    /// Dispatched from this chain.
    Outbound,
    /// First seen through an inbound message or funds arrival.
    Inbound,
}

/// One of the two transport channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Authenticated cross-chain message.
    Message,
    /// Value bridge transfer.
    Funds,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Message => write!(f, "message"),
            Channel::Funds => write!(f, "funds"),
        }
    }
}
