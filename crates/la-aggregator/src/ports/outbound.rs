//! # Outbound Ports
//!
//! Traits for the external collaborators: message network, value bridge,
//! the local ledger holding balances, and logical time.

use crate::domain::{Address, AggregatorError, Amount, ChainId};
use async_trait::async_trait;
use thiserror::Error;

/// Error from a channel send.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    /// Endpoint not reachable.
    #[error("Channel unavailable: {0}")]
    Unavailable(String),

    /// Endpoint refused the send.
    #[error("Send rejected: {reason}")]
    Rejected {
        /// Reason given by the endpoint.
        reason: String,
    },

    /// Fee attached to the send was below the quote.
    #[error("Fee too low: quoted {quoted}, paid {paid}")]
    FeeTooLow {
        /// Fee quoted by the endpoint.
        quoted: Amount,
        /// Fee supplied.
        paid: Amount,
    },
}

impl From<ChannelError> for AggregatorError {
    fn from(err: ChannelError) -> Self {
        AggregatorError::Channel(err.to_string())
    }
}

/// Authenticated cross-chain message network.
///
/// Inbound delivery calls back into the aggregator with
/// `(source_chain, sender, payload_bytes)`.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Native fee for sending `payload_len` bytes to `destination`.
    async fn estimate_fee(&self, destination: ChainId, payload_len: usize) -> Amount;

    /// Send a payload. Returns once the endpoint accepted it; delivery is asynchronous.
    async fn send(
        &self,
        destination: ChainId,
        payload: Vec<u8>,
        fee_paid: Amount,
    ) -> Result<(), ChannelError>;
}

/// Value bridge.
///
/// Inbound arrival calls back into the aggregator with
/// `(source_chain, sender, observed_amount, optional_payload)`.
#[async_trait]
pub trait BridgeChannel: Send + Sync {
    /// Whether the bridge carries an opaque payload with the transfer.
    fn supports_payload(&self) -> bool;

    /// Start a transfer of `amount` to `recipient` on `destination`.
    async fn bridge(
        &self,
        destination: ChainId,
        amount: Amount,
        recipient: Address,
        payload: Option<Vec<u8>>,
    ) -> Result<(), ChannelError>;
}

/// Local ledger that stores balances and executes transfers.
pub trait LiquidityVault: Send + Sync {
    /// Amount the aggregator may pull from `owner` (balance bounded by allowance).
    fn available(&self, owner: &Address) -> Amount;

    /// Move `amount` from `owner` into aggregator custody.
    fn pull(&self, owner: &Address, amount: Amount) -> Result<(), AggregatorError>;

    /// Pay `amount` out of aggregator custody to `to`.
    fn release(&self, to: &Address, amount: Amount);
}

/// Logical time source, seconds.
pub trait Clock: Send + Sync {
    /// Current logical time.
    fn now(&self) -> u64;
}
