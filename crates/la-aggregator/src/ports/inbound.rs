//! # Inbound Ports
//!
//! What callers, channel endpoints and the owner can ask of an aggregator.

use crate::domain::{
    Address, AggregateOutcome, AggregateRequest, AggregatorError, Amount, ArrivalOutcome,
    ChainId, CorrelationKey, LegCorrelationRecord, RemotePair, SweepOutcome,
};
use async_trait::async_trait;

/// Caller-facing API.
#[async_trait]
pub trait LiquidityAggregatorApi: Send + Sync {
    /// Validate and dispatch every leg of a request, best effort.
    async fn aggregate(
        &self,
        request: AggregateRequest,
    ) -> Result<AggregateOutcome, AggregatorError>;

    /// Parallel-array form of [`Self::aggregate`].
    #[allow(clippy::too_many_arguments)]
    async fn aggregate_arrays(
        &self,
        depositor: Address,
        destination_chain_ids: &[u16],
        amounts: &[Amount],
        min_amounts: &[Amount],
        deadlines: &[u64],
        signatures: &[Vec<u8>],
        fee_paid: Amount,
    ) -> Result<AggregateOutcome, AggregatorError> {
        let request = AggregateRequest::from_arrays(
            depositor,
            destination_chain_ids,
            amounts,
            min_amounts,
            deadlines,
            signatures,
            fee_paid,
        )?;
        self.aggregate(request).await
    }

    /// Permissionless, idempotent deadline sweep.
    fn sweep_expired(&self, key: &CorrelationKey) -> Result<SweepOutcome, AggregatorError>;

    /// Snapshot of a record.
    fn record(&self, key: &CorrelationKey) -> Option<LegCorrelationRecord>;
}

/// Entry points invoked by the channel endpoints on delivery.
pub trait InboundHandlerApi: Send + Sync {
    /// A message arrived from `source_chain`.
    fn receive_message(
        &self,
        source_chain: ChainId,
        sender: Address,
        payload: &[u8],
    ) -> Result<ArrivalOutcome, AggregatorError>;

    /// A bridge transfer arrived from `source_chain`.
    fn receive_funds(
        &self,
        source_chain: ChainId,
        sender: Address,
        observed_amount: Amount,
        payload: Option<&[u8]>,
    ) -> Result<ArrivalOutcome, AggregatorError>;
}

/// Owner-only administration.
pub trait AggregatorAdminApi: Send + Sync {
    /// Register or overwrite the trusted remote of `chain`.
    fn set_trusted_remote(
        &self,
        caller: Address,
        chain: ChainId,
        pair: RemotePair,
    ) -> Result<(), AggregatorError>;

    /// Same, from the packed 40-byte path.
    fn set_trusted_remote_path(
        &self,
        caller: Address,
        chain: ChainId,
        path: &[u8],
    ) -> Result<(), AggregatorError> {
        self.set_trusted_remote(caller, chain, RemotePair::from_path(path)?)
    }

    /// Hand administration to another identity.
    fn transfer_ownership(&self, caller: Address, new_owner: Address)
        -> Result<(), AggregatorError>;

    /// Release surplus retained on a terminal leg.
    fn release_surplus(
        &self,
        caller: Address,
        key: &CorrelationKey,
        to: Address,
        amount: Amount,
    ) -> Result<(), AggregatorError>;

    /// Release value parked in suspense for `chain`.
    fn settle_suspense(
        &self,
        caller: Address,
        chain: ChainId,
        to: Address,
        amount: Amount,
    ) -> Result<(), AggregatorError>;
}
