//! # Domain Entities
//!
//! Requests, dispatch results and the per-leg correlation record.

use super::errors::{Address, AggregatorError, Amount};
use super::value_objects::{ChainId, CorrelationKey, LegOrigin, LegStatus};
use la_signature::LegContent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One chain-to-chain transfer unit within an aggregate request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leg {
    /// Destination chain.
    pub destination_chain_id: ChainId,
    /// Amount debited on the source chain.
    pub amount: Amount,
    /// Slippage floor on the destination chain.
    pub min_amount: Amount,
    /// Logical-time deadline.
    pub deadline: u64,
    /// Packed 65-byte signature over the leg's canonical content.
    pub signature: Vec<u8>,
}

impl Leg {
    /// Signed content of this leg.
    pub fn content(&self, source_chain_id: ChainId, caller: Address) -> LegContent {
        LegContent {
            source_chain_id: source_chain_id.0,
            destination_chain_id: self.destination_chain_id.0,
            amount: self.amount,
            min_amount: self.min_amount,
            deadline: self.deadline,
            caller,
        }
    }
}

/// Ordered legs submitted together by one depositor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateRequest {
    /// Account whose liquidity is debited and who receives on the destination.
    pub depositor: Address,
    /// Legs, processed independently in order.
    pub legs: Vec<Leg>,
    /// Native fee attached for message dispatch.
    pub fee_paid: Amount,
}

impl AggregateRequest {
    /// Build a request from the parallel-array entry point.
    pub fn from_arrays(
        depositor: Address,
        destination_chain_ids: &[u16],
        amounts: &[Amount],
        min_amounts: &[Amount],
        deadlines: &[u64],
        signatures: &[Vec<u8>],
        fee_paid: Amount,
    ) -> Result<Self, AggregatorError> {
        let n = destination_chain_ids.len();
        if amounts.len() != n
            || min_amounts.len() != n
            || deadlines.len() != n
            || signatures.len() != n
        {
            return Err(AggregatorError::MismatchedLegArrays);
        }

        let legs = (0..n)
            .map(|i| Leg {
                destination_chain_id: ChainId(destination_chain_ids[i]),
                amount: amounts[i],
                min_amount: min_amounts[i],
                deadline: deadlines[i],
                signature: signatures[i].clone(),
            })
            .collect();

        Ok(Self {
            depositor,
            legs,
            fee_paid,
        })
    }
}

/// Per-leg result of an aggregate call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LegDispatchResult {
    /// Leg was debited and recorded; channel flags report which sends went out.
    Dispatched {
        /// Position in the request.
        index: usize,
        /// Correlation key of the leg.
        correlation_key: CorrelationKey,
        /// Nonce assigned on this chain.
        nonce: u64,
        /// Message send succeeded.
        message_dispatched: bool,
        /// Bridge send succeeded.
        funds_dispatched: bool,
    },
    /// Leg was rejected before any debit.
    Rejected {
        /// Position in the request.
        index: usize,
        /// Reason.
        error: AggregatorError,
    },
}

impl LegDispatchResult {
    /// Correlation key if the leg was dispatched.
    pub fn correlation_key(&self) -> Option<CorrelationKey> {
        match self {
            Self::Dispatched {
                correlation_key, ..
            } => Some(*correlation_key),
            Self::Rejected { .. } => None,
        }
    }

    /// True if the leg was accepted.
    pub fn is_dispatched(&self) -> bool {
        matches!(self, Self::Dispatched { .. })
    }
}

/// Result of a whole aggregate call.
#[derive(Clone, Debug)]
pub struct AggregateOutcome {
    /// Id used in logs for this call.
    pub request_id: Uuid,
    /// One entry per leg, in request order.
    pub results: Vec<LegDispatchResult>,
    /// Fee spent on dispatched legs.
    pub fee_used: Amount,
    /// Fee returned to the caller.
    pub fee_refund: Amount,
}

impl AggregateOutcome {
    /// Number of accepted legs.
    pub fn dispatched_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_dispatched()).count()
    }
}

/// Parameters for registering an outbound leg.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundLegParams {
    /// Correlation key.
    pub correlation_key: CorrelationKey,
    /// Source (local) chain.
    pub source_chain_id: ChainId,
    /// Destination chain.
    pub destination_chain_id: ChainId,
    /// Amount debited.
    pub amount: Amount,
    /// Slippage floor.
    pub min_amount: Amount,
    /// Recipient on the destination chain.
    pub recipient: Address,
    /// Account refunded if value never leaves this chain.
    pub refund_recipient: Address,
    /// Leg deadline.
    pub deadline: u64,
}

/// Central reconciliation entity, one per leg.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegCorrelationRecord {
    /// Correlation key.
    pub correlation_key: CorrelationKey,
    /// Which side created the record.
    pub origin: LegOrigin,
    /// Source chain of the leg.
    pub source_chain_id: ChainId,
    /// Destination chain, when known.
    pub destination_chain_id: Option<ChainId>,
    /// Amount the message authorizes.
    pub expected_amount: Amount,
    /// Slippage floor from the message.
    pub min_amount: Amount,
    /// Recipient named by the message.
    pub recipient: Option<Address>,
    /// Account refunded when the leg cannot be credited.
    pub refund_recipient: Option<Address>,
    /// Message channel has delivered.
    pub message_arrived: bool,
    /// Funds channel has delivered.
    pub funds_arrived: bool,
    /// Amount observed on the funds channel.
    pub funds_amount_observed: Amount,
    /// Outbound: message send succeeded.
    pub message_dispatched: bool,
    /// Outbound: bridge send succeeded.
    pub funds_dispatched: bool,
    /// Outbound: channel sends for this leg have not finished yet.
    pub dispatch_in_flight: bool,
    /// Value currently held on this chain for this leg.
    pub held: Amount,
    /// Excess over the authorized amount, never auto-credited.
    pub surplus: Amount,
    /// Logical-time deadline.
    pub deadline: u64,
    /// Current state.
    pub status: LegStatus,
    /// Creation order inside the ledger.
    pub created_seq: u64,
    /// Logical time of the terminal transition.
    pub resolved_at: Option<u64>,
}

impl LegCorrelationRecord {
    /// Record for a leg dispatched from this chain. Holds the debited value.
    pub fn outbound(params: OutboundLegParams, created_seq: u64) -> Self {
        Self {
            correlation_key: params.correlation_key,
            origin: LegOrigin::Outbound,
            source_chain_id: params.source_chain_id,
            destination_chain_id: Some(params.destination_chain_id),
            expected_amount: params.amount,
            min_amount: params.min_amount,
            recipient: Some(params.recipient),
            refund_recipient: Some(params.refund_recipient),
            message_arrived: false,
            funds_arrived: false,
            funds_amount_observed: 0,
            message_dispatched: false,
            funds_dispatched: false,
            dispatch_in_flight: true,
            held: params.amount,
            surplus: 0,
            deadline: params.deadline,
            status: LegStatus::Pending,
            created_seq,
            resolved_at: None,
        }
    }

    /// Empty inbound record, filled in by whichever channel arrives first.
    pub fn inbound(
        correlation_key: CorrelationKey,
        source_chain_id: ChainId,
        deadline: u64,
        created_seq: u64,
    ) -> Self {
        Self {
            correlation_key,
            origin: LegOrigin::Inbound,
            source_chain_id,
            destination_chain_id: None,
            expected_amount: 0,
            min_amount: 0,
            recipient: None,
            refund_recipient: None,
            message_arrived: false,
            funds_arrived: false,
            funds_amount_observed: 0,
            message_dispatched: false,
            funds_dispatched: false,
            dispatch_in_flight: false,
            held: 0,
            surplus: 0,
            deadline,
            status: LegStatus::Pending,
            created_seq,
            resolved_at: None,
        }
    }

    /// Both channels have delivered.
    pub fn is_complete(&self) -> bool {
        self.message_arrived && self.funds_arrived
    }

    /// Deadline has passed at `now`.
    pub fn is_past_deadline(&self, now: u64) -> bool {
        now > self.deadline
    }

    /// Transition to new state.
    pub fn transition_to(&mut self, new_status: LegStatus, now: u64) -> Result<(), AggregatorError> {
        if !self.status.can_transition_to(new_status) {
            return Err(AggregatorError::AlreadyResolved(self.correlation_key));
        }
        self.status = new_status;
        self.resolved_at = Some(now);
        Ok(())
    }
}

/// Decoded message-channel payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    /// Leg correlation key.
    pub correlation_key: CorrelationKey,
    /// Authorized amount.
    pub amount: Amount,
    /// Slippage floor.
    pub min_amount: Amount,
    /// Recipient on this chain.
    pub recipient: Address,
}

/// Decoded bridge payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgePayload {
    /// Leg correlation key.
    pub correlation_key: CorrelationKey,
    /// Recipient, used as refund target if the message never arrives.
    pub recipient: Address,
}

/// Inbound message event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    /// Source chain claimed by the channel.
    pub source_chain_id: ChainId,
    /// Sender claimed by the channel.
    pub sender: Address,
    /// Decoded payload.
    pub payload: MessagePayload,
}

/// Inbound funds event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FundsArrival {
    /// Source chain claimed by the bridge.
    pub source_chain_id: ChainId,
    /// Sender claimed by the bridge.
    pub sender: Address,
    /// Amount actually received.
    pub observed_amount: Amount,
    /// Decoded payload, when the bridge carried one.
    pub payload: Option<BridgePayload>,
}

/// Effect of an inbound event on its record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArrivalOutcome {
    /// Flag set; still waiting for the other channel.
    Recorded(CorrelationKey),
    /// Both channels present; record is now terminal.
    Resolved {
        /// Leg key.
        correlation_key: CorrelationKey,
        /// Terminal status.
        status: LegStatus,
        /// Value released to the recipient.
        credited: Amount,
        /// Value returned.
        refunded: Amount,
        /// Value retained for explicit reconciliation.
        surplus: Amount,
    },
    /// Replayed event, nothing changed.
    Duplicate(CorrelationKey),
}

/// Effect of a deadline sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SweepOutcome {
    /// Unknown key, not yet past deadline, or already terminal.
    NotEligible,
    /// Record moved to `Expired`.
    Expired {
        /// Leg key.
        correlation_key: CorrelationKey,
        /// Held value returned to the refund recipient.
        refunded: Amount,
    },
}
