//! # Domain Errors
//!
//! Every rejection the aggregator can produce. Validation failures are local to
//! one leg; inbound-event failures never mutate a record.

use super::value_objects::{ChainId, CorrelationKey};
use thiserror::Error;

/// Address type (20-byte).
pub type Address = [u8; 20];

/// Hash type (32-byte keccak256).
pub type Hash = [u8; 32];

/// Token amount.
pub type Amount = u128;

/// Aggregator error kinds.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AggregatorError {
    /// Leg deadline has passed.
    #[error("Leg expired: deadline {deadline}, now {now}")]
    Expired {
        /// Leg deadline.
        deadline: u64,
        /// Logical time at validation.
        now: u64,
    },

    /// `amount == 0` or `min_amount > amount`.
    #[error("Invalid amount: amount={amount}, min_amount={min_amount}")]
    InvalidAmount {
        /// Requested amount.
        amount: Amount,
        /// Requested slippage floor.
        min_amount: Amount,
    },

    /// Leg signature did not verify, or was already used.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller cannot cover the leg amount.
    #[error("Insufficient funds: need {required}, available {available}")]
    InsufficientFunds {
        /// Amount the leg needs.
        required: Amount,
        /// Amount the vault will release.
        available: Amount,
    },

    /// Inbound event from an unregistered or mismatched remote.
    #[error("Untrusted source: chain {chain}, sender 0x{}", hex::encode(sender))]
    UntrustedSource {
        /// Claimed source chain.
        chain: ChainId,
        /// Claimed sender.
        sender: Address,
    },

    /// Record is already terminal (or archived).
    #[error("Already resolved: {0}")]
    AlreadyResolved(CorrelationKey),

    /// No trusted remote registered for the destination, or destination is local.
    #[error("Unknown destination chain: {0}")]
    UnknownDestination(ChainId),

    /// Inbound payload could not be decoded.
    #[error("Malformed payload: expected {expected} bytes, got {got}")]
    MalformedPayload {
        /// Required length.
        expected: usize,
        /// Received length.
        got: usize,
    },

    /// Bridged value could not be matched to any leg.
    #[error("Uncorrelated funds: {amount} from chain {chain}")]
    UncorrelatedFunds {
        /// Source chain of the transfer.
        chain: ChainId,
        /// Observed amount.
        amount: Amount,
    },

    /// Second funds arrival for a leg that already has funds.
    #[error("Duplicate funds for {0}")]
    DuplicateFunds(CorrelationKey),

    /// Privileged call from a non-owner.
    #[error("Caller is not the owner")]
    NotOwner,

    /// Trusted-remote path is not 40 bytes.
    #[error("Invalid remote path length: {0}")]
    InvalidRemotePath(usize),

    /// Attached fee does not cover the message fees of every leg.
    #[error("Insufficient fee: required {required}, paid {paid}")]
    InsufficientFee {
        /// Sum of per-leg fee quotes.
        required: Amount,
        /// Fee attached to the request.
        paid: Amount,
    },

    /// Request has no legs.
    #[error("Empty aggregate request")]
    EmptyRequest,

    /// Request exceeds the configured leg limit.
    #[error("Too many legs: {got} > {max}")]
    TooManyLegs {
        /// Legs submitted.
        got: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Parallel leg arrays differ in length.
    #[error("Leg arrays have mismatched lengths")]
    MismatchedLegArrays,

    /// No record under this key.
    #[error("Record not found: {0}")]
    RecordNotFound(CorrelationKey),

    /// A record already exists under this key.
    #[error("Duplicate record: {0}")]
    DuplicateRecord(CorrelationKey),

    /// Surplus or suspense release larger than what is held.
    #[error("Nothing to release: requested {requested}, held {held}")]
    NothingToRelease {
        /// Requested amount.
        requested: Amount,
        /// Amount actually held.
        held: Amount,
    },

    /// Configuration rejected.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Outbound channel failure surfaced to a caller.
    #[error("Channel error: {0}")]
    Channel(String),
}
