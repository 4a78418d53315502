//! # Cross-Chain Liquidity Aggregator
//!
//! Fans one request out to several destination chains. Each leg travels over
//! two independent channels, an authenticated message carrying intent and a
//! bridge transfer carrying value, and is reconciled on arrival.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Leg Lifecycle
//!
//! ```text
//!   source chain                          destination chain
//!   ─────────────                         ─────────────────
//!   validate → debit → record ──message──▶ on_message_arrived ─┐
//!                            └──bridge───▶ on_funds_arrived  ──┴─▶ Credited | Refunded
//!                                                  deadline sweep ─▶ Expired
//! ```
//!
//! ## Guarantees
//!
//! | Property | Mechanism |
//! |----------|-----------|
//! | Single terminal state | `LegStatus::can_transition_to` under a per-key lock |
//! | No double charge | debit, nonce and record creation under one dispatch lock |
//! | Idempotent delivery | replayed messages are no-ops |
//! | Slippage guard | observed `< min_amount` resolves `Refunded` |
//! | Surplus never credited | excess over the message amount is retained |
//! | Spoofing visible | untrusted events rejected, counted and logged |
//!
//! ## Module Structure
//!
//! ```text
//! la-aggregator/
//! ├── domain/          # Leg, LegCorrelationRecord, ChainId, errors, config
//! ├── algorithms/      # correlation keys, payload codec, settlement decision
//! ├── ports/           # LiquidityAggregatorApi, MessageChannel, BridgeChannel
//! ├── adapters/        # in-memory vault, loopback channels, clocks
//! ├── service/         # registry, validator, orchestrator, ledger
//! └── metrics.rs
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{
    BridgeTransfer, InMemoryVault, LoopbackBridgeChannel, LoopbackMessageChannel, ManualClock,
    OutboundMessage, SystemClock,
};
pub use algorithms::{
    decide_resolution, decode_bridge_payload, decode_message_payload, derive_correlation_key,
    encode_bridge_payload, encode_message_payload, NonceCounter, Resolution, BRIDGE_PAYLOAD_LEN,
    MESSAGE_PAYLOAD_LEN,
};
pub use domain::{
    invariant_amount_bounds, invariant_conservation, invariant_deadline_not_passed, Address,
    AggregateOutcome, AggregateRequest, AggregatorConfig, AggregatorError, Amount,
    ArrivalOutcome, BridgePayload, ChainId, Channel, CorrelationKey, FundsArrival, Hash,
    InboundMessage, Leg, LegCorrelationRecord, LegDispatchResult, LegOrigin, LegStatus,
    MessagePayload, OutboundLegParams, RemotePair, SweepOutcome,
};
pub use metrics::{Metrics, MetricsSnapshot};
pub use ports::{
    AggregatorAdminApi, BridgeChannel, ChannelError, Clock, InboundHandlerApi, LiquidityVault,
    LiquidityAggregatorApi, MessageChannel,
};
pub use service::{
    AggregationOrchestrator, AggregatorPorts, LedgerTotals, LegRequestValidator,
    LiquidityAggregator, ReconciliationLedger, TrustedRemoteRegistry,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
