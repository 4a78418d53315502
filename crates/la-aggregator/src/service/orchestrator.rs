//! # Aggregation Orchestrator
//!
//! Best-effort fan-out of an aggregate request. Each leg is validated,
//! debited and recorded under the dispatch lock, then sent on both channels.
//! A rejected leg never affects the legs around it.
//!
//! If the caller drops the future while a leg's sends are pending, the leg's
//! record is closed out on drop so the sweep can still settle it.

use crate::algorithms::{
    derive_correlation_key, encode_bridge_payload, encode_message_payload, NonceCounter,
    MESSAGE_PAYLOAD_LEN,
};
use crate::domain::{
    invariant_deadline_not_passed, Address, AggregateOutcome, AggregateRequest,
    AggregatorError, Amount, BridgePayload, ChainId, CorrelationKey, Leg, LegDispatchResult,
    MessagePayload, OutboundLegParams,
};
use crate::metrics::Metrics;
use crate::ports::outbound::{BridgeChannel, Clock, LiquidityVault, MessageChannel};
use crate::service::ledger::ReconciliationLedger;
use crate::service::registry::TrustedRemoteRegistry;
use crate::service::validator::{LegRequestValidator, ValidatedLeg};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Dependencies of the orchestrator.
pub struct OrchestratorContext {
    /// Chain legs leave from.
    pub local_chain_id: ChainId,
    /// Upper bound on legs per request.
    pub max_legs_per_request: usize,
    /// Destination lookup.
    pub registry: Arc<TrustedRemoteRegistry>,
    /// Outbound records.
    pub ledger: Arc<ReconciliationLedger>,
    /// Depositor balances.
    pub vault: Arc<dyn LiquidityVault>,
    /// Message network.
    pub messages: Arc<dyn MessageChannel>,
    /// Value bridge.
    pub bridge: Arc<dyn BridgeChannel>,
    /// Logical time.
    pub clock: Arc<dyn Clock>,
    /// Shared counters.
    pub metrics: Arc<Metrics>,
}

/// Validates and dispatches aggregate requests.
pub struct AggregationOrchestrator {
    ctx: OrchestratorContext,
    validator: LegRequestValidator,
    nonces: NonceCounter,
    // Nonce, debit, record creation and digest consumption happen as one step.
    dispatch_lock: Mutex<()>,
}

impl AggregationOrchestrator {
    /// Create an orchestrator.
    pub fn new(ctx: OrchestratorContext) -> Self {
        let validator = LegRequestValidator::new(ctx.local_chain_id, ctx.vault.clone());
        Self {
            ctx,
            validator,
            nonces: NonceCounter::new(),
            dispatch_lock: Mutex::new(()),
        }
    }

    /// Next nonce to be assigned.
    pub fn next_nonce(&self) -> u64 {
        self.nonces.peek()
    }

    /// Process every leg of `request` independently.
    ///
    /// Fails as a whole only when the request is empty, too large, or the
    /// attached fee cannot cover the message fee of every leg.
    pub async fn aggregate(
        &self,
        request: AggregateRequest,
    ) -> Result<AggregateOutcome, AggregatorError> {
        let request_id = Uuid::new_v4();
        if request.legs.is_empty() {
            return Err(AggregatorError::EmptyRequest);
        }
        if request.legs.len() > self.ctx.max_legs_per_request {
            return Err(AggregatorError::TooManyLegs {
                got: request.legs.len(),
                max: self.ctx.max_legs_per_request,
            });
        }

        self.evict_consumed();

        let mut quotes = Vec::with_capacity(request.legs.len());
        for leg in &request.legs {
            quotes.push(
                self.ctx
                    .messages
                    .estimate_fee(leg.destination_chain_id, MESSAGE_PAYLOAD_LEN)
                    .await,
            );
        }
        let required = quotes
            .iter()
            .fold(0 as Amount, |acc, q| acc.saturating_add(*q));
        if request.fee_paid < required {
            return Err(AggregatorError::InsufficientFee {
                required,
                paid: request.fee_paid,
            });
        }

        info!(
            %request_id,
            depositor = %hex::encode(request.depositor),
            legs = request.legs.len(),
            "Aggregate request received"
        );

        let mut results = Vec::with_capacity(request.legs.len());
        let mut fee_used: Amount = 0;
        for (index, leg) in request.legs.iter().enumerate() {
            let fee = quotes[index];
            match self.dispatch_leg(index, &request.depositor, leg, fee).await {
                Ok(result) => {
                    fee_used += fee;
                    results.push(result);
                }
                Err(error) => {
                    self.ctx.metrics.record_rejection();
                    warn!(
                        %request_id,
                        index,
                        dst_chain = %leg.destination_chain_id,
                        %error,
                        "Leg rejected"
                    );
                    results.push(LegDispatchResult::Rejected { index, error });
                }
            }
        }

        let outcome = AggregateOutcome {
            request_id,
            results,
            fee_used,
            fee_refund: request.fee_paid - fee_used,
        };
        debug!(
            %request_id,
            dispatched = outcome.dispatched_count(),
            fee_refund = %outcome.fee_refund,
            "Aggregate request complete"
        );
        Ok(outcome)
    }

    async fn dispatch_leg(
        &self,
        index: usize,
        depositor: &Address,
        leg: &Leg,
        fee: Amount,
    ) -> Result<LegDispatchResult, AggregatorError> {
        let now = self.ctx.clock.now();
        let validated = self.validator.validate(leg, depositor, now)?;
        self.ensure_destination(leg.destination_chain_id)?;
        let (correlation_key, nonce) = self.reserve_leg(&validated, depositor)?;
        let mut guard = DispatchGuard::new(self.ctx.ledger.clone(), correlation_key);

        let destination = leg.destination_chain_id;
        let message = encode_message_payload(&MessagePayload {
            correlation_key,
            amount: leg.amount,
            min_amount: leg.min_amount,
            recipient: *depositor,
        });
        let message_dispatched = match self.ctx.messages.send(destination, message, fee).await {
            Ok(()) => true,
            Err(err) => {
                warn!(correlation_key = %correlation_key, %err, "Message dispatch failed");
                false
            }
        };
        guard.message_dispatched = message_dispatched;

        let bridge_payload = self.ctx.bridge.supports_payload().then(|| {
            encode_bridge_payload(&BridgePayload {
                correlation_key,
                recipient: *depositor,
            })
        });
        guard.bridge_started = true;
        let funds_dispatched = match self
            .ctx
            .bridge
            .bridge(destination, leg.amount, *depositor, bridge_payload)
            .await
        {
            Ok(()) => true,
            Err(err) => {
                warn!(correlation_key = %correlation_key, %err, "Funds dispatch failed");
                false
            }
        };

        // The leg is already debited and recorded; report it dispatched regardless.
        if let Err(err) = guard.complete(funds_dispatched) {
            error!(correlation_key = %correlation_key, %err, "Dispatched leg has no record");
        }
        self.ctx
            .metrics
            .record_dispatch(message_dispatched, funds_dispatched);

        info!(
            correlation_key = %correlation_key,
            src_chain = %self.ctx.local_chain_id,
            dst_chain = %destination,
            amount = %leg.amount,
            nonce,
            message_dispatched,
            funds_dispatched,
            "Leg dispatched"
        );
        Ok(LegDispatchResult::Dispatched {
            index,
            correlation_key,
            nonce,
            message_dispatched,
            funds_dispatched,
        })
    }

    fn ensure_destination(&self, destination: ChainId) -> Result<(), AggregatorError> {
        if destination == self.ctx.local_chain_id
            || self.ctx.registry.trusted_remote(destination).is_none()
        {
            return Err(AggregatorError::UnknownDestination(destination));
        }
        Ok(())
    }

    fn evict_consumed(&self) {
        let _guard = self.dispatch_lock.lock();
        let evicted = self.validator.evict_expired(self.ctx.clock.now());
        if evicted > 0 {
            debug!(evicted, "Expired leg digests evicted");
        }
    }

    /// Debit, assign the nonce and create the record as one step.
    fn reserve_leg(
        &self,
        validated: &ValidatedLeg,
        depositor: &Address,
    ) -> Result<(CorrelationKey, u64), AggregatorError> {
        let _guard = self.dispatch_lock.lock();
        let leg = &validated.leg;

        // Its digest may have been evicted since validation.
        invariant_deadline_not_passed(leg.deadline, self.ctx.clock.now())?;

        // A concurrent request may have dispatched the same signed leg.
        if self.validator.is_consumed(&validated.digest) {
            return Err(AggregatorError::Unauthorized(
                "leg signature already used".to_string(),
            ));
        }

        self.ctx.vault.pull(depositor, leg.amount)?;
        let nonce = self.nonces.next();
        let correlation_key =
            derive_correlation_key(self.ctx.local_chain_id, leg.destination_chain_id, nonce);

        let params = OutboundLegParams {
            correlation_key,
            source_chain_id: self.ctx.local_chain_id,
            destination_chain_id: leg.destination_chain_id,
            amount: leg.amount,
            min_amount: leg.min_amount,
            recipient: *depositor,
            refund_recipient: *depositor,
            deadline: leg.deadline,
        };
        if let Err(err) = self.ctx.ledger.register_outbound(params) {
            self.ctx.vault.release(depositor, leg.amount);
            return Err(err);
        }
        self.validator.consume(validated.digest, leg.deadline);
        Ok((correlation_key, nonce))
    }
}

/// Tracks how far a reserved leg's sends got. Dropped unfinished, it hands
/// the record back to the ledger instead of leaving it in flight.
struct DispatchGuard {
    ledger: Arc<ReconciliationLedger>,
    key: CorrelationKey,
    message_dispatched: bool,
    bridge_started: bool,
    finished: bool,
}

impl DispatchGuard {
    fn new(ledger: Arc<ReconciliationLedger>, key: CorrelationKey) -> Self {
        Self {
            ledger,
            key,
            message_dispatched: false,
            bridge_started: false,
            finished: false,
        }
    }

    fn complete(mut self, funds_dispatched: bool) -> Result<(), AggregatorError> {
        self.finished = true;
        self.ledger
            .complete_dispatch(&self.key, self.message_dispatched, funds_dispatched)
    }
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.ledger
                .abandon_dispatch(&self.key, self.message_dispatched, self.bridge_started);
        }
    }
}
